//! Input-safety screening and request authentication.
//!
//! The validator is a pure scanner over source text; it never touches the
//! kernel. The façade consults it (and the bearer check) before a request
//! reaches the engine.

use regex::Regex;

use crate::types::{Error, Result, SecurityConfig};

/// Function heads that reach the filesystem, network, or host system.
const DANGEROUS_FUNCTIONS: &[&str] = &[
    "Run",
    "RunProcess",
    "Import",
    "Export",
    "Get",
    "Put",
    "OpenRead",
    "OpenWrite",
    "CreateFile",
    "DeleteFile",
    "CopyFile",
    "RenameFile",
    "CreateDirectory",
    "DeleteDirectory",
    "SetDirectory",
    "ResetDirectory",
    "Install",
    "Uninstall",
    "URLFetch",
    "URLRead",
    "URLSubmit",
    "SendMail",
    "SystemOpen",
    "NotebookWrite",
    "CloudDeploy",
    "CloudFunction",
    "CloudObject",
    "RemoteFile",
    "RemoteRun",
];

/// Call-shaped patterns worth flagging even when the bare head is obscured.
const RISKY_PATTERNS: &[&str] = &[
    r"!/.*",
    r"Import\[.*\]",
    r"Export\[.*\]",
    r"Get\[.*\]",
    r"Put\[.*\]",
    r"Run\[.*\]",
    r"URLFetch\[.*\]",
    r"SetDirectory\[.*\]",
    r"CreateFile\[.*\]",
    r"DeleteFile\[.*\]",
];

/// Contexts that expose kernel internals.
const RESTRICTED_NAMESPACES: &[&str] = &["System`", "Developer`", "Internal`"];

/// Screening verdict for one piece of source text.
#[derive(Debug, Clone)]
pub struct Screening {
    pub is_safe: bool,
    pub warnings: Vec<String>,
}

/// Validates Wolfram Language source for security risks.
#[derive(Debug)]
pub struct CodeValidator {
    strict: bool,
    max_code_bytes: usize,
    patterns: Vec<Regex>,
}

impl CodeValidator {
    pub fn new(config: &SecurityConfig) -> Self {
        let patterns = RISKY_PATTERNS
            .iter()
            .filter_map(|pattern| {
                Regex::new(&format!("(?i){pattern}"))
                    .map_err(|err| {
                        tracing::error!("risky_pattern_rejected: pattern={pattern}, error={err}")
                    })
                    .ok()
            })
            .collect();
        Self {
            strict: config.strict,
            max_code_bytes: config.max_code_bytes,
            patterns,
        }
    }

    /// Scan source text. In strict mode any warning makes it unsafe;
    /// otherwise warnings are advisory.
    pub fn validate(&self, code: &str) -> Screening {
        let mut warnings = Vec::new();

        for function in DANGEROUS_FUNCTIONS {
            if code.contains(function) {
                if self.strict {
                    warnings.push(format!("dangerous function detected: {function}"));
                } else {
                    tracing::warn!("dangerous_function_used: {function}");
                }
            }
        }

        for pattern in &self.patterns {
            if pattern.is_match(code) {
                warnings.push(format!("risky pattern detected: {}", pattern.as_str()));
            }
        }

        if code.len() > self.max_code_bytes {
            warnings.push(format!("code too long (>{} bytes)", self.max_code_bytes));
        }

        for namespace in RESTRICTED_NAMESPACES {
            if code.contains(namespace) {
                warnings.push(format!("restricted namespace access: {namespace}"));
            }
        }

        let is_safe = warnings.is_empty() || !self.strict;
        Screening { is_safe, warnings }
    }
}

/// Bearer-token check. When no key is configured, every request passes.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    api_key: Option<String>,
}

impl BearerAuth {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// Authorize a request from its `Authorization` header value.
    pub fn authorize(&self, header: Option<&str>) -> Result<()> {
        let Some(expected) = self.api_key.as_deref() else {
            return Ok(());
        };
        let Some(header) = header else {
            return Err(Error::unauthorized("missing Authorization header"));
        };
        let Some(credentials) = header.strip_prefix("Bearer ") else {
            return Err(Error::unauthorized("invalid authentication scheme"));
        };
        if credentials != expected {
            return Err(Error::unauthorized("invalid API key"));
        }
        Ok(())
    }
}
