//! API request/response models.

use serde::{Deserialize, Serialize};

use crate::engine::{KernelInfo, Outcome, ResultValue};

/// Request body for `POST /execute` (strict mode).
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// Wolfram Language code to execute.
    pub code: String,
    /// Execution timeout in seconds; the server default applies when omitted
    /// and requests are capped at the configured maximum.
    pub timeout_seconds: Option<u64>,
}

/// Request body for `POST /evaluate` (textual mode).
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    /// Wolfram Language expression to evaluate.
    pub expression: String,
    pub timeout_seconds: Option<u64>,
}

/// Response body for both execution endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_seconds: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ExecuteResponse {
    pub fn from_outcome(outcome: Outcome, warnings: Vec<String>) -> Self {
        Self {
            success: outcome.success,
            result: outcome.result,
            error: outcome.error,
            elapsed_seconds: outcome.elapsed.as_secs_f64(),
            warnings,
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub wolfram_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<KernelInfo>,
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
