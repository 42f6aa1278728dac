//! Process-backed kernel binding.
//!
//! Spawns the Wolfram kernel executable with piped stdio and speaks a
//! line-framed protocol: every request wraps the source text so the result
//! arrives as rendered lines followed by an end-of-output marker. All I/O
//! here is blocking and runs only on the kernel worker thread.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use crate::engine::kernel::{EvalMode, EvalOutput, Kernel, KernelLauncher};
use crate::types::{Error, Result};

/// Marker printed by the kernel after every response; never appears in
/// rendered results.
const OUTPUT_MARKER: &str = "<<wolfram-server:done>>";

/// Values the kernel reports for a failed or aborted evaluation.
const FAILURE_SENTINELS: [&str; 2] = ["$Failed", "$Aborted"];

/// Launches [`ProcessKernel`] instances from a resolved executable path.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    executable: PathBuf,
}

impl ProcessLauncher {
    /// Resolve the kernel executable: configured path, else
    /// `WOLFRAM_KERNEL_PATH`, else `WolframKernel` on PATH.
    pub fn new(kernel_path: Option<PathBuf>) -> Self {
        let executable = kernel_path
            .or_else(|| std::env::var_os("WOLFRAM_KERNEL_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("WolframKernel"));
        Self { executable }
    }

    pub fn executable(&self) -> &PathBuf {
        &self.executable
    }
}

impl KernelLauncher for ProcessLauncher {
    type Kernel = ProcessKernel;

    fn launch(&self) -> Result<ProcessKernel> {
        tracing::info!(executable = %self.executable.display(), "kernel_launching");
        let mut child = Command::new(&self.executable)
            .arg("-noprompt")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                Error::transport(format!(
                    "failed to spawn {}: {err}",
                    self.executable.display()
                ))
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::transport("kernel stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::transport("kernel stdout unavailable"))?;
        Ok(ProcessKernel {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

/// One live kernel child process.
#[derive(Debug)]
pub struct ProcessKernel {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Kernel for ProcessKernel {
    fn evaluate(&mut self, source: &str, mode: EvalMode) -> Result<EvalOutput> {
        let request = framed(source, mode);
        self.stdin
            .write_all(request.as_bytes())
            .and_then(|()| self.stdin.flush())
            .map_err(|err| Error::transport(format!("kernel write failed: {err}")))?;

        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let read = self
                .stdout
                .read_line(&mut line)
                .map_err(|err| Error::transport(format!("kernel read failed: {err}")))?;
            if read == 0 {
                return Err(Error::transport("kernel closed its output stream"));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line == OUTPUT_MARKER {
                break;
            }
            lines.push(line.to_string());
        }

        Ok(classify(lines.join("\n")))
    }

    fn terminate(&mut self) -> Result<()> {
        // Polite quit first; the kill below covers an unresponsive kernel.
        let _ = self.stdin.write_all(b"Quit[]\n");
        let _ = self.stdin.flush();
        self.child
            .kill()
            .map_err(|err| Error::shutdown(format!("kernel kill failed: {err}")))?;
        self.child
            .wait()
            .map_err(|err| Error::shutdown(format!("kernel wait failed: {err}")))?;
        Ok(())
    }
}

/// Wrap one request so the kernel prints the rendered result and the marker,
/// regardless of what the source text evaluates to.
fn framed(source: &str, mode: EvalMode) -> String {
    let escaped = escape_wl_string(source);
    let form = match mode {
        EvalMode::Strict => "InputForm",
        EvalMode::Textual => "OutputForm",
    };
    format!(
        "Print[ToString[Check[ToExpression[\"{escaped}\"], $Failed], {form}]]; \
         Print[\"{OUTPUT_MARKER}\"];\n"
    )
}

fn classify(rendered: String) -> EvalOutput {
    let trimmed = rendered.trim();
    if FAILURE_SENTINELS.contains(&trimmed) {
        EvalOutput::Failure(trimmed.to_string())
    } else {
        EvalOutput::Value(rendered)
    }
}

/// Escape source text into a Wolfram Language string literal.
fn escape_wl_string(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for c in source.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_handles_quotes_and_newlines() {
        assert_eq!(escape_wl_string(r#"Print["hi"]"#), r#"Print[\"hi\"]"#);
        assert_eq!(escape_wl_string("a\nb\tc"), "a\\nb\\tc");
        assert_eq!(escape_wl_string(r"x\y"), r"x\\y");
    }

    #[test]
    fn test_framed_request_is_single_line_with_marker() {
        let request = framed("1 + 1", EvalMode::Strict);
        assert!(request.ends_with('\n'));
        assert_eq!(request.matches('\n').count(), 1);
        assert!(request.contains("InputForm"));
        assert!(request.contains(OUTPUT_MARKER));

        let textual = framed("2 + 2", EvalMode::Textual);
        assert!(textual.contains("OutputForm"));
    }

    #[test]
    fn test_framed_request_embeds_escaped_source() {
        let request = framed("StringJoin[\"a\", \"b\"]", EvalMode::Strict);
        assert!(request.contains("ToExpression[\"StringJoin[\\\"a\\\", \\\"b\\\"]\"]"));
    }

    #[test]
    fn test_classify_detects_failure_sentinels() {
        assert_eq!(
            classify("$Failed".to_string()),
            EvalOutput::Failure("$Failed".to_string())
        );
        assert_eq!(
            classify(" $Aborted ".to_string()),
            EvalOutput::Failure("$Aborted".to_string())
        );
        assert_eq!(
            classify("4".to_string()),
            EvalOutput::Value("4".to_string())
        );
        // A sentinel inside a larger result is a value, not a failure.
        assert_eq!(
            classify("{$Failed, 1}".to_string()),
            EvalOutput::Value("{$Failed, 1}".to_string())
        );
    }

    #[test]
    fn test_launcher_prefers_configured_path() {
        let launcher = ProcessLauncher::new(Some(PathBuf::from("/opt/wolfram/WolframKernel")));
        assert_eq!(
            launcher.executable(),
            &PathBuf::from("/opt/wolfram/WolframKernel")
        );
    }
}
