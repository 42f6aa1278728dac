//! Execution engine - brokered access to the Wolfram kernel.
//!
//! Many concurrent callers issue requests; exactly one dedicated worker
//! thread ever talks to the kernel process. The flow per request:
//!
//! ```text
//! caller → Engine.execute → SessionGuard.ensure
//!        → KernelWorker (blocking evaluation) raced against a timer
//!        → Outcome (success | failure | timeout, with elapsed time)
//! ```
//!
//! The engine never errors across its public boundary: every path returns an
//! [`Outcome`]. A timeout abandons the in-flight kernel call rather than
//! killing it; the session is marked dead at that moment and rebuilt on next
//! use, so callers must not assume the kernel is quiescent right after a
//! timeout is reported.

pub mod kernel;
pub mod outcome;
pub mod process;
pub mod session;
pub mod worker;

pub use kernel::{EvalMode, EvalOutput, Kernel, KernelLauncher};
pub use outcome::{Outcome, ResultValue};
pub use process::ProcessLauncher;
pub use session::{SessionGuard, SessionInfo, SessionState};
pub use worker::KernelWorker;

use serde::Serialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::types::{EngineConfig, Result};

/// Kernel identity, fetched through a live session for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct KernelInfo {
    pub version: String,
    pub system_id: String,
}

/// The public request/response surface over one kernel session.
#[derive(Debug)]
pub struct Engine {
    worker: KernelWorker,
    guard: SessionGuard,
    config: EngineConfig,
}

impl Engine {
    pub fn new<L: KernelLauncher>(launcher: L, config: EngineConfig) -> Result<Self> {
        let worker = KernelWorker::spawn(launcher)?;
        let guard = SessionGuard::new(worker.clone(), config.clone());
        Ok(Self {
            worker,
            guard,
            config,
        })
    }

    /// Execute source text in strict mode (structured `InputForm` result).
    pub async fn execute(&self, code: &str, timeout: Duration) -> Outcome {
        self.run(code, EvalMode::Strict, timeout).await
    }

    /// Evaluate an expression, rendering the result as display text.
    pub async fn evaluate(&self, expression: &str, timeout: Duration) -> Outcome {
        self.run(expression, EvalMode::Textual, timeout).await
    }

    /// Clamp a caller-requested timeout into the configured bounds.
    pub fn clamp_timeout(&self, requested: Option<Duration>) -> Duration {
        requested
            .unwrap_or(self.config.default_timeout)
            .clamp(Duration::from_secs(1), self.config.max_timeout)
    }

    async fn run(&self, source: &str, mode: EvalMode, timeout: Duration) -> Outcome {
        let eval_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(
            %eval_id,
            timeout_secs = timeout.as_secs(),
            source = %preview(source),
            "evaluation_started"
        );

        if let Err(err) = self.guard.ensure().await {
            tracing::warn!(%eval_id, "evaluation_rejected: {err}");
            return Outcome::unavailable(err.to_string());
        }

        match tokio::time::timeout(timeout, self.worker.evaluate(source, mode)).await {
            Err(_) => {
                let elapsed = started.elapsed();
                tracing::error!(
                    %eval_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "evaluation_timed_out"
                );
                // The kernel call is abandoned, not killed; the session is no
                // longer trusted and is rebuilt on next use.
                self.guard.mark_dead("evaluation timed out").await;
                Outcome::timed_out(timeout, elapsed)
            }
            Ok(Ok(EvalOutput::Value(rendered))) => {
                let elapsed = started.elapsed();
                tracing::info!(
                    %eval_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "evaluation_completed"
                );
                Outcome::success(ResultValue::from_rendered(&rendered), elapsed)
            }
            Ok(Ok(EvalOutput::Failure(sentinel))) => {
                let elapsed = started.elapsed();
                tracing::warn!(%eval_id, %sentinel, "evaluation_failed");
                Outcome::failure("evaluation failed", elapsed)
            }
            Ok(Err(err)) => {
                let elapsed = started.elapsed();
                tracing::error!(%eval_id, "evaluation_transport_error: {err}");
                self.guard.mark_dead("kernel transport error").await;
                Outcome::failure(err.to_string(), elapsed)
            }
        }
    }

    /// Check whether the engine can serve requests right now.
    pub async fn is_available(&self) -> (bool, Option<String>) {
        match self.guard.ensure().await {
            Ok(()) => (true, None),
            Err(err) => (false, Some(err.to_string())),
        }
    }

    /// Kernel identity, or None when no session can be established.
    pub async fn kernel_info(&self) -> Option<KernelInfo> {
        if self.guard.ensure().await.is_err() {
            return None;
        }
        let version = self.fetch("$Version").await?;
        let system_id = self.fetch("$SystemID").await?;
        Some(KernelInfo { version, system_id })
    }

    /// Session lifecycle diagnostics.
    pub async fn session_info(&self) -> SessionInfo {
        self.guard.info().await
    }

    /// Tear down the session if it has been idle past the configured
    /// threshold. Safe to call from a periodic sweeper or ad hoc.
    pub async fn sweep_idle(&self) -> bool {
        self.guard.sweep_idle().await
    }

    /// Terminate the session and refuse further work.
    pub async fn shutdown(&self) {
        self.guard.close().await;
    }
}

fn preview(source: &str) -> String {
    source.chars().take(100).collect()
}
