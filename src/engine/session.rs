//! Kernel session lifecycle.
//!
//! The [`SessionGuard`] is the only authority over the session: it creates,
//! health-checks, recreates, and tears down the kernel through the worker.
//! All of `ensure` runs under one mutex, so concurrent callers serialize
//! behind a single creation or health-check pass; the mutex is deliberately
//! not held across real evaluations.
//!
//! Session states: `ABSENT → INITIALIZING → READY ⇄ DEAD → INITIALIZING`,
//! with `CLOSED` terminal after an explicit [`SessionGuard::close`].

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::engine::kernel::{EvalMode, EvalOutput};
use crate::engine::worker::KernelWorker;
use crate::types::{EngineConfig, Error, Result};

/// Cheap deterministic liveness probe.
const PROBE_EXPR: &str = "1 + 1";
const PROBE_EXPECTED: &str = "2";

/// Warm-up evaluation run once per creation, forcing full kernel
/// initialization before the first real request arrives.
const WARMUP_EXPR: &str = "$Version";

/// Lifecycle state of the logical session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Absent,
    Initializing,
    Ready,
    Dead,
    Closed,
}

#[derive(Debug)]
struct GuardState {
    state: SessionState,
    created_at: Option<DateTime<Utc>>,
    last_activity: Option<DateTime<Utc>>,
    kernel_version: Option<String>,
    launch_attempts: u64,
    recreations: u64,
}

/// Diagnostics snapshot for health/session endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub active: bool,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_version: Option<String>,
    pub launch_attempts: u64,
    pub recreations: u64,
}

/// Mutual-exclusion and lifecycle authority over the single kernel session.
#[derive(Debug)]
pub struct SessionGuard {
    worker: KernelWorker,
    config: EngineConfig,
    state: Mutex<GuardState>,
}

impl SessionGuard {
    pub fn new(worker: KernelWorker, config: EngineConfig) -> Self {
        Self {
            worker,
            config,
            state: Mutex::new(GuardState {
                state: SessionState::Absent,
                created_at: None,
                last_activity: None,
                kernel_version: None,
                launch_attempts: 0,
                recreations: 0,
            }),
        }
    }

    /// Guarantee a verified-live session or fail with `SessionUnavailable`
    /// after exhausting retries.
    ///
    /// A READY session is re-verified with the probe; a failed probe marks it
    /// dead and runs exactly one recreation pass within the same call.
    pub async fn ensure(&self) -> Result<()> {
        let mut st = self.state.lock().await;
        match st.state {
            SessionState::Closed => Err(Error::session_unavailable("session guard is closed")),
            SessionState::Ready => match self.probe().await {
                Ok(()) => {
                    st.last_activity = Some(Utc::now());
                    Ok(())
                }
                Err(err) => {
                    tracing::warn!("session_probe_failed: {err}, recreating");
                    st.state = SessionState::Dead;
                    st.recreations += 1;
                    self.teardown_quietly().await;
                    self.create_locked(&mut st).await
                }
            },
            _ => self.create_locked(&mut st).await,
        }
    }

    /// Mark a READY session dead without touching the kernel. Used after a
    /// timeout or transport error, when the kernel may still be
    /// mid-evaluation; the next `ensure` rebuilds the session instead of
    /// trusting a probe against the stale handle.
    pub async fn mark_dead(&self, reason: &str) {
        let mut st = self.state.lock().await;
        if st.state == SessionState::Ready {
            tracing::warn!("session_marked_dead: {reason}");
            st.state = SessionState::Dead;
            st.recreations += 1;
        }
    }

    /// Tear down a READY session idle past the configured threshold.
    /// Returns true when a teardown happened.
    pub async fn sweep_idle(&self) -> bool {
        let mut st = self.state.lock().await;
        if st.state != SessionState::Ready {
            return false;
        }
        let Some(last) = st.last_activity else {
            return false;
        };
        let Ok(threshold) = TimeDelta::from_std(self.config.idle_timeout) else {
            return false;
        };
        let idle = Utc::now().signed_duration_since(last);
        if idle < threshold {
            return false;
        }
        tracing::info!(idle_seconds = idle.num_seconds(), "session_idle_teardown");
        self.teardown_quietly().await;
        st.state = SessionState::Absent;
        st.created_at = None;
        st.kernel_version = None;
        true
    }

    /// Terminate the session and refuse all further `ensure` calls.
    pub async fn close(&self) {
        let mut st = self.state.lock().await;
        if st.state == SessionState::Closed {
            return;
        }
        self.teardown_quietly().await;
        st.state = SessionState::Closed;
        st.created_at = None;
        st.kernel_version = None;
        tracing::info!("session_closed");
    }

    /// Snapshot of the session lifecycle for diagnostics.
    pub async fn info(&self) -> SessionInfo {
        let st = self.state.lock().await;
        let active = st.state == SessionState::Ready;
        let idle_seconds = if active {
            st.last_activity.map(|last| {
                Utc::now()
                    .signed_duration_since(last)
                    .num_milliseconds()
                    .max(0) as f64
                    / 1000.0
            })
        } else {
            None
        };
        SessionInfo {
            active,
            state: st.state,
            created_at: st.created_at,
            last_activity: st.last_activity,
            idle_seconds,
            kernel_version: st.kernel_version.clone(),
            launch_attempts: st.launch_attempts,
            recreations: st.recreations,
        }
    }

    /// Creation loop with exponential backoff; the guard mutex stays held for
    /// its whole duration so no second caller can race a launch.
    async fn create_locked(&self, st: &mut GuardState) -> Result<()> {
        let max_attempts = self.config.max_retries.max(1);
        st.state = SessionState::Initializing;
        st.created_at = None;
        st.kernel_version = None;

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            st.launch_attempts += 1;
            match self.try_create().await {
                Ok(version) => {
                    let now = Utc::now();
                    st.state = SessionState::Ready;
                    st.created_at = Some(now);
                    st.last_activity = Some(now);
                    st.kernel_version = Some(version);
                    tracing::info!(
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "session_ready"
                    );
                    return Ok(());
                }
                Err(err) => {
                    tracing::error!(attempt, "session_create_failed: {err}");
                    // A half-created handle is cleaned up before any retry.
                    self.teardown_quietly().await;
                    if attempt < max_attempts {
                        let delay = self.config.backoff_base * 2u32.saturating_pow(attempt - 1);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        st.state = SessionState::Absent;
        Err(Error::session_unavailable(format!(
            "kernel session creation failed after {max_attempts} attempts"
        )))
    }

    /// Launch, probe, and warm up one kernel. Returns the kernel version
    /// reported by the warm-up.
    async fn try_create(&self) -> Result<String> {
        self.worker.launch().await?;
        self.probe().await?;
        match self.worker.evaluate(WARMUP_EXPR, EvalMode::Textual).await? {
            EvalOutput::Value(version) => Ok(version.trim().to_string()),
            EvalOutput::Failure(sentinel) => Err(Error::transport(format!(
                "warm-up evaluation failed with {sentinel}"
            ))),
        }
    }

    async fn probe(&self) -> Result<()> {
        match self.worker.evaluate(PROBE_EXPR, EvalMode::Strict).await? {
            EvalOutput::Value(value) if value.trim() == PROBE_EXPECTED => Ok(()),
            EvalOutput::Value(value) => Err(Error::transport(format!(
                "probe returned unexpected value: {value}"
            ))),
            EvalOutput::Failure(sentinel) => {
                Err(Error::transport(format!("probe failed with {sentinel}")))
            }
        }
    }

    async fn teardown_quietly(&self) {
        if let Err(err) = self.worker.terminate().await {
            tracing::warn!("session_teardown_failed: {err}");
        }
    }
}
