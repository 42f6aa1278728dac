//! HTTP façade over the execution engine.
//!
//! Deliberately thin: requests pass throttle → auth → code screening, then go
//! straight to the engine; outcomes map to JSON and errors map to status
//! codes. The engine performs no screening of its own.

use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::engine::{Engine, SessionInfo};
use crate::security::{BearerAuth, CodeValidator};
use crate::throttle::RateLimiter;
use crate::types::Error;

pub mod models;

use models::{
    ErrorResponse, EvaluateRequest, ExecuteRequest, ExecuteResponse, HealthResponse,
};

/// Shared state behind every handler.
#[derive(Debug)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub validator: CodeValidator,
    pub auth: BearerAuth,
    pub limiter: Arc<Mutex<RateLimiter>>,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/session", get(session))
        .route("/execute", post(execute))
        .route("/evaluate", post(evaluate))
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = Json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "Wolfram Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "session": "/session",
            "execute": "/execute",
            "evaluate": "/evaluate",
        },
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (available, _) = state.engine.is_available().await;
    let kernel = if available {
        state.engine.kernel_info().await
    } else {
        None
    };
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        wolfram_available: available,
        kernel,
    })
}

async fn session(State(state): State<Arc<AppState>>) -> Json<SessionInfo> {
    Json(state.engine.session_info().await)
}

async fn execute(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, Error> {
    let warnings = admit(&state, addr, &headers, &request.code).await?;
    let timeout = state
        .engine
        .clamp_timeout(request.timeout_seconds.map(Duration::from_secs));

    require_available(&state).await?;
    let outcome = state.engine.execute(&request.code, timeout).await;
    Ok(Json(ExecuteResponse::from_outcome(outcome, warnings)))
}

async fn evaluate(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<ExecuteResponse>, Error> {
    let warnings = admit(&state, addr, &headers, &request.expression).await?;
    let timeout = state
        .engine
        .clamp_timeout(request.timeout_seconds.map(Duration::from_secs));

    require_available(&state).await?;
    let outcome = state.engine.evaluate(&request.expression, timeout).await;
    Ok(Json(ExecuteResponse::from_outcome(outcome, warnings)))
}

/// Gate one request: throttle, then auth, then code screening.
/// Returns advisory warnings to echo back to the caller.
async fn admit(
    state: &AppState,
    addr: SocketAddr,
    headers: &HeaderMap,
    code: &str,
) -> Result<Vec<String>, Error> {
    let caller = caller_identity(addr, headers);
    state.limiter.lock().await.allow(&caller)?;

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    state.auth.authorize(auth_header)?;

    if code.trim().is_empty() {
        return Err(Error::validation("source text cannot be empty"));
    }

    let screening = state.validator.validate(code);
    if !screening.is_safe {
        tracing::warn!(%caller, "unsafe_code_rejected: {:?}", screening.warnings);
        return Err(Error::validation(format!(
            "code contains potentially dangerous operations: {}",
            screening.warnings.join("; ")
        )));
    }
    if !screening.warnings.is_empty() {
        tracing::warn!(%caller, "code_warnings: {:?}", screening.warnings);
    }
    Ok(screening.warnings)
}

async fn require_available(state: &AppState) -> Result<(), Error> {
    match state.engine.is_available().await {
        (true, _) => Ok(()),
        (false, reason) => Err(Error::session_unavailable(
            reason.unwrap_or_else(|| "kernel session unavailable".to_string()),
        )),
    }
}

/// Caller identity for throttling: forwarded headers win over the socket
/// address so limits hold behind a proxy.
fn caller_identity(addr: SocketAddr, headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
    {
        if !real_ip.trim().is_empty() {
            return real_ip.trim().to_string();
        }
    }
    addr.ip().to_string()
}
