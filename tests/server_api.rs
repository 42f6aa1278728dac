//! HTTP API tests — full round-trips against a served router backed by a
//! scripted in-process kernel.

use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

use wolfram_server::engine::{Engine, EvalMode, EvalOutput, Kernel, KernelLauncher};
use wolfram_server::security::{BearerAuth, CodeValidator};
use wolfram_server::server::{router, AppState};
use wolfram_server::throttle::RateLimiter;
use wolfram_server::types::{EngineConfig, Result, SecurityConfig, ThrottleConfig};

struct StaticKernel;

impl Kernel for StaticKernel {
    fn evaluate(&mut self, source: &str, _mode: EvalMode) -> Result<EvalOutput> {
        let rendered = match source {
            "1 + 1" => "2",
            "2 + 2" => "4",
            "$Version" => "14.1 for Testing",
            "$SystemID" => "Linux-x86-64",
            other => other,
        };
        Ok(EvalOutput::Value(rendered.to_string()))
    }

    fn terminate(&mut self) -> Result<()> {
        Ok(())
    }
}

struct StaticLauncher;

impl KernelLauncher for StaticLauncher {
    type Kernel = StaticKernel;

    fn launch(&self) -> Result<StaticKernel> {
        Ok(StaticKernel)
    }
}

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
}

impl TestServer {
    /// Spin up the full router on a random port.
    async fn start(security: SecurityConfig, throttle: ThrottleConfig) -> Self {
        let engine = Arc::new(Engine::new(StaticLauncher, EngineConfig::default()).unwrap());
        let state = Arc::new(AppState {
            engine,
            validator: CodeValidator::new(&security),
            auth: BearerAuth::new(security.api_key.clone()),
            limiter: Arc::new(Mutex::new(RateLimiter::new(throttle))),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                router(state).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    async fn default_start() -> Self {
        Self::start(SecurityConfig::default(), ThrottleConfig::default()).await
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

#[tokio::test]
async fn health_reports_kernel_availability_and_identity() {
    let server = TestServer::default_start().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["wolfram_available"], true);
    assert_eq!(body["kernel"]["version"], "14.1 for Testing");
    assert_eq!(body["kernel"]["system_id"], "Linux-x86-64");
}

#[tokio::test]
async fn execute_returns_structured_result() {
    let server = TestServer::default_start().await;

    let response = server
        .client
        .post(server.url("/execute"))
        .json(&serde_json::json!({"code": "2 + 2", "timeout_seconds": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["kind"], "structured");
    assert_eq!(body["result"]["value"], 4);
    assert!(body["error"].is_null());
}

#[tokio::test]
async fn evaluate_returns_textual_result() {
    let server = TestServer::default_start().await;

    let response = server
        .client
        .post(server.url("/evaluate"))
        .json(&serde_json::json!({"expression": "$Version"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["kind"], "text");
    assert_eq!(body["result"]["value"], "14.1 for Testing");
}

#[tokio::test]
async fn unsafe_code_is_rejected_before_the_engine() {
    let server = TestServer::default_start().await;

    let response = server
        .client
        .post(server.url("/execute"))
        .json(&serde_json::json!({"code": "Import[\"/etc/passwd\"]"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn empty_code_is_rejected() {
    let server = TestServer::default_start().await;

    let response = server
        .client
        .post(server.url("/execute"))
        .json(&serde_json::json!({"code": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn bearer_auth_gates_execution_endpoints() {
    let server = TestServer::start(
        SecurityConfig {
            api_key: Some("sekrit".to_string()),
            ..SecurityConfig::default()
        },
        ThrottleConfig::default(),
    )
    .await;

    let denied = server
        .client
        .post(server.url("/execute"))
        .json(&serde_json::json!({"code": "2 + 2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    let allowed = server
        .client
        .post(server.url("/execute"))
        .header("Authorization", "Bearer sekrit")
        .json(&serde_json::json!({"code": "2 + 2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);

    // Health stays open without credentials.
    let health = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
}

#[tokio::test]
async fn burst_limit_returns_429() {
    let server = TestServer::start(
        SecurityConfig::default(),
        ThrottleConfig {
            requests_per_minute: 100,
            burst_size: 2,
        },
    )
    .await;

    for _ in 0..2 {
        let ok = server
            .client
            .post(server.url("/execute"))
            .json(&serde_json::json!({"code": "2 + 2"}))
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), 200);
    }

    let throttled = server
        .client
        .post(server.url("/execute"))
        .json(&serde_json::json!({"code": "2 + 2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(throttled.status(), 429);

    let body: serde_json::Value = throttled.json().await.unwrap();
    assert_eq!(body["error"], "RateLimitExceeded");
}

#[tokio::test]
async fn session_endpoint_exposes_lifecycle_diagnostics() {
    let server = TestServer::default_start().await;

    let before: serde_json::Value = server
        .client
        .get(server.url("/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["active"], false);
    assert_eq!(before["state"], "absent");

    server
        .client
        .post(server.url("/execute"))
        .json(&serde_json::json!({"code": "2 + 2"}))
        .send()
        .await
        .unwrap();

    let after: serde_json::Value = server
        .client
        .get(server.url("/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["active"], true);
    assert_eq!(after["state"], "ready");
    assert_eq!(after["kernel_version"], "14.1 for Testing");
}

#[tokio::test]
async fn lax_mode_returns_warnings_alongside_the_result() {
    let server = TestServer::start(
        SecurityConfig {
            strict: false,
            ..SecurityConfig::default()
        },
        ThrottleConfig::default(),
    )
    .await;

    let response = server
        .client
        .post(server.url("/execute"))
        .json(&serde_json::json!({"code": "Export[\"out.csv\", {1, 2}]"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["warnings"]
        .as_array()
        .is_some_and(|warnings| !warnings.is_empty()));
}