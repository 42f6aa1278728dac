//! Wolfram server - main entry point.
//!
//! Wires config, tracing, the kernel engine, the background sweeper, and the
//! HTTP façade, then serves until ctrl-c.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use wolfram_server::engine::{Engine, ProcessLauncher};
use wolfram_server::security::{BearerAuth, CodeValidator};
use wolfram_server::server::{self, AppState};
use wolfram_server::sweeper::Sweeper;
use wolfram_server::throttle::RateLimiter;
use wolfram_server::Config;

#[derive(Parser, Debug)]
#[command(name = "wolfram-server", version, about = "Wolfram kernel execution service")]
struct Args {
    /// HTTP bind address
    #[arg(long, env = "WOLFRAM_LISTEN_ADDR")]
    listen: Option<String>,

    /// Path to the Wolfram kernel executable
    #[arg(long, env = "WOLFRAM_KERNEL_PATH")]
    kernel_path: Option<PathBuf>,

    /// Log warnings for risky code instead of rejecting it
    #[arg(long)]
    lax: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if let Some(path) = args.kernel_path {
        config.engine.kernel_path = Some(path);
    }
    if args.lax {
        config.security.strict = false;
    }

    wolfram_server::observability::init_tracing(&config.observability);

    let launcher = ProcessLauncher::new(config.engine.kernel_path.clone());
    let engine = Arc::new(Engine::new(launcher, config.engine.clone())?);

    // Surface kernel availability early; the server still starts without it
    // and retries on demand.
    match engine.is_available().await {
        (true, _) => tracing::info!("wolfram_kernel_available"),
        (false, reason) => {
            tracing::warn!("wolfram_kernel_unavailable: {}", reason.unwrap_or_default())
        }
    }

    let limiter = Arc::new(Mutex::new(RateLimiter::new(config.throttle.clone())));
    let state = Arc::new(AppState {
        engine: engine.clone(),
        validator: CodeValidator::new(&config.security),
        auth: BearerAuth::new(config.security.api_key.clone()),
        limiter: limiter.clone(),
    });

    let mut sweeper = Sweeper::new(engine.clone(), limiter, config.sweeper.clone());
    let sweeper_handle = sweeper.start();

    let addr: SocketAddr = config.server.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "wolfram_server_listening");

    axum::serve(
        listener,
        server::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    tracing::info!("wolfram_server_shutting_down");
    sweeper.stop();
    let _ = sweeper_handle.await;
    engine.shutdown().await;

    Ok(())
}
