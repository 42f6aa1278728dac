//! Background maintenance for long-running deployments.
//!
//! Periodically tears down kernel sessions idle past the configured
//! threshold and evicts stale throttle windows. The engine works without it;
//! `Engine::sweep_idle` stays callable ad hoc.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::interval;

use crate::engine::Engine;
use crate::throttle::RateLimiter;
use crate::types::SweeperConfig;

/// Sweeper handles periodic maintenance; start it once, stop it on shutdown.
#[derive(Debug)]
pub struct Sweeper {
    engine: Arc<Engine>,
    limiter: Arc<Mutex<RateLimiter>>,
    config: SweeperConfig,
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Sweeper {
    pub fn new(
        engine: Arc<Engine>,
        limiter: Arc<Mutex<RateLimiter>>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            engine,
            limiter,
            config,
            stop_tx: None,
        }
    }

    /// Start the maintenance loop in the background.
    /// Returns immediately; sweeping runs in a spawned task.
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let engine = self.engine.clone();
        let limiter = self.limiter.clone();
        let period = self.config.interval;
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
        self.stop_tx = Some(stop_tx);

        tokio::spawn(async move {
            let mut ticker = interval(period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let swept = engine.sweep_idle().await;
                        let evicted = limiter.lock().await.cleanup_expired();
                        if swept || evicted > 0 {
                            tracing::debug!(
                                session_swept = swept,
                                throttle_windows_evicted = evicted,
                                "sweep_cycle_completed"
                            );
                        }
                    }
                    _ = &mut stop_rx => {
                        tracing::info!("sweeper_stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the maintenance loop.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}
