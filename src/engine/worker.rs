//! Blocking call isolator.
//!
//! One dedicated OS thread owns the kernel handle and executes every blocking
//! kernel call (launch, evaluate, terminate). Callers talk to it over a
//! bounded command channel and await a oneshot reply, so kernel calls never
//! occupy the async runtime and are naturally serialized: no two evaluations
//! can overlap even if the session guard's mutex were bypassed.
//!
//! The worker imposes no timeout of its own. A caller that stops waiting
//! drops its reply receiver; the worker finishes the stale call, the reply
//! send fails, and the result is discarded. Until that call returns, queued
//! commands wait behind it.

use tokio::sync::{mpsc, oneshot};

use crate::engine::kernel::{EvalMode, EvalOutput, Kernel, KernelLauncher};
use crate::types::{Error, Result};

const COMMAND_QUEUE_DEPTH: usize = 32;

enum Command {
    Launch {
        reply: oneshot::Sender<Result<()>>,
    },
    Evaluate {
        source: String,
        mode: EvalMode,
        reply: oneshot::Sender<Result<EvalOutput>>,
    },
    Terminate {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Handle to the kernel worker thread. Cheap to clone; all clones feed the
/// same single-capacity worker.
#[derive(Debug, Clone)]
pub struct KernelWorker {
    tx: mpsc::Sender<Command>,
}

impl KernelWorker {
    /// Spawn the worker thread. The launcher moves onto the thread and is the
    /// only code that ever constructs a kernel handle.
    pub fn spawn<L: KernelLauncher>(launcher: L) -> Result<Self> {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        std::thread::Builder::new()
            .name("kernel-worker".to_string())
            .spawn(move || worker_loop(launcher, rx))?;
        Ok(Self { tx })
    }

    /// Replace the current kernel (terminating any previous one) with a
    /// freshly launched handle.
    pub async fn launch(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Launch { reply }).await?;
        Self::receive(rx).await
    }

    /// Evaluate one expression against the current kernel.
    pub async fn evaluate(&self, source: impl Into<String>, mode: EvalMode) -> Result<EvalOutput> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Evaluate {
            source: source.into(),
            mode,
            reply,
        })
        .await?;
        Self::receive(rx).await
    }

    /// Terminate and drop the current kernel, if any.
    pub async fn terminate(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Terminate { reply }).await?;
        Self::receive(rx).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::transport("kernel worker is gone"))
    }

    async fn receive<T>(rx: oneshot::Receiver<Result<T>>) -> Result<T> {
        rx.await
            .map_err(|_| Error::transport("kernel worker dropped the reply"))?
    }
}

fn worker_loop<L: KernelLauncher>(launcher: L, mut rx: mpsc::Receiver<Command>) {
    let mut kernel: Option<L::Kernel> = None;

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Launch { reply } => {
                // At most one handle exists: the old one goes before the new
                // one is constructed.
                terminate_quietly(&mut kernel);
                let result = launcher.launch().map(|fresh| {
                    kernel = Some(fresh);
                });
                let _ = reply.send(result);
            }
            Command::Evaluate {
                source,
                mode,
                reply,
            } => {
                let result = match kernel.as_mut() {
                    Some(k) => k.evaluate(&source, mode),
                    None => Err(Error::transport("no kernel session")),
                };
                // The caller may have timed out and gone away; the late
                // result is simply dropped.
                let _ = reply.send(result);
            }
            Command::Terminate { reply } => {
                let result = match kernel.take() {
                    Some(mut k) => k.terminate(),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
        }
    }

    terminate_quietly(&mut kernel);
}

fn terminate_quietly<K: Kernel>(kernel: &mut Option<K>) {
    if let Some(mut k) = kernel.take() {
        if let Err(err) = k.terminate() {
            tracing::warn!("kernel_terminate_failed: {err}");
        }
    }
}
