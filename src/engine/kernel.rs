//! Kernel binding — the abstract capability the engine runs against.
//!
//! Any concrete client that can launch a kernel, evaluate expressions, and
//! terminate is substitutable here; tests use scripted fakes, production uses
//! [`crate::engine::process::ProcessLauncher`].
//!
//! Both traits are intentionally blocking: calls into a Wolfram kernel block
//! until the kernel answers. They may only ever run on the
//! [`crate::engine::worker::KernelWorker`] thread, never on the async runtime.

use crate::types::Result;

/// How the source text is interpreted by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Parse as a Wolfram Language expression and return the result in
    /// `InputForm` (structured, re-parseable).
    Strict,
    /// Evaluate and return the result rendered as display text (`OutputForm`).
    Textual,
}

/// Result of one kernel evaluation.
///
/// The kernel distinguishes "I evaluated this and it failed" (a sentinel
/// value such as `$Failed` or `$Aborted`) from a transport-level error, which
/// surfaces as `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutput {
    /// The rendered result text.
    Value(String),
    /// The kernel's failure sentinel, verbatim.
    Failure(String),
}

/// One live kernel connection.
pub trait Kernel: Send + 'static {
    /// Evaluate one expression, blocking until the kernel answers.
    fn evaluate(&mut self, source: &str, mode: EvalMode) -> Result<EvalOutput>;

    /// Tear the kernel down. Called at most once; the handle is dropped
    /// afterwards regardless of the outcome.
    fn terminate(&mut self) -> Result<()>;
}

/// Factory for kernel connections.
pub trait KernelLauncher: Send + 'static {
    type Kernel: Kernel;

    /// Launch a fresh kernel, blocking until the connection is usable.
    fn launch(&self) -> Result<Self::Kernel>;
}
