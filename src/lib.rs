//! # Wolfram Server - Kernel Session Broker
//!
//! Brokers access to a single long-lived Wolfram kernel process on behalf of
//! many concurrent callers:
//! - Session lifecycle with health probing, retry/backoff, and transparent
//!   recreation of dead sessions
//! - A dedicated worker thread isolating the kernel's blocking calls from the
//!   async runtime (and serializing all evaluations)
//! - Timeout-bounded execution with structured outcomes
//! - An HTTP façade with code screening, throttling, and bearer auth
//!
//! ## Architecture
//!
//! ```text
//!   HTTP requests → ┌──────────────────────────────────┐
//!                   │            Engine                │
//!                   │  ┌─────────┐  ┌───────────────┐  │
//!                   │  │ Session │→ │ KernelWorker  │──┼──→ kernel process
//!                   │  │  Guard  │  │ (one thread)  │  │
//!                   │  └─────────┘  └───────────────┘  │
//!                   └──────────────────────────────────┘
//! ```
//!
//! The guard serializes session creation and health checks; the worker's
//! single thread serializes the evaluations themselves.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod engine;
pub mod security;
pub mod server;
pub mod sweeper;
pub mod throttle;
pub mod types;

// Internal utilities
pub mod observability;

pub use engine::{Engine, Outcome};
pub use types::{Config, Error, Result};
