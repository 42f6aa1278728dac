//! Core types for the Wolfram server.
//!
//! This module provides foundational types used throughout the system:
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the server, engine, and
//!   collaborators

mod config;
mod errors;

pub use config::{
    Config, EngineConfig, ObservabilityConfig, SecurityConfig, ServerConfig, SweeperConfig,
    ThrottleConfig,
};
pub use errors::{Error, Result};
