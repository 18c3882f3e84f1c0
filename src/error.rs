// src/error.rs
use crate::types::Side;
use thiserror::Error;

/// Recoverable failures inside a single iteration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Insufficient data: need {required} candles, got {received}")]
    InsufficientData { required: usize, received: usize },

    #[error("{side} order failed: {reason}")]
    OrderFailed { side: Side, reason: String },
}

/// Startup failures. Any of these keeps the loop from starting.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
