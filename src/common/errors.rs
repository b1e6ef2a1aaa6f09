//! Error types for the application

use thiserror::Error;

/// Result type alias using our StrategyError
pub type Result<T> = std::result::Result<T, StrategyError>;

/// Main error type for strategy and exchange operations
#[derive(Error, Debug)]
pub enum StrategyError {
    /// Not enough candle history to derive a volatility unit
    #[error("insufficient candle data: need {needed}, got {got}")]
    DataInsufficient { needed: usize, got: usize },

    /// Symbol is not listed in the exchange instrument metadata
    #[error("precision unavailable for symbol: {0}")]
    PrecisionUnavailable(String),

    /// The exchange rejected the order parameters; never retried
    #[error("order rejected by exchange: {0}")]
    OrderRejected(String),

    /// Network or remote failure; retried, then surfaced
    #[error("transport error: {0}")]
    Transport(String),

    /// Command issued in a state that does not allow it
    #[error("invalid state transition: {command} not allowed in {state}")]
    InvalidState { command: String, state: String },

    /// Invalid API response
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Authentication errors
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for StrategyError {
    fn from(err: reqwest::Error) -> Self {
        StrategyError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for StrategyError {
    fn from(err: serde_json::Error) -> Self {
        StrategyError::InvalidResponse(err.to_string())
    }
}
