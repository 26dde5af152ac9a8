//! Error handling for the application

use thiserror::Error;

/// Contract read / JSON-RPC errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Execution reverted: {0}")]
    Reverted(String),

    #[error("No result for request id {0}")]
    MissingResult(u64),

    #[error("Failed to decode result: {0}")]
    Decode(String),
}

impl CallError {
    /// Transport failures and provider throttling are worth retrying; other
    /// RPC error objects are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CallError::Transport(_) => true,
            CallError::Rpc { code, message } => is_rate_limit(*code, message),
            _ => false,
        }
    }
}

/// JSON-RPC error codes providers use for throttling
const RATE_LIMIT_CODES: &[i64] = &[-32005, -32029, 429];

/// Whether a JSON-RPC error object reports rate limiting
pub fn is_rate_limit(code: i64, message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    RATE_LIMIT_CODES.contains(&code) || message.contains("rate limit") || message.contains("too many requests")
}

/// Price-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("Unknown trading pair: {0}")]
    UnknownPair(String),

    #[error("Invalid price data: {0}")]
    InvalidPriceData(String),
}

/// Integration contract errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("Status read failed: {0}")]
    StatusUnavailable(#[from] CallError),

    #[error("Invalid status data: {0}")]
    InvalidStatus(String),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Blockchain error: {0}")]
    BlockchainError(String),

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(u64),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<CallError> for AppError {
    fn from(err: CallError) -> Self {
        AppError::BlockchainError(err.to_string())
    }
}

impl From<PriceError> for AppError {
    fn from(err: PriceError) -> Self {
        AppError::Unknown(err.to_string())
    }
}

impl From<IntegrationError> for AppError {
    fn from(err: IntegrationError) -> Self {
        AppError::BlockchainError(err.to_string())
    }
}
