//! Error types for dexroute

use thiserror::Error;

/// Core errors that can occur in dexroute
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// On-chain read errors.
///
/// Every variant is treated as "no liquidity on this path" by the quote
/// evaluators; none of them reach the caller of a quote.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC endpoint unreachable at {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Call reverted: {message}")]
    Reverted { message: String },

    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Operation not supported by {target}: {operation}")]
    Unsupported {
        target: &'static str,
        operation: &'static str,
    },

    #[error("Endpoint reports chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Request-level routing errors surfaced to the caller
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Routing unavailable on chain {chain_id}")]
    ChainNotFound { chain_id: u64 },

    #[error("Input and output token are identical: {token}")]
    IdenticalTokens { token: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },
}

/// Result type alias for dexroute operations
pub type Result<T> = std::result::Result<T, Error>;

impl RouteError {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ChainNotFound { .. } => "chain_not_found",
            Self::IdenticalTokens { .. } => "identical_tokens",
            Self::InvalidAmount { .. } => "invalid_amount",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount { .. } | Self::IdenticalTokens { .. } => 400,
            Self::ChainNotFound { .. } => 422,
        }
    }
}
