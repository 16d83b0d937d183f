//! # Core Error Types
//!
//! Typed errors shared by every chain crate. Application code wraps them in
//! `anyhow::Error` and downcasts where the kind matters (retry decisions).

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Proxy mode is enabled but {path} has no proxies")]
    MissingProxies { path: String },
}

/// Wallet and key loading errors
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("Invalid private key format on line {line}: expected hex string")]
    InvalidKeyFormat { line: usize },

    #[error("Private key on line {line} has wrong length: expected 64 hex chars, got {length}")]
    InvalidKeyLength { line: usize, length: usize },

    #[error("No private keys found in {path}")]
    Empty { path: String },
}

/// Network and remote API errors
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Rate limited by {endpoint}: retry after {retry_after}s")]
    RateLimited { endpoint: String, retry_after: u64 },

    #[error("Connection refused to {endpoint}: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },

    #[error("HTTP error {status_code} from {endpoint}")]
    HttpError { status_code: u16, endpoint: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Chain RPC errors surfaced by chain clients.
///
/// The transaction executor treats `GasEstimation` as terminal and every
/// other variant as retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Gas estimation failed (call would revert): {0}")]
    GasEstimation(String),

    #[error("Broadcast rejected: {0}")]
    Broadcast(String),

    #[error("Transaction {tx_hash} not confirmed after {timeout_secs}s")]
    ConfirmationTimeout { tx_hash: String, timeout_secs: u64 },

    #[error("Transaction {tx_hash} reverted on-chain")]
    Reverted { tx_hash: String },

    #[error("Signing failed: {0}")]
    Signing(String),
}

impl ChainError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ChainError::GasEstimation(_) | ChainError::Signing(_))
    }
}
