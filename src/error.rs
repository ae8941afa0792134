//! Error types for airdrop and collect runs

use std::time::Duration;

use alloy::primitives::{B256, U256};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, AirdropError>;

/// Main error type for the library
#[derive(Debug, Error)]
pub enum AirdropError {
    /// Malformed account identifier in an input list
    #[error("Invalid address at index {index}: '{value}'")]
    InvalidAddress { index: usize, value: String },

    /// Amount that does not parse or is not positive
    #[error("Invalid amount at index {index}: '{value}'")]
    InvalidAmount { index: usize, value: String },

    /// Secret key that does not parse (the key itself is never echoed)
    #[error("Invalid secret key at index {index}")]
    InvalidSecretKey { index: usize },

    /// Parallel account and amount vectors differ in length
    #[error("Length mismatch: {accounts} accounts, {amounts} amounts")]
    LengthMismatch { accounts: usize, amounts: usize },

    /// Sender cannot cover the run
    #[error("Insufficient {asset} balance: required {required}, available {available}")]
    InsufficientBalance {
        asset: String,
        required: U256,
        available: U256,
    },

    /// Distributor allowance too low and approval disabled
    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: U256, available: U256 },

    /// Receipt came back with a non-success status
    #[error("Transaction {tx_hash} failed: {description}")]
    TransactionFailed { tx_hash: B256, description: String },

    /// Receipt not observed within the configured bound
    #[error("Timed out after {waited:?} waiting for receipt of {tx_hash}")]
    Timeout { tx_hash: B256, waited: Duration },

    /// Retry budget exhausted on a transient RPC failure
    #[error("RPC '{operation}' still failing after {attempts} attempts: {last_error}")]
    TransientRpc {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    /// Raw transport or node error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Node rejected a signed transaction
    #[error("Broadcast of {tx_hash} rejected: {message}")]
    Broadcast { tx_hash: B256, message: String },

    /// Signature error
    #[error("Signing error: {0}")]
    Signing(String),

    /// Encoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Decoding error
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// File access error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AirdropError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AirdropError::Rpc(_))
    }
}
