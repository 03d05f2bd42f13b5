//! Error types for the vault compounder

use alloy::primitives::TxHash;
use thiserror::Error;

/// Failure taxonomy for a compounder run.
///
/// `Reverted` and `ConfirmationTimeout` are deliberately separate variants:
/// a timed-out transaction may still land later, so callers must treat it as
/// an unknown outcome requiring reconciliation, never as a plain failure.
#[derive(Error, Debug)]
pub enum Error {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("distributor error: {0}")]
    Distributor(String),

    #[error("aggregator error: {0}")]
    Aggregator(String),

    #[error("{operation} transaction reverted: {tx_hash}")]
    Reverted {
        operation: &'static str,
        tx_hash: TxHash,
    },

    #[error("{operation} transaction not confirmed within timeout, outcome unknown: {tx_hash}")]
    ConfirmationTimeout {
        operation: &'static str,
        tx_hash: TxHash,
    },

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
