//! Transaction confirmation monitor
//!
//! Races receipt polling against a fixed timeout and reports one of three
//! outcomes: confirmed success, confirmed revert, or timeout. A timeout is
//! an *unknown* outcome — the transaction may still land — so the monitor
//! never resubmits or bumps gas; any retry decision belongs to the caller.

use crate::Result;
use alloy::primitives::TxHash;
use alloy::providers::{DynProvider, Provider};
use std::time::Duration;

/// Terminal observation for a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Receipt obtained with success status
    Success { tx_hash: TxHash },
    /// Receipt obtained with failed status; gas was spent, state unchanged
    Reverted { tx_hash: TxHash },
    /// No receipt within the bound; the transaction may still be included
    TimedOut { tx_hash: TxHash },
}

impl TxOutcome {
    pub fn tx_hash(&self) -> TxHash {
        match self {
            TxOutcome::Success { tx_hash }
            | TxOutcome::Reverted { tx_hash }
            | TxOutcome::TimedOut { tx_hash } => *tx_hash,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Success { .. })
    }
}

/// Bounded wait for on-chain inclusion
#[derive(Clone)]
pub struct ConfirmationMonitor {
    provider: DynProvider,
    timeout: Duration,
    poll_interval: Duration,
}

impl ConfirmationMonitor {
    pub fn new(provider: DynProvider, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            provider,
            timeout,
            poll_interval,
        }
    }

    /// Wait for a receipt, bounded by the configured timeout.
    ///
    /// RPC errors while polling never abort the wait: the transaction is
    /// already submitted, so a flaky node must not turn it into a reported
    /// failure. The timeout bound is the only way out without a receipt.
    pub async fn confirm(&self, tx_hash: TxHash) -> Result<TxOutcome> {
        let wait_for_receipt = async {
            loop {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(%tx_hash, error = %e, "receipt poll failed, retrying");
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.timeout, wait_for_receipt).await {
            Ok(receipt) => {
                if receipt.status() {
                    tracing::debug!(%tx_hash, "transaction confirmed");
                    Ok(TxOutcome::Success { tx_hash })
                } else {
                    tracing::warn!(%tx_hash, "transaction reverted on-chain");
                    Ok(TxOutcome::Reverted { tx_hash })
                }
            }
            Err(_) => {
                tracing::warn!(
                    %tx_hash,
                    timeout_secs = self.timeout.as_secs(),
                    "no receipt within timeout, outcome unknown"
                );
                Ok(TxOutcome::TimedOut { tx_hash })
            }
        }
    }
}
