//! Idempotent allowance management
//!
//! Before any value-moving call, the spender contract must hold sufficient
//! transfer authorization. The grant is always exactly the amount about to
//! move, never unbounded, keeping standing exposure to any one spender at
//! zero between runs.

use crate::audit::{AuditLog, OpKind};
use crate::chain::{ChainOps, TxOutcome};
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use serde_json::json;
use std::sync::Arc;

pub struct AllowanceManager<C> {
    chain: Arc<C>,
    owner: Address,
    audit: AuditLog,
}

impl<C: ChainOps> AllowanceManager<C> {
    pub fn new(chain: Arc<C>, owner: Address, audit: AuditLog) -> Self {
        Self {
            chain,
            owner,
            audit,
        }
    }

    /// Ensure `spender` may move `required` of `token` from the owner.
    ///
    /// No-op when the current grant already covers the amount. Otherwise
    /// submits an approval for exactly `required` and blocks until it is
    /// confirmed; an unconfirmed approval is fatal to the calling operation.
    pub async fn ensure(&self, token: Address, spender: Address, required: U256) -> Result<()> {
        let current = self
            .chain
            .erc20_allowance(token, self.owner, spender)
            .await?;

        if current >= required {
            tracing::debug!(%token, %spender, %current, %required, "allowance sufficient");
            return Ok(());
        }

        tracing::info!(%token, %spender, %required, "granting allowance");
        match self.chain.approve(token, spender, required).await? {
            TxOutcome::Success { tx_hash } => {
                self.audit
                    .record(
                        OpKind::Approve,
                        Some(tx_hash),
                        json!({
                            "token": token.to_string(),
                            "spender": spender.to_string(),
                            "amount": required.to_string(),
                        }),
                    )
                    .await;
                Ok(())
            }
            TxOutcome::Reverted { tx_hash } => Err(Error::Reverted {
                operation: "approve",
                tx_hash,
            }),
            TxOutcome::TimedOut { tx_hash } => Err(Error::ConfirmationTimeout {
                operation: "approve",
                tx_hash,
            }),
        }
    }
}
