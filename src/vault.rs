//! ERC-4626 vault operations
//!
//! [`VaultOps`] is the seam over the share-token contract; [`Erc4626Vault`]
//! implements it over RPC and tests substitute an in-memory fake. The
//! executor layers the account-level semantics on top: balance and gas
//! preconditions before any transaction, exact allowances, and authoritative
//! post-confirmation reads for the reported figures.

use crate::allowance::AllowanceManager;
use crate::audit::{AuditLog, OpKind};
use crate::chain::{ensure_gas_funds, ChainOps, TxOutcome};
use crate::config::MIN_GAS_TRANSFER_WEI;
use crate::units::format_units;
use crate::{Error, Result};
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// The vault contract surface the executor needs
#[async_trait]
pub trait VaultOps: Send + Sync {
    fn address(&self) -> Address;

    async fn asset(&self) -> Result<Address>;

    async fn share_balance(&self, owner: Address) -> Result<U256>;

    async fn convert_to_assets(&self, shares: U256) -> Result<U256>;

    async fn convert_to_shares(&self, assets: U256) -> Result<U256>;

    async fn preview_deposit(&self, assets: U256) -> Result<U256>;

    async fn preview_redeem(&self, shares: U256) -> Result<U256>;

    async fn deposit(&self, assets: U256, receiver: Address) -> Result<TxOutcome>;

    async fn redeem(&self, shares: U256, receiver: Address, owner: Address) -> Result<TxOutcome>;
}

/// How much to withdraw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawAmount {
    /// Redeem the full share balance
    All,
    /// Withdraw this many raw settlement-asset units
    Assets(U256),
}

#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub tx_hash: TxHash,
    pub deposited: U256,
    /// Share balance after confirmation
    pub shares: U256,
    /// Asset value of the position after confirmation
    pub position_value: U256,
}

#[derive(Debug, Clone)]
pub struct WithdrawOutcome {
    pub tx_hash: TxHash,
    pub redeemed_shares: U256,
    pub assets_received: U256,
    pub remaining_shares: U256,
}

#[derive(Debug, Clone)]
pub struct Position {
    pub shares: U256,
    /// Current asset value of the shares
    pub value: U256,
}

pub struct VaultExecutor<C, V> {
    chain: Arc<C>,
    vault: V,
    settlement: Address,
    settlement_decimals: u8,
    account: Address,
    allowance: AllowanceManager<C>,
    audit: AuditLog,
}

impl<C: ChainOps, V: VaultOps> VaultExecutor<C, V> {
    pub fn new(
        chain: Arc<C>,
        vault: V,
        settlement: Address,
        settlement_decimals: u8,
        account: Address,
        allowance: AllowanceManager<C>,
        audit: AuditLog,
    ) -> Self {
        Self {
            chain,
            vault,
            settlement,
            settlement_decimals,
            account,
            allowance,
            audit,
        }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// Deposit `assets` of the settlement token into the vault.
    ///
    /// Rejects zero amounts and amounts exceeding the wallet balance before
    /// anything goes on chain. Reported shares and position value come from
    /// fresh reads after the receipt, not from previews.
    pub async fn deposit(&self, assets: U256) -> Result<DepositOutcome> {
        if assets.is_zero() {
            return Err(Error::Precondition("deposit amount is zero".to_string()));
        }

        ensure_gas_funds(&*self.chain, self.account, U256::from(MIN_GAS_TRANSFER_WEI)).await?;

        let balance = self.chain.erc20_balance(self.settlement, self.account).await?;
        if balance < assets {
            return Err(Error::Precondition(format!(
                "deposit of {} exceeds wallet balance of {}",
                format_units(assets, self.settlement_decimals),
                format_units(balance, self.settlement_decimals),
            )));
        }

        self.allowance
            .ensure(self.settlement, self.vault.address(), assets)
            .await?;

        let expected_shares = self.vault.preview_deposit(assets).await?;
        tracing::debug!(%assets, %expected_shares, "depositing into vault");

        let tx_hash = match self.vault.deposit(assets, self.account).await? {
            TxOutcome::Success { tx_hash } => tx_hash,
            TxOutcome::Reverted { tx_hash } => {
                return Err(Error::Reverted {
                    operation: "deposit",
                    tx_hash,
                })
            }
            TxOutcome::TimedOut { tx_hash } => {
                return Err(Error::ConfirmationTimeout {
                    operation: "deposit",
                    tx_hash,
                })
            }
        };

        let shares = self.vault.share_balance(self.account).await?;
        let position_value = self.vault.convert_to_assets(shares).await?;

        self.audit
            .record(
                OpKind::Deposit,
                Some(tx_hash),
                json!({
                    "assets": assets.to_string(),
                    "shares_after": shares.to_string(),
                    "position_value": position_value.to_string(),
                }),
            )
            .await;

        Ok(DepositOutcome {
            tx_hash,
            deposited: assets,
            shares,
            position_value,
        })
    }

    /// Withdraw from the vault, as shares (all) or as an asset amount.
    ///
    /// An asset amount of zero, or one exceeding the current position value,
    /// is rejected without submitting anything.
    pub async fn withdraw(&self, amount: WithdrawAmount) -> Result<WithdrawOutcome> {
        ensure_gas_funds(&*self.chain, self.account, U256::from(MIN_GAS_TRANSFER_WEI)).await?;

        let held_shares = self.vault.share_balance(self.account).await?;
        if held_shares.is_zero() {
            return Err(Error::Precondition("no vault position to withdraw".to_string()));
        }

        let shares_to_redeem = match amount {
            WithdrawAmount::All => held_shares,
            WithdrawAmount::Assets(assets) => {
                if assets.is_zero() {
                    return Err(Error::Precondition("withdraw amount is zero".to_string()));
                }
                let position_value = self.vault.convert_to_assets(held_shares).await?;
                if assets > position_value {
                    return Err(Error::Precondition(format!(
                        "withdraw of {} exceeds position value of {}",
                        format_units(assets, self.settlement_decimals),
                        format_units(position_value, self.settlement_decimals),
                    )));
                }
                self.vault.convert_to_shares(assets).await?.min(held_shares)
            }
        };

        let balance_before = self.chain.erc20_balance(self.settlement, self.account).await?;
        let expected_assets = self.vault.preview_redeem(shares_to_redeem).await?;
        tracing::debug!(%shares_to_redeem, %expected_assets, "redeeming from vault");

        let tx_hash = match self
            .vault
            .redeem(shares_to_redeem, self.account, self.account)
            .await?
        {
            TxOutcome::Success { tx_hash } => tx_hash,
            TxOutcome::Reverted { tx_hash } => {
                return Err(Error::Reverted {
                    operation: "withdraw",
                    tx_hash,
                })
            }
            TxOutcome::TimedOut { tx_hash } => {
                return Err(Error::ConfirmationTimeout {
                    operation: "withdraw",
                    tx_hash,
                })
            }
        };

        // independent reads, no write between them
        let (balance_after, remaining_shares) = tokio::try_join!(
            self.chain.erc20_balance(self.settlement, self.account),
            self.vault.share_balance(self.account),
        )?;
        let assets_received = balance_after.saturating_sub(balance_before);

        self.audit
            .record(
                OpKind::Withdraw,
                Some(tx_hash),
                json!({
                    "redeemed_shares": shares_to_redeem.to_string(),
                    "assets_received": assets_received.to_string(),
                    "remaining_shares": remaining_shares.to_string(),
                }),
            )
            .await;

        Ok(WithdrawOutcome {
            tx_hash,
            redeemed_shares: shares_to_redeem,
            assets_received,
            remaining_shares,
        })
    }

    /// Current position: held shares and their asset value
    pub async fn position(&self) -> Result<Position> {
        let shares = self.vault.share_balance(self.account).await?;
        let value = if shares.is_zero() {
            U256::ZERO
        } else {
            self.vault.convert_to_assets(shares).await?
        };
        Ok(Position { shares, value })
    }
}
