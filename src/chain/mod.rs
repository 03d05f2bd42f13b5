//! On-chain access layer
//!
//! [`ChainOps`] is the seam between the executors and the RPC node: token
//! reads, confirmed approvals, and confirmed raw sends. The production
//! implementation is [`EvmClient`]; tests substitute in-memory fakes.

pub mod abi;
pub mod client;
pub mod confirm;
pub mod erc4626;

pub use client::EvmClient;
pub use confirm::{ConfirmationMonitor, TxOutcome};
pub use erc4626::Erc4626Vault;

use crate::units::format_units;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

/// Chain reads and serialized, confirmed writes.
///
/// Every write submits one transaction and blocks on the confirmation
/// monitor before returning; no two writes from the same account are ever
/// in flight together.
#[async_trait]
pub trait ChainOps: Send + Sync {
    async fn native_balance(&self, account: Address) -> Result<U256>;

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256>;

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256>;

    /// Submit an approval and wait for its receipt
    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxOutcome>;

    /// Submit a raw call and wait for its receipt. With `gas_limit` of
    /// `None` the node's own estimate is used.
    async fn send_raw(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        gas_limit: Option<u64>,
    ) -> Result<TxOutcome>;
}

/// Refuse to start an operation the account cannot pay gas for.
pub async fn ensure_gas_funds<C: ChainOps + ?Sized>(
    chain: &C,
    account: Address,
    min_wei: U256,
) -> Result<()> {
    let balance = chain.native_balance(account).await?;
    if balance < min_wei {
        return Err(Error::Precondition(format!(
            "insufficient native balance for gas: have {} ETH, need at least {} ETH",
            format_units(balance, 18),
            format_units(min_wei, 18),
        )));
    }
    Ok(())
}
