//! RPC-backed implementation of [`ChainOps`]

use crate::chain::abi::IERC20;
use crate::chain::confirm::{ConfirmationMonitor, TxOutcome};
use crate::chain::ChainOps;
use crate::{Error, Result};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

/// Chain client over a signing provider
///
/// Reads use plain `eth_call`; writes submit through the provider's wallet
/// and block on the confirmation monitor before returning.
pub struct EvmClient {
    provider: DynProvider,
    confirm: ConfirmationMonitor,
}

impl EvmClient {
    pub fn new(provider: DynProvider, confirm: ConfirmationMonitor) -> Self {
        Self { provider, confirm }
    }
}

#[async_trait]
impl ChainOps for EvmClient {
    async fn native_balance(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256> {
        IERC20::new(token, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256> {
        IERC20::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxOutcome> {
        let pending = IERC20::new(token, self.provider.clone())
            .approve(spender, amount)
            .send()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(%token, %spender, %amount, %tx_hash, "approval submitted");
        self.confirm.confirm(tx_hash).await
    }

    async fn send_raw(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        gas_limit: Option<u64>,
    ) -> Result<TxOutcome> {
        let mut tx = TransactionRequest::default()
            .with_to(to)
            .with_input(data)
            .with_value(value);
        if let Some(gas) = gas_limit {
            tx = tx.with_gas_limit(gas);
        }

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| Error::Rpc(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(%to, ?gas_limit, %tx_hash, "transaction submitted");
        self.confirm.confirm(tx_hash).await
    }
}
