//! RPC-backed implementation of the vault surface

use crate::chain::abi::IERC4626;
use crate::chain::confirm::{ConfirmationMonitor, TxOutcome};
use crate::vault::VaultOps;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use async_trait::async_trait;

/// An ERC-4626 share-token vault at a fixed address
pub struct Erc4626Vault {
    address: Address,
    provider: DynProvider,
    confirm: ConfirmationMonitor,
}

impl Erc4626Vault {
    pub fn new(address: Address, provider: DynProvider, confirm: ConfirmationMonitor) -> Self {
        Self {
            address,
            provider,
            confirm,
        }
    }

    fn instance(&self) -> IERC4626::IERC4626Instance<DynProvider> {
        IERC4626::new(self.address, self.provider.clone())
    }
}

#[async_trait]
impl VaultOps for Erc4626Vault {
    fn address(&self) -> Address {
        self.address
    }

    async fn asset(&self) -> Result<Address> {
        self.instance()
            .asset()
            .call()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn share_balance(&self, owner: Address) -> Result<U256> {
        self.instance()
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn convert_to_assets(&self, shares: U256) -> Result<U256> {
        self.instance()
            .convertToAssets(shares)
            .call()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn convert_to_shares(&self, assets: U256) -> Result<U256> {
        self.instance()
            .convertToShares(assets)
            .call()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn preview_deposit(&self, assets: U256) -> Result<U256> {
        self.instance()
            .previewDeposit(assets)
            .call()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn preview_redeem(&self, shares: U256) -> Result<U256> {
        self.instance()
            .previewRedeem(shares)
            .call()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn deposit(&self, assets: U256, receiver: Address) -> Result<TxOutcome> {
        let pending = self
            .instance()
            .deposit(assets, receiver)
            .send()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(%assets, %tx_hash, "vault deposit submitted");
        self.confirm.confirm(tx_hash).await
    }

    async fn redeem(&self, shares: U256, receiver: Address, owner: Address) -> Result<TxOutcome> {
        let pending = self
            .instance()
            .redeem(shares, receiver, owner)
            .send()
            .await
            .map_err(|e| Error::Rpc(e.to_string()))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(%shares, %tx_hash, "vault redeem submitted");
        self.confirm.confirm(tx_hash).await
    }
}
