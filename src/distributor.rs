//! Reward claim resolver
//!
//! Rewards accrue in a merkle distributor: an off-chain index serves per-user
//! entries (cumulative accrued amount, cumulative claimed amount, proofs) and
//! the on-chain contract verifies claims against the current root.
//!
//! The claim transaction carries the *cumulative* total per token, not the
//! incremental claimable delta — distributor claims are monotonic running
//! totals and the proof only verifies against the total. The claimable delta
//! is used for filtering and reporting only.

use crate::chain::abi::IMerklDistributor;
use crate::chain::{ChainOps, TxOutcome};
use crate::throttle::Throttle;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

/// One claimable reward, fresh from the distributor index
#[derive(Debug, Clone)]
pub struct RewardEntry {
    pub token: Address,
    pub symbol: String,
    pub decimals: u8,
    /// Cumulative amount accrued to date
    pub total: U256,
    /// Cumulative amount already claimed
    pub claimed: U256,
    /// total − claimed; always > 0 for entries returned by the resolver
    pub claimable: U256,
    pub proofs: Vec<B256>,
}

/// Source of claimable rewards and the batched claim operation
#[async_trait]
pub trait RewardSource: Send + Sync {
    /// Claimable entries for the account on the target chain. Entries with
    /// nothing left to claim are never returned.
    async fn fetch_claimable_rewards(&self, account: Address) -> Result<Vec<RewardEntry>>;

    /// Submit one batched claim for all entries and wait for its receipt.
    /// Returns `None` without submitting anything when `entries` is empty.
    async fn claim_all(
        &self,
        account: Address,
        entries: &[RewardEntry],
    ) -> Result<Option<TxOutcome>>;
}

// Wire format of the distributor index (GET /users/{address}/rewards)

#[derive(Debug, Deserialize)]
struct ChainRewards {
    chain: ChainRef,
    rewards: Vec<RawReward>,
}

#[derive(Debug, Deserialize)]
struct ChainRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawReward {
    token: RawToken,
    amount: String,
    claimed: String,
    proofs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawToken {
    address: Address,
    symbol: String,
    decimals: u8,
}

/// Merkl distributor client: off-chain index plus on-chain claim contract
pub struct MerklDistributor<C> {
    http: reqwest::Client,
    api_url: String,
    contract: Address,
    chain_id: u64,
    throttle: Throttle,
    chain: Arc<C>,
}

impl<C: ChainOps> MerklDistributor<C> {
    pub fn new(
        chain: Arc<C>,
        contract: Address,
        api_url: &str,
        chain_id: u64,
        throttle: Throttle,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            contract,
            chain_id,
            throttle,
            chain,
        }
    }
}

#[async_trait]
impl<C: ChainOps> RewardSource for MerklDistributor<C> {
    async fn fetch_claimable_rewards(&self, account: Address) -> Result<Vec<RewardEntry>> {
        let url = format!(
            "{}/users/{}/rewards?chainId={}",
            self.api_url, account, self.chain_id
        );

        self.throttle.acquire().await;
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Distributor(format!(
                "index query failed with status {}",
                response.status()
            )));
        }

        let payload: Vec<ChainRewards> = response
            .json()
            .await
            .map_err(|e| Error::Distributor(format!("malformed index response: {}", e)))?;

        parse_rewards(&payload, self.chain_id)
    }

    async fn claim_all(
        &self,
        account: Address,
        entries: &[RewardEntry],
    ) -> Result<Option<TxOutcome>> {
        if entries.is_empty() {
            tracing::info!("no claimable rewards, skipping claim");
            return Ok(None);
        }

        let (users, tokens, amounts, proofs) = claim_args(account, entries);
        let call = IMerklDistributor::claimCall {
            users,
            tokens,
            amounts,
            proofs,
        };

        tracing::info!(entries = entries.len(), "submitting batched claim");
        let outcome = self
            .chain
            .send_raw(self.contract, Bytes::from(call.abi_encode()), U256::ZERO, None)
            .await?;
        Ok(Some(outcome))
    }
}

/// Convert the index payload into claimable entries for one chain.
///
/// Entries on other chains and entries with claimable ≤ 0 are dropped.
fn parse_rewards(payload: &[ChainRewards], chain_id: u64) -> Result<Vec<RewardEntry>> {
    let mut entries = Vec::new();

    for chain_rewards in payload {
        if chain_rewards.chain.id != chain_id {
            continue;
        }

        for reward in &chain_rewards.rewards {
            let total = U256::from_str(&reward.amount)
                .map_err(|e| Error::Distributor(format!("bad amount: {}", e)))?;
            let claimed = U256::from_str(&reward.claimed)
                .map_err(|e| Error::Distributor(format!("bad claimed amount: {}", e)))?;

            // claimed can never exceed total on a well-behaved index;
            // saturate rather than trust it
            let claimable = total.saturating_sub(claimed);
            if claimable.is_zero() {
                continue;
            }

            let proofs = reward
                .proofs
                .iter()
                .map(|p| {
                    B256::from_str(p).map_err(|e| Error::Distributor(format!("bad proof: {}", e)))
                })
                .collect::<Result<Vec<_>>>()?;

            entries.push(RewardEntry {
                token: reward.token.address,
                symbol: reward.token.symbol.clone(),
                decimals: reward.token.decimals,
                total,
                claimed,
                claimable,
                proofs,
            });
        }
    }

    Ok(entries)
}

/// Build the parallel argument arrays for the batched claim call.
///
/// `amounts` carries the cumulative total per entry.
fn claim_args(
    account: Address,
    entries: &[RewardEntry],
) -> (Vec<Address>, Vec<Address>, Vec<U256>, Vec<Vec<B256>>) {
    let mut users = Vec::with_capacity(entries.len());
    let mut tokens = Vec::with_capacity(entries.len());
    let mut amounts = Vec::with_capacity(entries.len());
    let mut proofs = Vec::with_capacity(entries.len());

    for entry in entries {
        users.push(account);
        tokens.push(entry.token);
        amounts.push(entry.total);
        proofs.push(entry.proofs.clone());
    }

    (users, tokens, amounts, proofs)
}
