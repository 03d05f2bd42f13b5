//! The compound cycle
//!
//! One run walks claim → swap → deposit for a single account. Failures are
//! partitioned by blast radius: anything that poisons the whole cycle
//! (unreachable distributor, reverted claim, reverted deposit) aborts the
//! run, while per-token swap trouble is contained at the token boundary so
//! one bad path never strands value claimed for the others.

use crate::aggregator::SwapVenue;
use crate::audit::{AuditLog, OpKind};
use crate::chain::{ensure_gas_funds, ChainOps, TxOutcome};
use crate::config::RewardTokenConfig;
use crate::distributor::{RewardEntry, RewardSource};
use crate::swap::{PlanOutcome, SwapExecutor, SwapPlanner};
use crate::vault::{DepositOutcome, VaultExecutor, VaultOps};
use crate::{Error, Result};
use alloy::primitives::{Address, TxHash, U256};
use serde_json::json;
use std::sync::Arc;

/// Where a run is in its cycle; inspectable after completion or failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    ClaimPending,
    ClaimDone,
    SwappingTokens(usize),
    SwapsDone,
    DepositPending,
    Done,
}

/// What happened to one reward token's swap
#[derive(Debug, Clone)]
pub enum SwapOutcome {
    Executed { tx_hash: TxHash, quoted_out: U256 },
    SkippedNoBalance,
    SkippedDust { quoted_out: U256 },
    SkippedNoQuote,
    SkippedNoAssembly,
    Reverted { tx_hash: TxHash },
    /// Confirmation timed out; the swap may still land. Never retried.
    Unknown { tx_hash: TxHash },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct SwapReport {
    pub token: Address,
    pub symbol: String,
    pub outcome: SwapOutcome,
}

#[derive(Debug, Clone)]
pub struct ClaimSummary {
    pub tx_hash: TxHash,
    pub rewards: Vec<RewardEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct CompoundReport {
    /// `None` when there was nothing to claim
    pub claim: Option<ClaimSummary>,
    pub swaps: Vec<SwapReport>,
    /// `None` when no settlement balance accumulated
    pub deposit: Option<DepositOutcome>,
}

pub struct Compounder<C, V, R, S> {
    chain: Arc<C>,
    vault: VaultExecutor<C, V>,
    rewards: R,
    planner: SwapPlanner<S>,
    swapper: SwapExecutor<C>,
    account: Address,
    settlement_token: Address,
    reward_tokens: Vec<RewardTokenConfig>,
    min_gas_wei: U256,
    audit: AuditLog,
    phase: RunPhase,
}

impl<C, V, R, S> Compounder<C, V, R, S>
where
    C: ChainOps,
    V: VaultOps,
    R: RewardSource,
    S: SwapVenue,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Arc<C>,
        vault: VaultExecutor<C, V>,
        rewards: R,
        planner: SwapPlanner<S>,
        swapper: SwapExecutor<C>,
        account: Address,
        settlement_token: Address,
        reward_tokens: Vec<RewardTokenConfig>,
        min_gas_wei: U256,
        audit: AuditLog,
    ) -> Self {
        Self {
            chain,
            vault,
            rewards,
            planner,
            swapper,
            account,
            settlement_token,
            reward_tokens,
            min_gas_wei,
            audit,
            phase: RunPhase::ClaimPending,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Run one full cycle: claim pending rewards, swap reward balances into
    /// the settlement token, deposit the proceeds.
    pub async fn run(&mut self) -> Result<CompoundReport> {
        ensure_gas_funds(&*self.chain, self.account, self.min_gas_wei).await?;

        let mut report = CompoundReport::default();

        self.phase = RunPhase::ClaimPending;
        let entries = self.rewards.fetch_claimable_rewards(self.account).await?;
        tracing::info!(claimable = entries.len(), "fetched reward entries");

        report.claim = self.claim(&entries).await?;
        self.phase = RunPhase::ClaimDone;

        for (index, token) in self.reward_tokens.clone().iter().enumerate() {
            self.phase = RunPhase::SwappingTokens(index);
            let outcome = self.process_reward_token(token).await;
            tracing::info!(symbol = %token.symbol, ?outcome, "reward token processed");
            report.swaps.push(SwapReport {
                token: token.address,
                symbol: token.symbol.clone(),
                outcome,
            });
        }
        self.phase = RunPhase::SwapsDone;

        let settlement_balance = self
            .chain
            .erc20_balance(self.settlement_token, self.account)
            .await?;
        if settlement_balance.is_zero() {
            tracing::info!("no settlement balance accumulated, skipping deposit");
        } else {
            self.phase = RunPhase::DepositPending;
            report.deposit = Some(self.vault.deposit(settlement_balance).await?);
        }
        self.phase = RunPhase::Done;

        self.audit
            .record(
                OpKind::Compound,
                report.deposit.as_ref().map(|d| d.tx_hash),
                json!({
                    "claimed_entries": report.claim.as_ref().map_or(0, |c| c.rewards.len()),
                    "swaps": report.swaps.len(),
                    "deposited": report
                        .deposit
                        .as_ref()
                        .map(|d| d.deposited.to_string()),
                }),
            )
            .await;

        Ok(report)
    }

    /// Submit the batched claim. Claim failure is fatal: without the claimed
    /// balances the rest of the cycle works from stale state.
    async fn claim(&self, entries: &[RewardEntry]) -> Result<Option<ClaimSummary>> {
        match self.rewards.claim_all(self.account, entries).await? {
            None => Ok(None),
            Some(TxOutcome::Success { tx_hash }) => {
                self.audit
                    .record(
                        OpKind::Claim,
                        Some(tx_hash),
                        json!({
                            "entries": entries
                                .iter()
                                .map(|e| json!({
                                    "symbol": e.symbol,
                                    "claimable": e.claimable.to_string(),
                                }))
                                .collect::<Vec<_>>(),
                        }),
                    )
                    .await;
                Ok(Some(ClaimSummary {
                    tx_hash,
                    rewards: entries.to_vec(),
                }))
            }
            Some(TxOutcome::Reverted { tx_hash }) => Err(Error::Reverted {
                operation: "claim",
                tx_hash,
            }),
            Some(TxOutcome::TimedOut { tx_hash }) => Err(Error::ConfirmationTimeout {
                operation: "claim",
                tx_hash,
            }),
        }
    }

    /// Swap one reward token's full balance into the settlement token.
    /// Everything that can go wrong here stays inside the returned outcome.
    async fn process_reward_token(&self, token: &RewardTokenConfig) -> SwapOutcome {
        if token.address == self.settlement_token {
            // settlement-denominated rewards deposit directly
            return SwapOutcome::SkippedNoBalance;
        }

        let balance = match self.chain.erc20_balance(token.address, self.account).await {
            Ok(balance) => balance,
            Err(e) => {
                return SwapOutcome::Failed {
                    reason: format!("balance read failed: {}", e),
                }
            }
        };
        if balance.is_zero() {
            return SwapOutcome::SkippedNoBalance;
        }

        let quote = match self
            .planner
            .plan_swap(self.account, token.address, self.settlement_token, balance)
            .await
        {
            Ok(PlanOutcome::Quote(quote)) => quote,
            Ok(PlanOutcome::QuoteUnavailable) => return SwapOutcome::SkippedNoQuote,
            Ok(PlanOutcome::BelowDust { quoted_out }) => {
                return SwapOutcome::SkippedDust { quoted_out }
            }
            Err(e) => {
                return SwapOutcome::Failed {
                    reason: format!("planning failed: {}", e),
                }
            }
        };

        let assembled = match self.planner.assemble(&quote, self.account).await {
            Ok(Some(assembled)) => assembled,
            Ok(None) => return SwapOutcome::SkippedNoAssembly,
            Err(e) => {
                return SwapOutcome::Failed {
                    reason: format!("assembly failed: {}", e),
                }
            }
        };

        match self.swapper.execute(token.address, balance, &assembled).await {
            Ok(TxOutcome::Success { tx_hash }) => {
                self.audit
                    .record(
                        OpKind::Swap,
                        Some(tx_hash),
                        json!({
                            "token_in": token.address.to_string(),
                            "symbol": token.symbol,
                            "amount_in": balance.to_string(),
                            "quoted_out": quote.out_amount.to_string(),
                        }),
                    )
                    .await;
                SwapOutcome::Executed {
                    tx_hash,
                    quoted_out: quote.out_amount,
                }
            }
            Ok(TxOutcome::Reverted { tx_hash }) => SwapOutcome::Reverted { tx_hash },
            Ok(TxOutcome::TimedOut { tx_hash }) => SwapOutcome::Unknown { tx_hash },
            Err(e) => SwapOutcome::Failed {
                reason: format!("execution failed: {}", e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{AssembledSwap, SwapQuote};
    use crate::allowance::AllowanceManager;
    use alloy::primitives::{address, b256, Bytes};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const ACCOUNT: Address = address!("2000000000000000000000000000000000000002");
    const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    const WELL: Address = address!("A88594D404727625A9437C3f886C7643872296AE");
    const MORPHO: Address = address!("BAa5CC21fd487B8Fcc2F632f3F4E8D37262a0842");
    const VAULT: Address = address!("c1256Ae5FF1cf2719D4937adb3bbCCab2E00A2Ca");
    const ROUTER: Address = address!("Cf5540fFFCdC3d510B18bFcA6d2b9987b0772559");

    const CLAIM_TX: TxHash =
        b256!("1111111111111111111111111111111111111111111111111111111111111111");
    const SWAP_TX: TxHash =
        b256!("2222222222222222222222222222222222222222222222222222222222222222");

    /// Shared world state: token balances, vault shares, and the effect each
    /// router call should apply when it lands.
    #[derive(Default)]
    struct Ledger {
        balances: HashMap<Address, U256>,
        shares: U256,
        native_balance: U256,
        /// (token_in, settlement credit, outcome) consumed per router call
        swap_effects: Vec<(Address, U256, TxOutcome)>,
    }

    struct FakeChain {
        ledger: Arc<Mutex<Ledger>>,
    }

    #[async_trait]
    impl ChainOps for FakeChain {
        async fn native_balance(&self, _account: Address) -> Result<U256> {
            Ok(self.ledger.lock().unwrap().native_balance)
        }

        async fn erc20_balance(&self, token: Address, _owner: Address) -> Result<U256> {
            Ok(self
                .ledger
                .lock()
                .unwrap()
                .balances
                .get(&token)
                .copied()
                .unwrap_or(U256::ZERO))
        }

        async fn erc20_allowance(
            &self,
            _token: Address,
            _owner: Address,
            _spender: Address,
        ) -> Result<U256> {
            Ok(U256::ZERO)
        }

        async fn approve(
            &self,
            _token: Address,
            _spender: Address,
            _amount: U256,
        ) -> Result<TxOutcome> {
            Ok(TxOutcome::Success {
                tx_hash: b256!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            })
        }

        async fn send_raw(
            &self,
            _to: Address,
            _data: Bytes,
            _value: U256,
            _gas_limit: Option<u64>,
        ) -> Result<TxOutcome> {
            let mut ledger = self.ledger.lock().unwrap();
            let (token_in, credit, outcome) = ledger.swap_effects.remove(0);
            if outcome.is_success() {
                ledger.balances.insert(token_in, U256::ZERO);
                *ledger.balances.entry(USDC).or_insert(U256::ZERO) += credit;
            }
            Ok(outcome)
        }
    }

    struct FakeVault {
        ledger: Arc<Mutex<Ledger>>,
    }

    #[async_trait]
    impl VaultOps for FakeVault {
        fn address(&self) -> Address {
            VAULT
        }

        async fn asset(&self) -> Result<Address> {
            Ok(USDC)
        }

        async fn share_balance(&self, _owner: Address) -> Result<U256> {
            Ok(self.ledger.lock().unwrap().shares)
        }

        async fn convert_to_assets(&self, shares: U256) -> Result<U256> {
            Ok(shares)
        }

        async fn convert_to_shares(&self, assets: U256) -> Result<U256> {
            Ok(assets)
        }

        async fn preview_deposit(&self, assets: U256) -> Result<U256> {
            Ok(assets)
        }

        async fn preview_redeem(&self, shares: U256) -> Result<U256> {
            Ok(shares)
        }

        async fn deposit(&self, assets: U256, _receiver: Address) -> Result<TxOutcome> {
            let mut ledger = self.ledger.lock().unwrap();
            *ledger.balances.entry(USDC).or_insert(U256::ZERO) -= assets;
            ledger.shares += assets;
            Ok(TxOutcome::Success {
                tx_hash: b256!("dddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddd"),
            })
        }

        async fn redeem(
            &self,
            _shares: U256,
            _receiver: Address,
            _owner: Address,
        ) -> Result<TxOutcome> {
            unreachable!("compound never redeems")
        }
    }

    /// Claiming credits each entry's claimable amount to the wallet
    struct FakeRewards {
        entries: Vec<RewardEntry>,
        ledger: Arc<Mutex<Ledger>>,
        claim_outcome: TxOutcome,
    }

    #[async_trait]
    impl RewardSource for FakeRewards {
        async fn fetch_claimable_rewards(&self, _account: Address) -> Result<Vec<RewardEntry>> {
            Ok(self.entries.clone())
        }

        async fn claim_all(
            &self,
            _account: Address,
            entries: &[RewardEntry],
        ) -> Result<Option<TxOutcome>> {
            if entries.is_empty() {
                return Ok(None);
            }
            if self.claim_outcome.is_success() {
                let mut ledger = self.ledger.lock().unwrap();
                for entry in entries {
                    *ledger.balances.entry(entry.token).or_insert(U256::ZERO) += entry.claimable;
                }
            }
            Ok(Some(self.claim_outcome))
        }
    }

    /// Quotes 1 settlement unit per 100 input units; always assembles
    struct FakeVenue;

    #[async_trait]
    impl SwapVenue for FakeVenue {
        async fn quote(
            &self,
            _trader: Address,
            _token_in: Address,
            _token_out: Address,
            amount_in: U256,
        ) -> Result<Option<SwapQuote>> {
            Ok(Some(SwapQuote {
                path_id: "path".to_string(),
                out_amount: amount_in / U256::from(100),
                gas_estimate: 200_000,
                out_value_usd: 1.0,
            }))
        }

        async fn assemble(
            &self,
            _quote: &SwapQuote,
            _trader: Address,
        ) -> Result<Option<AssembledSwap>> {
            Ok(Some(AssembledSwap {
                to: ROUTER,
                data: Bytes::from(vec![0x01]),
                value: U256::ZERO,
                gas: 200_000,
            }))
        }
    }

    fn entry(token: Address, symbol: &str, claimable: u64) -> RewardEntry {
        RewardEntry {
            token,
            symbol: symbol.to_string(),
            decimals: 18,
            total: U256::from(claimable),
            claimed: U256::ZERO,
            claimable: U256::from(claimable),
            proofs: vec![],
        }
    }

    fn reward_token(address: Address, symbol: &str) -> RewardTokenConfig {
        RewardTokenConfig {
            address,
            symbol: symbol.to_string(),
            decimals: 18,
        }
    }

    fn compounder(
        entries: Vec<RewardEntry>,
        claim_outcome: TxOutcome,
        ledger: Arc<Mutex<Ledger>>,
    ) -> Compounder<FakeChain, FakeVault, FakeRewards, FakeVenue> {
        let chain = Arc::new(FakeChain {
            ledger: ledger.clone(),
        });
        let vault_executor = VaultExecutor::new(
            chain.clone(),
            FakeVault {
                ledger: ledger.clone(),
            },
            USDC,
            6,
            ACCOUNT,
            AllowanceManager::new(chain.clone(), ACCOUNT, AuditLog::disabled()),
            AuditLog::disabled(),
        );
        let rewards = FakeRewards {
            entries,
            ledger,
            claim_outcome,
        };
        let planner = SwapPlanner::new(FakeVenue, U256::from(10_000));
        let swapper = SwapExecutor::new(
            chain.clone(),
            AllowanceManager::new(chain.clone(), ACCOUNT, AuditLog::disabled()),
        );

        Compounder::new(
            chain,
            vault_executor,
            rewards,
            planner,
            swapper,
            ACCOUNT,
            USDC,
            vec![reward_token(WELL, "WELL"), reward_token(MORPHO, "MORPHO")],
            U256::from(500_000_000_000_000u64),
            AuditLog::disabled(),
        )
    }

    fn funded_ledger() -> Arc<Mutex<Ledger>> {
        Arc::new(Mutex::new(Ledger {
            native_balance: U256::from(10).pow(U256::from(18)),
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_full_cycle_claims_swaps_and_deposits() {
        let ledger = funded_ledger();
        {
            let mut l = ledger.lock().unwrap();
            // both swaps land: 5M WELL → 50k USDC, 3M MORPHO → 30k USDC
            l.swap_effects = vec![
                (WELL, U256::from(50_000), TxOutcome::Success { tx_hash: SWAP_TX }),
                (MORPHO, U256::from(30_000), TxOutcome::Success { tx_hash: SWAP_TX }),
            ];
        }
        let mut compounder = compounder(
            vec![entry(WELL, "WELL", 5_000_000), entry(MORPHO, "MORPHO", 3_000_000)],
            TxOutcome::Success { tx_hash: CLAIM_TX },
            ledger.clone(),
        );

        let report = compounder.run().await.unwrap();

        let claim = report.claim.unwrap();
        assert_eq!(claim.tx_hash, CLAIM_TX);
        assert_eq!(claim.rewards.len(), 2);

        assert_eq!(report.swaps.len(), 2);
        assert!(matches!(
            report.swaps[0].outcome,
            SwapOutcome::Executed { quoted_out, .. } if quoted_out == U256::from(50_000)
        ));
        assert!(matches!(report.swaps[1].outcome, SwapOutcome::Executed { .. }));

        let deposit = report.deposit.unwrap();
        assert_eq!(deposit.deposited, U256::from(80_000));
        assert_eq!(deposit.shares, U256::from(80_000));

        assert_eq!(compounder.phase(), RunPhase::Done);
        let ledger = ledger.lock().unwrap();
        assert_eq!(ledger.balances.get(&USDC), Some(&U256::ZERO));
        assert_eq!(ledger.shares, U256::from(80_000));
    }

    #[tokio::test]
    async fn test_one_reverted_swap_does_not_strand_the_rest() {
        let ledger = funded_ledger();
        {
            let mut l = ledger.lock().unwrap();
            l.swap_effects = vec![
                (
                    WELL,
                    U256::ZERO,
                    TxOutcome::Reverted {
                        tx_hash: b256!(
                            "3333333333333333333333333333333333333333333333333333333333333333"
                        ),
                    },
                ),
                (MORPHO, U256::from(30_000), TxOutcome::Success { tx_hash: SWAP_TX }),
            ];
        }
        let mut compounder = compounder(
            vec![entry(WELL, "WELL", 5_000_000), entry(MORPHO, "MORPHO", 3_000_000)],
            TxOutcome::Success { tx_hash: CLAIM_TX },
            ledger.clone(),
        );

        let report = compounder.run().await.unwrap();

        assert!(matches!(report.swaps[0].outcome, SwapOutcome::Reverted { .. }));
        assert!(matches!(report.swaps[1].outcome, SwapOutcome::Executed { .. }));

        // only the MORPHO proceeds reached the vault; WELL stays in the wallet
        assert_eq!(report.deposit.unwrap().deposited, U256::from(30_000));
        let ledger = ledger.lock().unwrap();
        assert_eq!(ledger.balances.get(&WELL), Some(&U256::from(5_000_000)));
        assert_eq!(compounder.phase(), RunPhase::Done);
    }

    #[tokio::test]
    async fn test_nothing_to_do_run_sends_no_transactions() {
        let ledger = funded_ledger();
        let mut compounder = compounder(
            vec![],
            TxOutcome::Success { tx_hash: CLAIM_TX },
            ledger.clone(),
        );

        let report = compounder.run().await.unwrap();

        assert!(report.claim.is_none());
        assert!(report
            .swaps
            .iter()
            .all(|s| matches!(s.outcome, SwapOutcome::SkippedNoBalance)));
        assert!(report.deposit.is_none());
        assert_eq!(compounder.phase(), RunPhase::Done);
        assert_eq!(ledger.lock().unwrap().shares, U256::ZERO);
    }

    #[tokio::test]
    async fn test_dust_output_skips_the_swap_but_deposits_existing_balance() {
        let ledger = funded_ledger();
        ledger
            .lock()
            .unwrap()
            .balances
            .insert(USDC, U256::from(20_000));
        let mut compounder = compounder(
            // 100k WELL quotes to 1k USDC, under the 10k dust threshold
            vec![entry(WELL, "WELL", 100_000)],
            TxOutcome::Success { tx_hash: CLAIM_TX },
            ledger.clone(),
        );

        let report = compounder.run().await.unwrap();

        assert!(report.claim.is_some());
        assert!(matches!(
            report.swaps[0].outcome,
            SwapOutcome::SkippedDust { quoted_out } if quoted_out == U256::from(1_000)
        ));
        // the settlement balance already in the wallet still compounds
        assert_eq!(report.deposit.unwrap().deposited, U256::from(20_000));

        // the claimed dust balance stays in the wallet for a later run
        assert_eq!(
            ledger.lock().unwrap().balances.get(&WELL),
            Some(&U256::from(100_000))
        );
    }

    #[tokio::test]
    async fn test_reverted_claim_aborts_the_run() {
        let ledger = funded_ledger();
        let mut compounder = compounder(
            vec![entry(WELL, "WELL", 5_000_000)],
            TxOutcome::Reverted {
                tx_hash: b256!("4444444444444444444444444444444444444444444444444444444444444444"),
            },
            ledger.clone(),
        );

        let result = compounder.run().await;
        assert!(matches!(
            result,
            Err(Error::Reverted {
                operation: "claim",
                ..
            })
        ));
        assert_eq!(ledger.lock().unwrap().shares, U256::ZERO);
    }

    #[tokio::test]
    async fn test_insufficient_gas_refuses_to_start() {
        let ledger = Arc::new(Mutex::new(Ledger::default()));
        let mut compounder = compounder(
            vec![entry(WELL, "WELL", 5_000_000)],
            TxOutcome::Success { tx_hash: CLAIM_TX },
            ledger,
        );

        let result = compounder.run().await;
        assert!(matches!(result, Err(Error::Precondition(_))));
        assert_eq!(compounder.phase(), RunPhase::ClaimPending);
    }
}
