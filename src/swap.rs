//! Swap planning and execution
//!
//! The planner decides whether a reward balance is worth swapping: it asks
//! the venue for a quote and applies the dust guard. The executor takes an
//! assembled swap, grants the router an exact allowance, and submits the
//! calldata with a padded gas limit.

use crate::aggregator::{AssembledSwap, SwapQuote, SwapVenue};
use crate::allowance::AllowanceManager;
use crate::chain::{ChainOps, TxOutcome};
use crate::Result;
use alloy::primitives::{Address, U256};
use std::sync::Arc;

/// What the planner decided for one reward balance
#[derive(Debug, Clone)]
pub enum PlanOutcome {
    /// Worth swapping; carry the quote to assembly
    Quote(SwapQuote),
    /// The venue declined to price the path
    QuoteUnavailable,
    /// Quoted output is below the dust threshold; not worth the gas
    BelowDust { quoted_out: U256 },
}

pub struct SwapPlanner<S> {
    venue: S,
    /// Minimum quoted output, in raw settlement-token units
    dust_threshold: U256,
}

impl<S: SwapVenue> SwapPlanner<S> {
    pub fn new(venue: S, dust_threshold: U256) -> Self {
        Self {
            venue,
            dust_threshold,
        }
    }

    pub async fn plan_swap(
        &self,
        trader: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<PlanOutcome> {
        let quote = match self.venue.quote(trader, token_in, token_out, amount_in).await? {
            Some(quote) => quote,
            None => return Ok(PlanOutcome::QuoteUnavailable),
        };

        if quote.out_amount < self.dust_threshold {
            tracing::info!(
                %token_in,
                quoted_out = %quote.out_amount,
                threshold = %self.dust_threshold,
                "quoted output below dust threshold, skipping"
            );
            return Ok(PlanOutcome::BelowDust {
                quoted_out: quote.out_amount,
            });
        }

        Ok(PlanOutcome::Quote(quote))
    }

    pub async fn assemble(
        &self,
        quote: &SwapQuote,
        trader: Address,
    ) -> Result<Option<AssembledSwap>> {
        self.venue.assemble(quote, trader).await
    }
}

/// Pad a venue gas estimate by half, rounding up.
///
/// Aggregator estimates assume the quoted path; by execution time pool
/// states have moved and the real path can cost more.
pub fn gas_with_margin(estimate: u64) -> u64 {
    estimate + estimate.div_ceil(2)
}

pub struct SwapExecutor<C> {
    chain: Arc<C>,
    allowance: AllowanceManager<C>,
}

impl<C: ChainOps> SwapExecutor<C> {
    pub fn new(chain: Arc<C>, allowance: AllowanceManager<C>) -> Self {
        Self { chain, allowance }
    }

    /// Grant the router an exact allowance for the input, then submit the
    /// assembled calldata and wait for its receipt.
    pub async fn execute(
        &self,
        token_in: Address,
        amount_in: U256,
        assembled: &AssembledSwap,
    ) -> Result<TxOutcome> {
        self.allowance
            .ensure(token_in, assembled.to, amount_in)
            .await?;

        let gas_limit = gas_with_margin(assembled.gas);
        tracing::info!(%token_in, %amount_in, router = %assembled.to, gas_limit, "executing swap");

        self.chain
            .send_raw(
                assembled.to,
                assembled.data.clone(),
                assembled.value,
                Some(gas_limit),
            )
            .await
    }
}
