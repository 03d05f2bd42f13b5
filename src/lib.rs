//! Vault Compounder
//!
//! Automates the reward loop for an ERC-4626 yield vault:
//! - Claim merkle-distributed reward tokens from the distributor
//! - Swap each reward balance into the stable settlement asset via a
//!   swap aggregator
//! - Deposit the proceeds back into the vault
//!
//! # Safety Model
//!
//! - Exactly one transaction in flight at a time; every write blocks on a
//!   confirmed receipt or a bounded timeout
//! - Allowances are granted per-operation for the exact amount, never
//!   unbounded
//! - A confirmation timeout is an unknown outcome and is never retried
//!   automatically
//! - Per-token swap failures are contained; claim and deposit failures
//!   abort the run
//! - Private keys never leave the wallet module
//! - Full audit trail of all value-moving operations

pub mod aggregator;
pub mod allowance;
pub mod audit;
pub mod chain;
pub mod compound;
pub mod config;
pub mod distributor;
pub mod swap;
pub mod throttle;
pub mod units;
pub mod vault;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use chain::{ChainOps, ConfirmationMonitor, Erc4626Vault, EvmClient, TxOutcome};
pub use compound::{CompoundReport, Compounder, RunPhase, SwapOutcome};
pub use config::Config;
pub use error::{Error, Result};
pub use vault::{VaultExecutor, WithdrawAmount};
