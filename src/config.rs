//! Configuration for the vault compounder
//!
//! Defaults target the Moonwell Flagship USDC vault on Base. Every field can
//! be overridden from a JSON config file; omitted fields fall back to the
//! defaults below.

use crate::{Error, Result};
use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Well-known contract addresses and endpoints on Base
pub mod base {
    use super::*;

    pub const CHAIN_ID: u64 = 8453;
    pub const RPC_URL: &str = "https://mainnet.base.org";

    /// Moonwell Flagship USDC vault (ERC-4626)
    pub const VAULT: Address = address!("c1256Ae5FF1cf2719D4937adb3bbCCab2E00A2Ca");
    pub const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    pub const WELL: Address = address!("A88594D404727625A9437C3f886C7643872296AE");
    pub const MORPHO: Address = address!("BAa5CC21fd487B8Fcc2F632f3F4E8D37262a0842");
    pub const MERKL_DISTRIBUTOR: Address = address!("3Ef3D8bA38EBe18DB133cEc108f4D14CE00Dd9Ae");

    pub const MERKL_API: &str = "https://api.merkl.xyz/v4";
    pub const ODOS_API: &str = "https://api.odos.xyz/sor";
}

/// Minimum native balance before a compound run is attempted (0.0005 ETH,
/// several transactions).
pub const MIN_GAS_COMPOUND_WEI: u128 = 500_000_000_000_000;

/// Minimum native balance for a single deposit/withdraw (0.0001 ETH).
pub const MIN_GAS_TRANSFER_WEI: u128 = 100_000_000_000_000;

/// Where the signing key comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum KeySource {
    /// Hex-encoded private key in an environment variable
    Env { var: String },
    /// Hex-encoded private key in a file (supports `~/` expansion)
    File { path: String },
}

impl Default for KeySource {
    fn default() -> Self {
        KeySource::Env {
            var: "COMPOUNDER_PRIVATE_KEY".to_string(),
        }
    }
}

/// A reward token the compound run checks and swaps to the settlement asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTokenConfig {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chain_id: u64,
    pub rpc_url: String,
    /// ERC-4626 vault receiving the settlement asset
    pub vault: Address,
    /// Stable settlement asset all rewards are converted into
    pub settlement_token: Address,
    pub settlement_decimals: u8,
    /// Reward tokens checked during a compound run
    pub reward_tokens: Vec<RewardTokenConfig>,
    /// Merkle distributor contract
    pub distributor: Address,
    pub distributor_api: String,
    pub aggregator_api: String,
    /// Maximum swap slippage tolerance in percent
    pub slippage_percent: f64,
    /// Minimum quoted output in raw settlement-asset units; smaller swaps
    /// are skipped as dust
    pub dust_threshold: u64,
    /// Bound on waiting for transaction inclusion
    pub confirm_timeout_secs: u64,
    pub receipt_poll_ms: u64,
    /// Minimum spacing between outbound HTTP calls, shared process-wide
    pub throttle_ms: u64,
    /// Path to the JSONL audit log; `None` disables audit logging
    pub audit_log_path: Option<String>,
    pub wallet: KeySource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: base::CHAIN_ID,
            rpc_url: base::RPC_URL.to_string(),
            vault: base::VAULT,
            settlement_token: base::USDC,
            settlement_decimals: 6,
            reward_tokens: vec![
                RewardTokenConfig {
                    address: base::WELL,
                    symbol: "WELL".to_string(),
                    decimals: 18,
                },
                RewardTokenConfig {
                    address: base::MORPHO,
                    symbol: "MORPHO".to_string(),
                    decimals: 18,
                },
            ],
            distributor: base::MERKL_DISTRIBUTOR,
            distributor_api: base::MERKL_API.to_string(),
            aggregator_api: base::ODOS_API.to_string(),
            slippage_percent: 1.0,
            dust_threshold: 10_000, // 0.01 USDC
            confirm_timeout_secs: 90,
            receipt_poll_ms: 2_000,
            throttle_ms: 300,
            audit_log_path: Some("compounder-audit.jsonl".to_string()),
            wallet: KeySource::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, or the defaults when `path` is
    /// `None` and no config exists at the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = default_config_path();
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }
}

/// Default config location: `~/.config/vault-compounder/config.json`
pub fn default_config_path() -> PathBuf {
    expand_home("~/.config/vault-compounder/config.json")
}

/// Expand a leading `~/` using the HOME environment variable
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
