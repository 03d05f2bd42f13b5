//! Vault Compounder CLI
//!
//! Command-line interface for claiming rewards, swapping them to the
//! settlement asset, and compounding into the vault.

use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vault_compounder::aggregator::OdosApi;
use vault_compounder::allowance::AllowanceManager;
use vault_compounder::audit::AuditLog;
use vault_compounder::compound::{SwapOutcome, SwapReport};
use vault_compounder::config::MIN_GAS_COMPOUND_WEI;
use vault_compounder::distributor::MerklDistributor;
use vault_compounder::swap::{SwapExecutor, SwapPlanner};
use vault_compounder::throttle::Throttle;
use vault_compounder::units::{format_units, parse_units};
use vault_compounder::vault::VaultOps;
use vault_compounder::wallet::SecureWallet;
use vault_compounder::{
    Compounder, Config, ConfirmationMonitor, Erc4626Vault, Error, EvmClient, Result,
    VaultExecutor, WithdrawAmount,
};

#[derive(Parser)]
#[command(name = "compounder")]
#[command(about = "Auto-compounds merkle-distributed rewards into an ERC-4626 vault")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one compound cycle: claim rewards, swap, deposit
    Compound,

    /// Deposit settlement tokens into the vault
    Deposit {
        /// Amount in settlement-asset units (e.g. "25.50")
        amount: String,
    },

    /// Withdraw from the vault
    Withdraw {
        /// Amount in settlement-asset units, or "all"
        amount: String,
    },

    /// Show the current vault position
    Position,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compound => run_compound(config).await?,
        Commands::Deposit { amount } => run_deposit(config, &amount).await?,
        Commands::Withdraw { amount } => run_withdraw(config, &amount).await?,
        Commands::Position => run_position(config).await?,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Wired production components shared by the commands
struct App {
    chain: Arc<EvmClient>,
    vault: VaultExecutor<EvmClient, Erc4626Vault>,
    audit: AuditLog,
    throttle: Throttle,
    account: alloy::primitives::Address,
    config: Config,
}

async fn build_app(config: Config) -> Result<App> {
    let wallet = SecureWallet::load(&config.wallet)?;
    let account = wallet.address();
    tracing::info!(address = %account, "wallet loaded");

    let provider = wallet.provider(&config.rpc_url)?;
    let confirm = ConfirmationMonitor::new(
        provider.clone(),
        Duration::from_secs(config.confirm_timeout_secs),
        Duration::from_millis(config.receipt_poll_ms),
    );
    let chain = Arc::new(EvmClient::new(provider.clone(), confirm.clone()));

    let vault = Erc4626Vault::new(config.vault, provider, confirm);

    // Guard against misconfiguration before anything can move value.
    let asset = vault.asset().await?;
    if asset != config.settlement_token {
        return Err(Error::Config(format!(
            "vault asset {} does not match configured settlement token {}",
            asset, config.settlement_token
        )));
    }

    let audit = AuditLog::from_config(config.audit_log_path.as_deref());
    let throttle = Throttle::new(Duration::from_millis(config.throttle_ms));

    let vault_executor = VaultExecutor::new(
        chain.clone(),
        vault,
        config.settlement_token,
        config.settlement_decimals,
        account,
        AllowanceManager::new(chain.clone(), account, audit.clone()),
        audit.clone(),
    );

    Ok(App {
        chain,
        vault: vault_executor,
        audit,
        throttle,
        account,
        config,
    })
}

async fn run_compound(config: Config) -> Result<()> {
    let app = build_app(config).await?;
    let config = &app.config;

    let rewards = MerklDistributor::new(
        app.chain.clone(),
        config.distributor,
        &config.distributor_api,
        config.chain_id,
        app.throttle.clone(),
    );
    let venue = OdosApi::new(
        &config.aggregator_api,
        config.chain_id,
        config.slippage_percent,
        app.throttle.clone(),
    );
    let planner = SwapPlanner::new(venue, U256::from(config.dust_threshold));
    let swapper = SwapExecutor::new(
        app.chain.clone(),
        AllowanceManager::new(app.chain.clone(), app.account, app.audit.clone()),
    );

    let mut compounder = Compounder::new(
        app.chain.clone(),
        app.vault,
        rewards,
        planner,
        swapper,
        app.account,
        config.settlement_token,
        config.reward_tokens.clone(),
        U256::from(MIN_GAS_COMPOUND_WEI),
        app.audit.clone(),
    );

    let report = compounder.run().await?;
    let decimals = config.settlement_decimals;

    match &report.claim {
        Some(claim) => {
            println!("Claimed {} reward(s) in {}", claim.rewards.len(), claim.tx_hash);
            for reward in &claim.rewards {
                println!(
                    "  {} {}",
                    format_units(reward.claimable, reward.decimals),
                    reward.symbol
                );
            }
        }
        None => println!("No claimable rewards"),
    }

    for swap in &report.swaps {
        print_swap(swap, decimals);
    }

    match &report.deposit {
        Some(deposit) => {
            println!(
                "Deposited {} in {}",
                format_units(deposit.deposited, decimals),
                deposit.tx_hash
            );
            println!(
                "Position: {} shares worth {}",
                deposit.shares,
                format_units(deposit.position_value, decimals)
            );
        }
        None => println!("Nothing to deposit"),
    }

    Ok(())
}

fn print_swap(swap: &SwapReport, decimals: u8) {
    match &swap.outcome {
        SwapOutcome::Executed { tx_hash, quoted_out } => println!(
            "Swapped {} for ~{} in {}",
            swap.symbol,
            format_units(*quoted_out, decimals),
            tx_hash
        ),
        SwapOutcome::SkippedNoBalance => {
            println!("Skipped {}: no balance", swap.symbol)
        }
        SwapOutcome::SkippedDust { quoted_out } => println!(
            "Skipped {}: quoted output {} is dust",
            swap.symbol,
            format_units(*quoted_out, decimals)
        ),
        SwapOutcome::SkippedNoQuote => {
            println!("Skipped {}: no quote available", swap.symbol)
        }
        SwapOutcome::SkippedNoAssembly => {
            println!("Skipped {}: aggregator declined to assemble", swap.symbol)
        }
        SwapOutcome::Reverted { tx_hash } => {
            println!("Swap of {} REVERTED in {}", swap.symbol, tx_hash)
        }
        SwapOutcome::Unknown { tx_hash } => println!(
            "Swap of {} UNCONFIRMED ({}); check before retrying",
            swap.symbol, tx_hash
        ),
        SwapOutcome::Failed { reason } => {
            println!("Swap of {} failed: {}", swap.symbol, reason)
        }
    }
}

async fn run_deposit(config: Config, amount: &str) -> Result<()> {
    let decimals = config.settlement_decimals;
    let assets = parse_units(amount, decimals)?;

    let app = build_app(config).await?;
    let outcome = app.vault.deposit(assets).await?;

    println!(
        "Deposited {} in {}",
        format_units(outcome.deposited, decimals),
        outcome.tx_hash
    );
    println!(
        "Position: {} shares worth {}",
        outcome.shares,
        format_units(outcome.position_value, decimals)
    );
    Ok(())
}

async fn run_withdraw(config: Config, amount: &str) -> Result<()> {
    let decimals = config.settlement_decimals;
    let request = if amount.eq_ignore_ascii_case("all") {
        WithdrawAmount::All
    } else {
        WithdrawAmount::Assets(parse_units(amount, decimals)?)
    };

    let app = build_app(config).await?;
    let outcome = app.vault.withdraw(request).await?;

    println!(
        "Withdrew {} ({} shares) in {}",
        format_units(outcome.assets_received, decimals),
        outcome.redeemed_shares,
        outcome.tx_hash
    );
    println!("Remaining shares: {}", outcome.remaining_shares);
    Ok(())
}

async fn run_position(config: Config) -> Result<()> {
    let decimals = config.settlement_decimals;
    let app = build_app(config).await?;

    let position = app.vault.position().await?;
    if position.shares.is_zero() {
        println!("No vault position");
    } else {
        println!(
            "{} shares worth {}",
            position.shares,
            format_units(position.value, decimals)
        );
    }
    Ok(())
}
