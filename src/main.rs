//! Kinetic CLI
//!
//! Command-line interface for the Kinetic money market on Flare.

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use kinetic_client::config::rpc::chains;
use kinetic_client::wallet::{SecureWallet, PRIVATE_KEY_ENV};
use kinetic_client::{
    AlloyGateway, ClientConfig, ComptrollerOperations, Error, MarketClient, MarketOperations,
    RedeemMode, Result, RpcConfig, TokenRegistry, VersionGated,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Read-only address used when no private key is configured
const WALLET_ADDRESS_ENV: &str = "WALLET_ADDRESS";

#[derive(Parser)]
#[command(name = "kinetic")]
#[command(about = "Kinetic money market client for Flare")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Supply underlying tokens to a market
    Supply {
        /// Underlying token symbol (e.g. USDC.e)
        symbol: String,
        /// Amount in whole tokens
        amount: Decimal,
    },

    /// Redeem from a market
    Redeem {
        symbol: String,
        amount: Decimal,
        /// Amount is in kTokens rather than underlying
        #[arg(long)]
        ktoken: bool,
    },

    /// Borrow from a market
    Borrow { symbol: String, amount: Decimal },

    /// Repay a borrow
    Repay {
        symbol: String,
        amount: Decimal,
        /// Repay on behalf of another borrower
        #[arg(long)]
        borrower: Option<Address>,
    },

    /// Enter markets as collateral
    Enter {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Exit a collateral market
    Exit { symbol: String },

    /// Show account liquidity and shortfall
    Liquidity {
        /// Account to query (defaults to the wallet)
        #[arg(long)]
        address: Option<Address>,
    },

    /// Show a market's stored exchange rate
    ExchangeRate { symbol: String },

    /// List every market known to the comptroller
    Markets,

    /// Show listing, collateral factor and mint pause for a market
    MarketStatus { symbol: String },

    /// Show token and kToken balances
    Balance {
        symbol: String,
        #[arg(long)]
        address: Option<Address>,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    if let Commands::Config = cli.command {
        return print_json(&config);
    }

    let client = connect(config).await?;
    let reader = read_only_fallback(client.inner().wallet_address(), read_address());

    match cli.command {
        Commands::Supply { symbol, amount } => {
            print_json(&client.supply(&symbol, amount).await?)?;
        }
        Commands::Redeem {
            symbol,
            amount,
            ktoken,
        } => {
            let mode = if ktoken {
                RedeemMode::KToken
            } else {
                RedeemMode::Underlying
            };
            print_json(&client.redeem(&symbol, amount, mode).await?)?;
        }
        Commands::Borrow { symbol, amount } => {
            print_json(&client.borrow(&symbol, amount).await?)?;
        }
        Commands::Repay {
            symbol,
            amount,
            borrower,
        } => {
            print_json(&client.repay_borrow(&symbol, amount, borrower).await?)?;
        }
        Commands::Enter { symbols } => {
            let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
            let entry = client.enter_markets(&symbols).await?;
            for result in &entry.results {
                println!("{}: {}", result.symbol, result.label());
            }
            print_json(&entry)?;
        }
        Commands::Exit { symbol } => {
            let exit = client.exit_market(&symbol).await?;
            println!("{}: {}", exit.result.symbol, exit.result.label());
            print_json(&exit)?;
        }
        Commands::Liquidity { address } => {
            print_json(&client.get_account_liquidity(address.or(reader)).await?)?;
        }
        Commands::ExchangeRate { symbol } => {
            println!("{}", client.get_exchange_rate(&symbol).await?);
        }
        Commands::Markets => {
            let markets = client.get_all_markets().await?;
            let registry = client.inner().registry();
            for market in markets {
                println!("{} {}", market, registry.symbol_for(&market).unwrap_or("?"));
            }
        }
        Commands::MarketStatus { symbol } => {
            print_json(&client.market_status(&symbol).await?)?;
        }
        Commands::Balance { symbol, address } => {
            let address = address.or(reader);
            let balance = client.get_balance(&symbol, address).await?;
            println!("{}: {}", symbol, balance);
            if let Some(ksymbol) = paired_ktoken(client.inner().registry(), &symbol) {
                let ktokens = client.get_ktoken_balance(&symbol, address).await?;
                println!("{}: {}", ksymbol, ktokens);
            }
        }
        Commands::Config => {}
    }

    Ok(())
}

async fn connect(config: ClientConfig) -> Result<VersionGated<MarketClient<AlloyGateway>>> {
    let rpc_url = match &config.rpc_url {
        Some(url) => url.clone(),
        None => RpcConfig::from_env()
            .get(chains::FLARE)
            .map(str::to_string)
            .ok_or_else(|| Error::Config("No RPC URL for Flare".to_string()))?,
    };
    let gateway = AlloyGateway::connect(&rpc_url).await?;

    let mut client = MarketClient::new(Arc::new(gateway), config);

    match SecureWallet::from_env(PRIVATE_KEY_ENV) {
        Ok(wallet) => {
            tracing::info!(address = %wallet.address(), "Loaded wallet from PRIVATE_KEY");
            client = client.with_wallet(wallet);
        }
        Err(e) => {
            tracing::warn!(error = %e, "No wallet loaded - running in read-only mode");
        }
    }

    Ok(client.gated())
}

/// Address from WALLET_ADDRESS, for read-only queries
fn read_address() -> Option<Address> {
    let value = std::env::var(WALLET_ADDRESS_ENV).ok()?;
    match value.parse() {
        Ok(address) => Some(address),
        Err(e) => {
            tracing::warn!(value = %value, error = %e, "Ignoring invalid WALLET_ADDRESS");
            None
        }
    }
}

/// WALLET_ADDRESS only stands in when no signing wallet is loaded
fn read_only_fallback(wallet: Option<Address>, reader: Option<Address>) -> Option<Address> {
    match wallet {
        Some(_) => None,
        None => reader,
    }
}

/// kToken symbol to show next to `symbol`'s balance, unless `symbol` is one
fn paired_ktoken(registry: &TokenRegistry, symbol: &str) -> Option<String> {
    if registry.is_ktoken(symbol) {
        return None;
    }
    registry.resolve_ktoken(symbol).ok().map(|ktoken| ktoken.symbol)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
