//! Binance spot trading CLI
//!
//! Stateless per-invocation client: every command issues its REST calls,
//! prints one JSON document to stdout and exits. Trading commands preview
//! by default and execute only with --confirm. Logs go to stderr.

mod account;
mod auth;
mod client;
mod commands;
mod config;
mod executor;
mod format;
mod gate;
mod market;
mod quote;
mod router;
#[cfg(test)]
mod testing;
mod types;

use crate::client::BinanceClient;
use crate::commands::CliError;
use crate::config::Config;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "binance",
    version,
    about = "Binance spot trading CLI with preview-gated execution"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Get price and 24h statistics for an asset
    Price {
        #[arg(default_value = "BTC")]
        asset: String,
        /// Quote currency for the pair
        #[arg(long = "for", default_value = "USDT")]
        quote: String,
    },
    /// View all balances with USD valuation
    Portfolio,
    /// Check a single asset balance
    Balance {
        #[arg(default_value = "BTC")]
        asset: String,
    },
    /// View open orders
    Orders {
        asset: Option<String>,
        #[arg(long = "for", default_value = "USDT")]
        quote: String,
    },
    /// Buy an asset (preview unless --confirm)
    Buy {
        asset: String,
        amount: f64,
        #[arg(long = "for", default_value = "USDT")]
        quote: String,
        /// Size the order by quote-currency spend instead of base quantity
        #[arg(long = "quote")]
        quote_sized: bool,
        /// Place a limit order at this price
        #[arg(long)]
        limit: Option<f64>,
        /// Execute instead of previewing
        #[arg(long)]
        confirm: bool,
    },
    /// Sell an asset (preview unless --confirm)
    Sell {
        asset: String,
        amount: Option<f64>,
        #[arg(long = "for", default_value = "USDT")]
        quote: String,
        /// Sell the entire free balance
        #[arg(long)]
        all: bool,
        /// Place a limit order at this price
        #[arg(long)]
        limit: Option<f64>,
        /// Execute instead of previewing
        #[arg(long)]
        confirm: bool,
    },
    /// Swap one asset for another, routing through USDT when no direct
    /// market exists
    Swap {
        from: String,
        to: String,
        amount: f64,
        /// Execute instead of previewing
        #[arg(long)]
        confirm: bool,
    },
    /// Cancel a resting order
    Cancel {
        order_id: i64,
        asset: Option<String>,
    },
    /// Cancel all resting orders on a pair
    CancelAll { asset: String },
    /// Account history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    /// Futures account
    Futures {
        #[command(subcommand)]
        command: FuturesCommand,
    },
    /// Convert via the Convert API (needs permission)
    Convert {
        from: String,
        to: String,
        amount: f64,
        /// Fetch the quote without accepting it
        #[arg(long = "quote-only")]
        quote_only: bool,
    },
    /// Get a deposit address for an asset
    DepositAddress {
        asset: String,
        #[arg(long)]
        network: Option<String>,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// Recent account trades on ASSETUSDT
    Trades {
        asset: String,
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

#[derive(Subcommand)]
enum FuturesCommand {
    /// Open futures positions
    Positions,
}

async fn run(command: Command, client: &BinanceClient) -> Result<Value, CliError> {
    match command {
        Command::Price { asset, quote } => commands::price(client, &asset, &quote).await,
        Command::Portfolio => commands::portfolio(client).await,
        Command::Balance { asset } => commands::balance(client, &asset).await,
        Command::Orders { asset, quote } => {
            commands::orders(client, asset.as_deref(), &quote).await
        }
        Command::Buy {
            asset,
            amount,
            quote,
            quote_sized,
            limit,
            confirm,
        } => commands::buy(client, &asset, amount, &quote, quote_sized, limit, confirm).await,
        Command::Sell {
            asset,
            amount,
            quote,
            all,
            limit,
            confirm,
        } => commands::sell(client, &asset, amount, &quote, all, limit, confirm).await,
        Command::Swap {
            from,
            to,
            amount,
            confirm,
        } => commands::swap(client, &from, &to, amount, confirm).await,
        Command::Cancel { order_id, asset } => {
            commands::cancel(client, order_id, asset.as_deref()).await
        }
        Command::CancelAll { asset } => commands::cancel_all(client, &asset).await,
        Command::History {
            command: HistoryCommand::Trades { asset, days },
        } => commands::history_trades(client, &asset, days).await,
        Command::Futures {
            command: FuturesCommand::Positions,
        } => commands::futures_positions(client).await,
        Command::Convert {
            from,
            to,
            amount,
            quote_only,
        } => commands::convert(client, &from, &to, amount, quote_only).await,
        Command::DepositAddress { asset, network } => {
            commands::deposit_address(client, &asset, network.as_deref()).await
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let client = BinanceClient::new(&config);

    match run(cli.command, &client).await {
        Ok(value) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
            );
        }
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&e.to_json())
                    .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", e))
            );
            std::process::exit(1);
        }
    }
}
