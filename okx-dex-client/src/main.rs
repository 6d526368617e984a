//! Command-line front end for the OKX DEX swap client.
//!
//! # Usage
//!
//! ```bash
//! # Quote 0.01 SOL to USDC
//! okx-dex quote --chain 501 --from 11111111111111111111111111111111 \
//!     --to EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v --amount 0.01
//!
//! # Swap half of a USDC balance on Base and wait for the receipt
//! okx-dex swap --chain 8453 --from 0x8335... --to 0xeeee... \
//!     --percent 0.5 --wallet 0x... --slippage 0.005
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `okx-dex.toml`)
//! - `OKX_API_KEY`, `OKX_SECRET_KEY`, `OKX_API_PASSPHRASE`, `OKX_PROJECT_ID` -
//!   Aggregator credentials
//! - `PRIVATE_KEY` - Signing key used when a chain has none configured
//! - `RUST_LOG` - Log level filter (default: `info`)

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use okx_dex::chain::ChainIndex;
use okx_dex::proto::OrdersQuery;
use okx_dex::signer::SignerKey;
use rust_decimal::Decimal;
use serde::Serialize;

use okx_dex_client::{DexClient, DexConfig, SwapOrder};

#[derive(Debug, Parser)]
#[command(name = "okx-dex", version, about = "Swap tokens through the OKX DEX aggregator")]
struct Cli {
    /// Configuration file; defaults to `$CONFIG` or `okx-dex.toml`.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Signing key, used when the chain has none configured.
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List chains the aggregator routes on.
    Chains,
    /// List tokens tradable on a chain.
    Tokens {
        #[arg(long)]
        chain: ChainIndex,
    },
    /// List liquidity sources on a chain.
    Liquidity {
        #[arg(long)]
        chain: ChainIndex,
    },
    /// Quote a swap.
    Quote {
        #[command(flatten)]
        pair: Pair,
        /// Human-readable input amount.
        #[arg(long)]
        amount: String,
        /// Referrer fee percentage.
        #[arg(long)]
        fee_percent: Option<Decimal>,
    },
    /// Execute a swap.
    Swap {
        #[command(flatten)]
        pair: Pair,
        /// Human-readable input amount.
        #[arg(long, conflicts_with = "percent", required_unless_present = "percent")]
        amount: Option<String>,
        /// Share of the input token balance, in (0, 1].
        #[arg(long)]
        percent: Option<Decimal>,
        /// Slippage tolerance as a fraction.
        #[arg(long, default_value = "0.005")]
        slippage: Decimal,
        /// Wallet that signs and pays.
        #[arg(long)]
        wallet: String,
        /// Wait for confirmation where it is optional.
        #[arg(long)]
        confirm: bool,
        /// Relay the signed transaction through the aggregator.
        #[arg(long, conflicts_with = "percent")]
        broadcast: bool,
    },
    /// Approve the aggregator router to spend a token.
    Approve {
        #[arg(long)]
        chain: ChainIndex,
        #[arg(long)]
        token: String,
        /// Human-readable amount.
        #[arg(long)]
        amount: String,
        #[arg(long)]
        wallet: String,
    },
    /// Show token balances held by a wallet.
    Balances {
        /// Chains to query; repeat for several.
        #[arg(long = "chain", required = true)]
        chains: Vec<ChainIndex>,
        #[arg(long)]
        wallet: String,
        /// Restrict to these tokens (single chain only).
        #[arg(long = "token")]
        tokens: Vec<String>,
    },
    /// Show a token's precision.
    Decimals {
        #[arg(long)]
        chain: ChainIndex,
        #[arg(long)]
        token: String,
    },
    /// Show a token's price, optionally on a past day.
    Price {
        #[arg(long)]
        chain: ChainIndex,
        #[arg(long)]
        token: String,
        /// UTC day, `YYYY-MM-DD`.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Look up orders submitted through the broadcast endpoint.
    Orders {
        #[arg(long)]
        address: String,
        #[arg(long)]
        chain: Option<ChainIndex>,
        #[arg(long)]
        order_id: Option<String>,
    },
}

#[derive(Debug, Args)]
struct Pair {
    #[arg(long)]
    chain: ChainIndex,
    /// Input token address.
    #[arg(long)]
    from: String,
    /// Output token address.
    #[arg(long)]
    to: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    #[cfg(feature = "telemetry")]
    {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(e) = run(Cli::parse()).await {
        report_failure(e.as_ref());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match cli.config.as_deref() {
        Some(path) => DexConfig::load_from(path)?,
        None => DexConfig::load()?,
    };

    #[cfg(feature = "telemetry")]
    tracing::debug!(chains = config.chains.len(), "Loaded configuration");

    let client = DexClient::from_config(&config)?;
    let signer = cli.private_key.map(SignerKey::from);
    let signer = signer.as_ref();

    match cli.command {
        Command::Chains => print_json(&client.supported_chains().await?),
        Command::Tokens { chain } => print_json(&client.tokens(chain).await?),
        Command::Liquidity { chain } => print_json(&client.liquidity_sources(chain).await?),
        Command::Quote {
            pair,
            amount,
            fee_percent,
        } => {
            let route = client
                .quote(pair.chain, &pair.from, &pair.to, &amount, fee_percent)
                .await?;
            print_json(&route)?;
            print_line(&route.price_comparison()?);
            Ok(())
        }
        Command::Swap {
            pair,
            amount,
            percent,
            slippage,
            wallet,
            confirm,
            broadcast,
        } => {
            let mut order = SwapOrder::new(pair.chain, pair.from, pair.to, slippage, wallet);
            if confirm {
                order = order.with_confirmation();
            }
            match (amount, percent) {
                (Some(amount), _) if broadcast => {
                    let order_id = client.swap_via_broadcast(&order, &amount, signer).await?;
                    print_line(&order_id);
                    Ok(())
                }
                (Some(amount), _) => print_json(&client.swap(&order, &amount, signer).await?),
                (None, Some(percent)) => print_json(
                    &client
                        .swap_by_balance_percent(&order, percent, signer)
                        .await?,
                ),
                (None, None) => Err("either --amount or --percent is required".into()),
            }
        }
        Command::Approve {
            chain,
            token,
            amount,
            wallet,
        } => {
            let hash = client
                .approve(chain, &token, &amount, &wallet, signer)
                .await?;
            print_line(&hash);
            Ok(())
        }
        Command::Balances {
            chains,
            wallet,
            tokens,
        } => {
            let assets = match chains.as_slice() {
                [chain] if !tokens.is_empty() => {
                    let tokens = tokens.iter().map(String::as_str).collect::<Vec<_>>();
                    client.get_balances(*chain, &wallet, &tokens).await?
                }
                _ if !tokens.is_empty() => {
                    return Err("--token requires exactly one --chain".into());
                }
                _ => client.get_all_balances(&chains, &wallet).await?,
            };
            print_json(&assets)
        }
        Command::Decimals { chain, token } => {
            print_line(&client.get_decimals(chain, &token).await?.to_string());
            Ok(())
        }
        Command::Price { chain, token, date } => match date {
            Some(date) => print_json(&client.historical_price(chain, &token, date).await?),
            None => print_json(&client.token_price(chain, &token).await?),
        },
        Command::Orders {
            address,
            chain,
            order_id,
        } => {
            let query = OrdersQuery {
                address: Some(address),
                chain_index: chain,
                order_id,
                ..OrdersQuery::default()
            };
            print_json(&client.transaction_orders(&query).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    print_line(&serde_json::to_string_pretty(value)?);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}

#[cfg(feature = "telemetry")]
fn report_failure(e: &dyn std::error::Error) {
    tracing::error!("okx-dex failed: {e}");
}

#[cfg(not(feature = "telemetry"))]
#[allow(clippy::print_stderr)]
fn report_failure(e: &dyn std::error::Error) {
    eprintln!("okx-dex failed: {e}");
}
