//! ArcadeSwap command-line client
//!
//! Subcommands:
//! - `feed`: live Mint/Swap feed over the tracked pairs (history + subscription)
//! - `quote`: expected output for an input amount, optionally interactive
//! - `swap`: exact-input swap on the first tracked pair
//! - `add-liquidity`: deposit both tokens of the first tracked pair
//! - `pair-address`: CREATE2 pair address for two tokens
//!
//! Configuration comes from the env file (RPC_URL, CHAIN_ID, ROUTER_ADDRESS,
//! LIBRARY_ADDRESS, FACTORY_ADDRESS, optional PRIVATE_KEY, PAIRS_FILE,
//! PAIR_CODE_HASH, SLIPPAGE_BPS). Log level via RUST_LOG.

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use arcadeswap_client::config::{load_config_from_file, load_tracked_pairs, AppConfig};
use arcadeswap_client::debounce::debounce;
use arcadeswap_client::exchange::{min_out, parse_amount, ExchangeError};
use arcadeswap_client::feed::render::render_amount;
use arcadeswap_client::feed::{render_feed, ChainEventSource, EventFeed};
use arcadeswap_client::pair_address::compute_pair_address;
use arcadeswap_client::{DisplayList, LiquidityClient, SwapClient, TrackedPair};
use chrono::Local;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_stream::wrappers::WatchStream;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Quiet period before an interactive quote input is priced
const QUOTE_DEBOUNCE: Duration = Duration::from_millis(500);

/// ArcadeSwap AMM client
#[derive(Parser)]
#[command(name = "arcadeswap", version, about)]
struct Cli {
    /// Env file with network and contract settings
    #[arg(long, global = true, env = "ENV_FILE", default_value = ".env")]
    env_file: String,

    /// Emit logs (and feed rows) as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the merged Mint/Swap feed on every update
    Feed {
        /// TOML file listing tracked pairs (overrides PAIRS_FILE)
        #[arg(long)]
        pairs: Option<String>,

        /// Print once after history has loaded, then exit
        #[arg(long)]
        once: bool,
    },

    /// Quote an exact-input swap of token0 for token1
    Quote {
        /// Input amount in 18-decimal units (e.g. 1.5)
        #[arg(long, default_value = "")]
        amount: String,

        /// Read amounts from stdin, quoting each settled input
        #[arg(long)]
        interactive: bool,

        /// Sell token1 for token0 instead
        #[arg(long)]
        reverse: bool,
    },

    /// Swap an exact amount of token0 for token1
    Swap {
        #[arg(long)]
        amount: String,

        /// Minimum output; derived from a fresh quote when omitted
        #[arg(long)]
        min_out: Option<String>,

        /// Slippage tolerance applied to the quote (overrides SLIPPAGE_BPS)
        #[arg(long)]
        slippage_bps: Option<u32>,

        /// Sell token1 for token0 instead
        #[arg(long)]
        reverse: bool,
    },

    /// Add liquidity to the first tracked pair
    AddLiquidity {
        #[arg(long)]
        amount0: String,

        #[arg(long)]
        amount1: String,
    },

    /// Compute the pair address for two tokens
    PairAddress {
        #[arg(long)]
        token_a: String,

        #[arg(long)]
        token_b: String,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config = load_config_from_file(&cli.env_file)?;
    info!("Configuration loaded from {} (chain_id: {})", cli.env_file, config.chain_id);

    match cli.command {
        Command::Feed { pairs, once } => {
            run_feed(&config, pairs.as_deref(), once, cli.json_logs).await
        }
        Command::Quote {
            amount,
            interactive,
            reverse,
        } => run_quote(&config, &amount, interactive, reverse).await,
        Command::Swap {
            amount,
            min_out,
            slippage_bps,
            reverse,
        } => run_swap(&config, &amount, min_out.as_deref(), slippage_bps, reverse).await,
        Command::AddLiquidity { amount0, amount1 } => {
            run_add_liquidity(&config, &amount0, &amount1).await
        }
        Command::PairAddress { token_a, token_b } => {
            let a = Address::from_str(token_a.trim()).context("invalid --token-a")?;
            let b = Address::from_str(token_b.trim()).context("invalid --token-b")?;
            let pair = compute_pair_address(config.factory_address, a, b, config.pair_code_hash);
            println!("{}", pair.to_checksum(None));
            Ok(())
        }
    }
}

// ── Providers ──────────────────────────────────────────────────────────

async fn connect(config: &AppConfig) -> Result<impl Provider + 'static> {
    let ws = WsConnect::new(&config.rpc_url);
    let provider = ProviderBuilder::new().connect_ws(ws).await?;
    info!("Connected to RPC: {}", &config.rpc_url[..50.min(config.rpc_url.len())]);
    Ok(provider)
}

/// Signing provider and the signer's address
async fn connect_signer(config: &AppConfig) -> Result<(impl Provider + 'static, Address)> {
    let signer = PrivateKeySigner::from_str(config.private_key()?.trim())
        .context("PRIVATE_KEY is not a valid private key")?;
    let owner = signer.address();
    let ws = WsConnect::new(&config.rpc_url);
    let provider = ProviderBuilder::new().wallet(signer).connect_ws(ws).await?;
    info!("Connected as {}", owner);
    Ok((provider, owner))
}

fn first_pair(config: &AppConfig) -> Result<TrackedPair> {
    let mut pairs = load_tracked_pairs(config, None)?;
    Ok(pairs.remove(0))
}

/// (token in, token out) of `pair` for the requested direction
fn direction(pair: &TrackedPair, reverse: bool) -> (Address, Address) {
    if reverse {
        (pair.token1.address, pair.token0.address)
    } else {
        (pair.token0.address, pair.token1.address)
    }
}

/// Log the full error and surface the user-facing message
fn report(err: ExchangeError) -> anyhow::Error {
    error!("{}", err);
    anyhow::anyhow!(err.user_message())
}

// ── Feed ───────────────────────────────────────────────────────────────

fn print_feed(list: &DisplayList, pairs: &[TrackedPair], json: bool) {
    let rows = render_feed(list, pairs);
    if json {
        for row in rows {
            match serde_json::to_string(&row) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to serialize feed row: {}", e),
            }
        }
        return;
    }

    println!(
        "── {} ── {} events",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        rows.len()
    );
    for row in rows {
        println!("{}", row.line());
    }
}

async fn run_feed(
    config: &AppConfig,
    pairs_file: Option<&str>,
    once: bool,
    json: bool,
) -> Result<()> {
    let pairs = load_tracked_pairs(config, pairs_file)?;
    let provider = Arc::new(connect(config).await?);
    let source = Arc::new(ChainEventSource::new(provider));

    let mut feed = EventFeed::start(source, pairs).await;

    if once {
        let list = feed.settle().await?;
        print_feed(&list, feed.pairs(), json);
        feed.shutdown().await?;
        return Ok(());
    }

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();
    let mut updates = WatchStream::from_changes(feed.updates());

    loop {
        tokio::select! {
            update = updates.next() => match update {
                Some(list) => print_feed(&list, feed.pairs(), json),
                None => break,
            },
            Some(signal) = signals.next() => {
                info!("Received signal {}, tearing down feed", signal);
                break;
            }
        }
    }

    signals_handle.close();
    let final_list = feed.shutdown().await?;
    info!("Feed stopped with {} events", final_list.len());
    Ok(())
}

// ── Exchange ───────────────────────────────────────────────────────────

async fn run_quote(
    config: &AppConfig,
    amount: &str,
    interactive: bool,
    reverse: bool,
) -> Result<()> {
    let pair = first_pair(config)?;
    let (token_in, token_out) = direction(&pair, reverse);
    let provider = Arc::new(connect(config).await?);
    // Quotes are read-only; the owner is never used
    let client = SwapClient::new(provider, Address::ZERO, config);

    let symbol_out = pair
        .token_by_address(token_out)
        .map(|t| t.symbol.clone())
        .unwrap_or_default();

    if !interactive {
        let amount_in = parse_amount(amount).map_err(report)?;
        let out = client.quote(&pair, token_in, amount_in).await.map_err(report)?;
        println!("{} {}", render_amount(out), symbol_out);
        return Ok(());
    }

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut settled = debounce(rx, QUOTE_DEBOUNCE);
    while let Some(line) = settled.recv().await {
        let amount_in = match parse_amount(&line) {
            Ok(amount) => amount,
            Err(e) => {
                println!("{}", report(e));
                continue;
            }
        };
        if amount_in.is_zero() {
            continue;
        }
        match client.quote(&pair, token_in, amount_in).await {
            Ok(out) => println!("{} {}", render_amount(out), symbol_out),
            Err(e) => println!("{}", report(e)),
        }
    }
    Ok(())
}

async fn run_swap(
    config: &AppConfig,
    amount: &str,
    min_out_arg: Option<&str>,
    slippage_bps: Option<u32>,
    reverse: bool,
) -> Result<()> {
    let pair = first_pair(config)?;
    let (token_in, token_out) = direction(&pair, reverse);
    let amount_in = parse_amount(amount).map_err(report)?;
    if amount_in.is_zero() {
        anyhow::bail!("swap amount must be greater than zero");
    }

    let (provider, owner) = connect_signer(config).await?;
    let client = SwapClient::new(Arc::new(provider), owner, config);

    let amount_out_min: U256 = match min_out_arg {
        Some(raw) => parse_amount(raw).map_err(report)?,
        None => {
            let quote = client.quote(&pair, token_in, amount_in).await.map_err(report)?;
            let bps = slippage_bps.unwrap_or(config.slippage_bps);
            info!("Quoted {} out, applying {} bps slippage", render_amount(quote), bps);
            min_out(quote, bps)
        }
    };

    let outcome = client
        .swap_exact_in(amount_in, amount_out_min, vec![token_in, token_out])
        .await
        .map_err(report)?;
    println!("Swap confirmed: {}", outcome.tx_hash);
    Ok(())
}

async fn run_add_liquidity(config: &AppConfig, amount0: &str, amount1: &str) -> Result<()> {
    let pair = first_pair(config)?;
    let amount0 = parse_amount(amount0).map_err(report)?;
    let amount1 = parse_amount(amount1).map_err(report)?;

    let (provider, owner) = connect_signer(config).await?;
    let client = LiquidityClient::new(Arc::new(provider), owner, config);

    let outcome = client
        .add_liquidity(pair.token0.address, pair.token1.address, amount0, amount1)
        .await
        .map_err(report)?;
    println!("Liquidity added: {}", outcome.tx_hash);
    Ok(())
}
