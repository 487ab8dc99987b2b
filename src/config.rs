//! Configuration management
//!
//! Network and contract settings come from a `.env` file; the list of
//! tracked pairs comes from a TOML file. Pair entries may omit their
//! address, in which case it is derived from the factory via CREATE2.

use crate::pair_address::{compute_pair_address, DEFAULT_PAIR_CODE_HASH};
use crate::types::{TokenInfo, TrackedPair};
use alloy::primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Default slippage applied to quotes when no explicit minimum is given
const DEFAULT_SLIPPAGE_BPS: u32 = 50;

/// Local devnet token addresses of the default ETH/USDC pair
const DEFAULT_ETH_ADDRESS: &str = "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9";
const DEFAULT_USDC_ADDRESS: &str = "0xDc64a140Aa3E981100a9becA4E685f962f0cF6C9";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Network
    pub rpc_url: String,
    pub chain_id: u64,

    // Wallet (only needed for swap / add-liquidity)
    pub private_key: Option<String>,

    // Contracts
    pub router_address: Address,
    pub library_address: Address,
    pub factory_address: Address,
    pub pair_code_hash: B256,

    // Trading
    pub slippage_bps: u32,

    // Tracked pairs file (TOML)
    pub pairs_file: Option<String>,
}

impl AppConfig {
    pub fn private_key(&self) -> Result<&str> {
        self.private_key
            .as_deref()
            .context("PRIVATE_KEY not set (required for transactions)")
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} not set", name))
}

fn env_address(name: &str) -> Result<Address> {
    let raw = env_var(name)?;
    Address::from_str(raw.trim())
        .with_context(|| format!("{} is not a valid address: {}", name, raw))
}

/// Load configuration from the process environment (after reading `.env`)
pub fn load_config() -> Result<AppConfig> {
    dotenv::dotenv().ok();
    build_config()
}

/// Load configuration from a specific env file (e.g. `.env.devnet`)
pub fn load_config_from_file(env_file: &str) -> Result<AppConfig> {
    dotenv::from_filename(env_file).ok();
    build_config()
}

fn build_config() -> Result<AppConfig> {
    let pair_code_hash = match std::env::var("PAIR_CODE_HASH") {
        Ok(raw) => B256::from_str(raw.trim())
            .with_context(|| format!("PAIR_CODE_HASH is not a valid 32-byte hash: {}", raw))?,
        Err(_) => DEFAULT_PAIR_CODE_HASH,
    };

    let slippage_bps = match std::env::var("SLIPPAGE_BPS") {
        Ok(raw) => raw.trim().parse().context("SLIPPAGE_BPS must be an integer")?,
        Err(_) => DEFAULT_SLIPPAGE_BPS,
    };
    if slippage_bps > 10_000 {
        anyhow::bail!("SLIPPAGE_BPS must be at most 10000, got {}", slippage_bps);
    }

    Ok(AppConfig {
        rpc_url: env_var("RPC_URL")?,
        chain_id: env_var("CHAIN_ID")?.trim().parse().context("CHAIN_ID must be an integer")?,
        private_key: std::env::var("PRIVATE_KEY").ok(),
        router_address: env_address("ROUTER_ADDRESS")?,
        library_address: env_address("LIBRARY_ADDRESS")?,
        factory_address: env_address("FACTORY_ADDRESS")?,
        pair_code_hash,
        slippage_bps,
        pairs_file: std::env::var("PAIRS_FILE").ok(),
    })
}

// ── Tracked pairs (TOML) ──────────────────────────────────────────────

/// Top-level pairs file structure
#[derive(Debug, Clone, Deserialize)]
pub struct PairsFile {
    #[serde(rename = "pair", default)]
    pub pairs: Vec<PairEntry>,
}

/// One `[[pair]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct PairEntry {
    #[serde(default)]
    pub address: Option<String>,
    pub token0: TokenEntry,
    pub token1: TokenEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub symbol: String,
    pub address: String,
}

impl TokenEntry {
    fn resolve(&self) -> Result<TokenInfo> {
        let address = Address::from_str(self.address.trim())
            .with_context(|| {
                format!("Invalid address for token {}: {}", self.symbol, self.address)
            })?;
        Ok(TokenInfo::new(self.symbol.clone(), address))
    }
}

impl PairEntry {
    /// Resolve into a tracked pair, deriving the address if it is not given
    pub fn resolve(&self, factory: Address, pair_code_hash: B256) -> Result<TrackedPair> {
        let token0 = self.token0.resolve()?;
        let token1 = self.token1.resolve()?;

        let address = match &self.address {
            Some(raw) => Address::from_str(raw.trim())
                .with_context(|| format!("Invalid pair address: {}", raw))?,
            None => {
                let derived =
                    compute_pair_address(factory, token0.address, token1.address, pair_code_hash);
                debug!(
                    "Derived pair address for {}/{}: {}",
                    token0.symbol, token1.symbol, derived
                );
                derived
            }
        };

        Ok(TrackedPair::new(address, token0, token1))
    }
}

impl PairsFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read pairs file: {}", path.as_ref().display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse pairs TOML")
    }

    pub fn resolve(&self, factory: Address, pair_code_hash: B256) -> Result<Vec<TrackedPair>> {
        self.pairs
            .iter()
            .map(|p| p.resolve(factory, pair_code_hash))
            .collect()
    }
}

/// The ETH/USDC pair used when no pairs file is configured
pub fn default_pairs(factory: Address, pair_code_hash: B256) -> Result<Vec<TrackedPair>> {
    let entry = PairEntry {
        address: None,
        token0: TokenEntry {
            symbol: "ETH".to_string(),
            address: DEFAULT_ETH_ADDRESS.to_string(),
        },
        token1: TokenEntry {
            symbol: "USDC".to_string(),
            address: DEFAULT_USDC_ADDRESS.to_string(),
        },
    };
    Ok(vec![entry.resolve(factory, pair_code_hash)?])
}

/// Load tracked pairs from `path` (or the configured file), falling back to the default pair
pub fn load_tracked_pairs(config: &AppConfig, path: Option<&str>) -> Result<Vec<TrackedPair>> {
    let pairs = match path.or(config.pairs_file.as_deref()) {
        Some(path) => {
            let pairs = PairsFile::load(path)?
                .resolve(config.factory_address, config.pair_code_hash)?;
            info!("Loaded {} tracked pairs from {}", pairs.len(), path);
            pairs
        }
        None => {
            info!("No pairs file configured, tracking default ETH/USDC pair");
            default_pairs(config.factory_address, config.pair_code_hash)?
        }
    };

    if pairs.is_empty() {
        anyhow::bail!("No tracked pairs configured");
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_toml() {
        let toml_str = r#"
[[pair]]
address = "0x0000000000000000000000000000000000000abc"
token0 = { symbol = "ETH", address = "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9" }
token1 = { symbol = "USDC", address = "0xDc64a140Aa3E981100a9becA4E685f962f0cF6C9" }

[[pair]]
token0 = { symbol = "BTC", address = "0xe4e559dB9e0f4C853649b0EbabC899D1797De300" }
token1 = { symbol = "USDC", address = "0xDc64a140Aa3E981100a9becA4E685f962f0cF6C9" }
"#;

        let file = PairsFile::parse(toml_str).unwrap();
        assert_eq!(file.pairs.len(), 2);

        let factory = Address::repeat_byte(0x11);
        let pairs = file.resolve(factory, DEFAULT_PAIR_CODE_HASH).unwrap();
        assert_eq!(pairs[0].pair_id(), "ETH/USDC");
        assert_eq!(
            pairs[0].address,
            Address::from_str("0x0000000000000000000000000000000000000abc").unwrap()
        );

        // Second pair has no address: derived from the factory
        let expected = compute_pair_address(
            factory,
            pairs[1].token0.address,
            pairs[1].token1.address,
            DEFAULT_PAIR_CODE_HASH,
        );
        assert_eq!(pairs[1].address, expected);
        assert_eq!(pairs[1].pair_id(), "BTC/USDC");
    }

    #[test]
    fn test_invalid_token_address_rejected() {
        let toml_str = r#"
[[pair]]
token0 = { symbol = "ETH", address = "not-an-address" }
token1 = { symbol = "USDC", address = "0xDc64a140Aa3E981100a9becA4E685f962f0cF6C9" }
"#;
        let file = PairsFile::parse(toml_str).unwrap();
        let err = file.resolve(Address::ZERO, DEFAULT_PAIR_CODE_HASH).unwrap_err();
        assert!(err.to_string().contains("ETH"));
    }

    #[test]
    fn test_default_pairs() {
        let pairs = default_pairs(Address::repeat_byte(0x22), DEFAULT_PAIR_CODE_HASH).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].pair_id(), "ETH/USDC");
        assert_ne!(pairs[0].address, Address::ZERO);
    }
}
