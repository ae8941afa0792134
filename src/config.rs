//! Configuration management

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use serde::{Deserialize, Serialize};

use crate::amount::gwei_to_wei;
use crate::chain::ReceiptPolicy;
use crate::contract::TRANSFER_GAS_LIMIT;
use crate::dispatcher::{DispatchSettings, NonceDiscipline};
use crate::error::{AirdropError, Result};
use crate::retry::RetryPolicy;
use crate::sweeper::SweepSettings;

/// Environment variable prefix, e.g. `AIRDROP_AIRDROP__SENDER_KEY`
pub const ENV_PREFIX: &str = "AIRDROP";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub airdrop: Option<AirdropConfig>,
    #[serde(default)]
    pub collect: Option<CollectConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub receipt: ReceiptConfig,
}

/// Funding account and distributor settings for airdrop runs
#[derive(Clone, Serialize, Deserialize)]
pub struct AirdropConfig {
    pub rpc_url: String,
    pub sender_key: String,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    pub gas_price_gwei: f64,
    pub distributor: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Read from the token contract when unset
    #[serde(default)]
    pub token_decimals: Option<u8>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub nonce_mode: NonceDiscipline,
    #[serde(default = "default_true")]
    pub approve: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    pub rpc_url: String,
    pub gas_price_gwei: f64,
    #[serde(default)]
    pub token: Option<String>,
    pub destination: String,
    #[serde(default = "default_transfer_gas_limit")]
    pub transfer_gas_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    pub poll_interval_ms: u64,
    /// Zero or unset means no bound
    pub timeout_secs: Option<u64>,
    /// Consecutive receipt query failures before the wait is abandoned
    pub max_query_errors: u32,
}

fn default_gas_limit() -> u64 {
    3_000_000
}

fn default_batch_size() -> usize {
    200
}

fn default_true() -> bool {
    true
}

fn default_transfer_gas_limit() -> u64 {
    TRANSFER_GAS_LIMIT
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            multiplier: policy.multiplier,
        }
    }
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        let policy = ReceiptPolicy::default();
        Self {
            poll_interval_ms: policy.poll_interval.as_millis() as u64,
            timeout_secs: None,
            max_query_errors: policy.max_query_errors,
        }
    }
}

impl std::fmt::Debug for AirdropConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirdropConfig")
            .field("rpc_url", &self.rpc_url)
            .field("sender_key", &"<redacted>")
            .field("gas_limit", &self.gas_limit)
            .field("gas_price_gwei", &self.gas_price_gwei)
            .field("distributor", &self.distributor)
            .field("token", &self.token)
            .field("token_decimals", &self.token_decimals)
            .field("batch_size", &self.batch_size)
            .field("nonce_mode", &self.nonce_mode)
            .field("approve", &self.approve)
            .finish()
    }
}

impl AppConfig {
    /// Load `path`, then an optional `config.local` overlay, then `AIRDROP_*` variables.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::File::with_name("config.local").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AirdropError::Configuration(format!("Failed to load {}: {}", path.display(), e)))?;

        settings
            .try_deserialize()
            .map_err(|e| AirdropError::Configuration(format!("Invalid configuration: {}", e)))
    }

    /// Parse a TOML document without file or environment overlays.
    pub fn from_toml(content: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AirdropError::Configuration(format!("Invalid configuration: {}", e)))
    }

    pub fn airdrop(&self) -> Result<&AirdropConfig> {
        self.airdrop
            .as_ref()
            .ok_or_else(|| AirdropError::Configuration("Missing [airdrop] section".to_string()))
    }

    pub fn collect(&self) -> Result<&CollectConfig> {
        self.collect
            .as_ref()
            .ok_or_else(|| AirdropError::Configuration("Missing [collect] section".to_string()))
    }
}

impl AirdropConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.trim().is_empty() {
            return Err(AirdropError::Configuration("airdrop.rpc_url is empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(AirdropError::Configuration("airdrop.batch_size must be positive".to_string()));
        }
        if self.gas_limit == 0 {
            return Err(AirdropError::Configuration("airdrop.gas_limit must be positive".to_string()));
        }
        self.gas_price_wei()?;
        self.distributor_address()?;
        self.signer()?;
        if self.token.is_some() {
            self.token_address()?;
        }
        Ok(())
    }

    pub fn signer(&self) -> Result<PrivateKeySigner> {
        parse_signer(&self.sender_key, "airdrop.sender_key")
    }

    pub fn distributor_address(&self) -> Result<Address> {
        parse_address(&self.distributor, "airdrop.distributor")
    }

    pub fn token_address(&self) -> Result<Address> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AirdropError::Configuration("airdrop.token is not set".to_string()))?;
        parse_address(token, "airdrop.token")
    }

    pub fn gas_price_wei(&self) -> Result<u128> {
        parse_gas_price(self.gas_price_gwei, "airdrop.gas_price_gwei")
    }

    pub fn dispatch_settings(&self) -> Result<DispatchSettings> {
        Ok(DispatchSettings {
            distributor: self.distributor_address()?,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price_wei()?,
            batch_size: self.batch_size,
            nonce_mode: self.nonce_mode,
            approve: self.approve,
        })
    }
}

impl CollectConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.trim().is_empty() {
            return Err(AirdropError::Configuration("collect.rpc_url is empty".to_string()));
        }
        if self.transfer_gas_limit == 0 {
            return Err(AirdropError::Configuration(
                "collect.transfer_gas_limit must be positive".to_string(),
            ));
        }
        self.destination_address()?;
        parse_gas_price(self.gas_price_gwei, "collect.gas_price_gwei")?;
        if self.token.is_some() {
            self.token_address()?;
        }
        Ok(())
    }

    pub fn destination_address(&self) -> Result<Address> {
        parse_address(&self.destination, "collect.destination")
    }

    pub fn token_address(&self) -> Result<Address> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AirdropError::Configuration("collect.token is not set".to_string()))?;
        parse_address(token, "collect.token")
    }

    pub fn sweep_settings(&self) -> Result<SweepSettings> {
        Ok(SweepSettings {
            destination: self.destination_address()?,
            gas_price: parse_gas_price(self.gas_price_gwei, "collect.gas_price_gwei")?,
            transfer_gas_limit: self.transfer_gas_limit,
        })
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier.max(1),
        }
    }
}

impl ReceiptConfig {
    pub fn policy(&self) -> ReceiptPolicy {
        ReceiptPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: self
                .timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_query_errors: self.max_query_errors,
        }
    }
}

fn parse_address(value: &str, field: &str) -> Result<Address> {
    Address::from_str(value.trim())
        .map_err(|e| AirdropError::Configuration(format!("{} is not a valid address: {}", field, e)))
}

fn parse_signer(value: &str, field: &str) -> Result<PrivateKeySigner> {
    PrivateKeySigner::from_str(value.trim())
        .map_err(|_| AirdropError::Configuration(format!("{} is not a valid secret key", field)))
}

fn parse_gas_price(gwei: f64, field: &str) -> Result<u128> {
    gwei_to_wei(gwei).ok_or_else(|| AirdropError::Configuration(format!("{} must be a non-negative number", field)))
}
