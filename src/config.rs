//! Configuration management for the swap engine
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::asset::{parse_amount, Asset, AssetOrigin, AssetRegistry};
use crate::orchestrator::retry::{Backoff, RetryPolicy};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub engine: EngineConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub assets: HashMap<String, AssetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Quote cache time-to-live
    #[serde(default = "default_quote_ttl_secs")]
    pub quote_ttl_secs: u64,
    /// Reference-price cache time-to-live for the bridge fallback
    #[serde(default = "default_price_cache_ttl_secs")]
    pub price_cache_ttl_secs: u64,
    /// Symbol routed through when no direct pool exists
    pub intermediary_asset: String,
    #[serde(default = "default_minimum_amount")]
    pub default_minimum_amount: String,
    /// Overflow guard ceiling on any single swap amount
    #[serde(default = "default_max_amount")]
    pub max_amount: String,
    #[serde(default = "default_job_poll_interval_ms")]
    pub job_poll_interval_ms: u64,
    /// Grace window before a terminal job record is discarded
    #[serde(default = "default_job_retain_secs")]
    pub job_retain_secs: u64,
    #[serde(default = "default_deposit_verify_max_retries")]
    pub deposit_verify_max_retries: u32,
    #[serde(default = "default_deposit_verify_delay_ms")]
    pub deposit_verify_delay_ms: u64,
    /// Home-ledger account that foreign deposits are sent to
    pub home_deposit_address: String,
    /// Account approved to pull funds for assets that need pre-approval
    pub spender_address: String,
    /// Prefix for chain-explorer links in terminal notifications
    pub explorer_tx_url: Option<String>,
    pub referral_code: Option<String>,
}

fn default_quote_ttl_secs() -> u64 {
    30
}
fn default_price_cache_ttl_secs() -> u64 {
    60
}
fn default_minimum_amount() -> String {
    "0.00000001".to_string()
}
fn default_max_amount() -> String {
    "1000000000000".to_string()
}
fn default_job_poll_interval_ms() -> u64 {
    200
}
fn default_job_retain_secs() -> u64 {
    30
}
fn default_deposit_verify_max_retries() -> u32 {
    60
}
fn default_deposit_verify_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    pub decimals: u8,
    pub origin: AssetOrigin,
    pub minimum_amount: Option<String>,
    #[serde(default)]
    pub approval_fee: u128,
    #[serde(default)]
    pub transfer_fee: u128,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub blocked: bool,
    pub foreign_mint: Option<String>,
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("SWAPBRIDGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific path
    pub fn load_from(config_path: &PathBuf) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            anyhow::bail!("At least one asset must be configured");
        }

        if !self.assets.contains_key(&self.engine.intermediary_asset) {
            anyhow::bail!(
                "Intermediary asset {} is not in the asset registry",
                self.engine.intermediary_asset
            );
        }
        if let Some(intermediary) = self.assets.get(&self.engine.intermediary_asset) {
            if intermediary.blocked {
                anyhow::bail!("Intermediary asset must not be blocked");
            }
        }

        if self.engine.quote_ttl_secs == 0 {
            anyhow::bail!("quote_ttl_secs must be greater than zero");
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        parse_amount(&self.engine.default_minimum_amount)
            .map_err(|e| anyhow::anyhow!("Invalid default_minimum_amount: {}", e))?;
        parse_amount(&self.engine.max_amount)
            .map_err(|e| anyhow::anyhow!("Invalid max_amount: {}", e))?;

        for (symbol, asset) in &self.assets {
            if let Some(min) = &asset.minimum_amount {
                parse_amount(min)
                    .map_err(|e| anyhow::anyhow!("Invalid minimum for {}: {}", symbol, e))?;
            }
            if asset.origin == AssetOrigin::ForeignToken && asset.foreign_mint.is_none() {
                anyhow::bail!("Foreign token {} has no mint address configured", symbol);
            }
        }

        Ok(())
    }

    /// Build the asset registry from the configured asset table
    pub fn registry(&self) -> AssetRegistry {
        let assets = self
            .assets
            .iter()
            .map(|(symbol, cfg)| {
                (
                    symbol.clone(),
                    Asset {
                        symbol: symbol.clone(),
                        decimals: cfg.decimals,
                        origin: cfg.origin,
                        minimum_amount: cfg
                            .minimum_amount
                            .as_deref()
                            .and_then(|m| parse_amount(m).ok()),
                        approval_fee: cfg.approval_fee,
                        transfer_fee: cfg.transfer_fee,
                        requires_approval: cfg.requires_approval,
                        blocked: cfg.blocked,
                        foreign_mint: cfg.foreign_mint.clone(),
                    },
                )
            })
            .collect();

        AssetRegistry::new(
            assets,
            self.engine.intermediary_asset.clone(),
            parse_amount(&self.engine.default_minimum_amount).expect("validated at load"),
            parse_amount(&self.engine.max_amount).expect("validated at load"),
        )
    }

    pub fn quote_ttl(&self) -> Duration {
        Duration::from_secs(self.engine.quote_ttl_secs)
    }

    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.engine.price_cache_ttl_secs)
    }

    pub fn job_poll_interval(&self) -> Duration {
        Duration::from_millis(self.engine.job_poll_interval_ms)
    }

    pub fn job_retain(&self) -> Duration {
        Duration::from_secs(self.engine.job_retain_secs)
    }

    /// Coordinator configuration derived from the engine section
    pub fn bridge_config(&self) -> crate::bridge::BridgeConfig {
        crate::bridge::BridgeConfig {
            home_deposit_address: self.engine.home_deposit_address.clone(),
            spender_address: self.engine.spender_address.clone(),
            referral_code: self.engine.referral_code.clone(),
            price_cache_ttl: self.price_cache_ttl(),
            verify_max_retries: self.engine.deposit_verify_max_retries,
            verify_delay: Duration::from_millis(self.engine.deposit_verify_delay_ms),
        }
    }

    /// Job monitor configuration derived from the engine section
    pub fn monitor_config(&self) -> crate::monitor::MonitorConfig {
        crate::monitor::MonitorConfig {
            poll_interval: self.job_poll_interval(),
            retain: self.job_retain(),
            explorer_tx_url: self.engine.explorer_tx_url.clone(),
        }
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[engine]
intermediary_asset = "ICP"
home_deposit_address = "aaaaa-aa"
spender_address = "bbbbb-bb"

[assets.ICP]
decimals = 8
origin = "home"

[assets.SOL]
decimals = 9
origin = "foreign_native"

[assets.USDC]
decimals = 6
origin = "foreign_token"
foreign_mint = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
requires_approval = true
approval_fee = 10000
"#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn parses_sample_and_applies_defaults() {
        let settings: Settings = toml::from_str(SAMPLE).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.engine.quote_ttl_secs, 30);
        assert_eq!(settings.engine.job_poll_interval_ms, 200);
        assert_eq!(settings.engine.deposit_verify_max_retries, 60);
        assert_eq!(settings.retry.max_attempts, 3);
        assert!(matches!(settings.retry.backoff, Backoff::Exponential));

        let registry = settings.registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("USDC").unwrap().requires_approval);
        assert_eq!(registry.intermediary(), "ICP");

        let bridge = settings.bridge_config();
        assert_eq!(bridge.home_deposit_address, "aaaaa-aa");
        assert_eq!(bridge.verify_max_retries, 60);
        assert_eq!(bridge.verify_delay, Duration::from_millis(500));

        let monitor = settings.monitor_config();
        assert_eq!(monitor.poll_interval, Duration::from_millis(200));
        assert_eq!(monitor.retain, Duration::from_secs(30));
    }

    #[test]
    fn rejects_unknown_intermediary() {
        let broken = SAMPLE.replace("intermediary_asset = \"ICP\"", "intermediary_asset = \"BTC\"");
        let settings: Settings = toml::from_str(&broken).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_foreign_token_without_mint() {
        let broken = SAMPLE.replace(
            "foreign_mint = \"EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v\"\n",
            "",
        );
        let settings: Settings = toml::from_str(&broken).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let settings = Settings::load_from(&file.path().to_path_buf()).unwrap();
        assert_eq!(settings.assets.len(), 3);
    }
}
