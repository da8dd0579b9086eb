//! Configuration management for P2PScout
//!
//! Loads from YAML files + environment variables via .env

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub market: MarketConfig,
    pub cache: CacheConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP API listen port
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Traded asset symbol (amounts and limits are denominated in this)
    pub asset: String,
    /// Quote fiat currency symbol
    pub fiat: String,
    /// Ads requested per marketplace page
    pub rows: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Refresh cycle interval; doubles as the FRESH age threshold
    pub refresh_interval_secs: u64,
    /// Maximum tolerated snapshot age before a slot is expired
    pub max_age_secs: u64,
    /// Ranked offers returned per search
    pub top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Enable the Binance P2P adapter
    pub binance_enabled: bool,
    /// Enable the Bybit P2P adapter
    pub bybit_enabled: bool,
    /// Enable the OKX P2P adapter
    pub okx_enabled: bool,
    /// Per-fetch HTTP timeout in seconds
    pub fetch_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Server defaults
            .set_default("server.port", 3001)?
            // Market defaults
            .set_default("market.asset", "USDT")?
            .set_default("market.fiat", "VND")?
            .set_default("market.rows", 10)?
            // Cache defaults (10 minute refresh, 30 minute hard expiry)
            .set_default("cache.refresh_interval_secs", 600)?
            .set_default("cache.max_age_secs", 1800)?
            .set_default("cache.top_n", 5)?
            // Source defaults
            .set_default("sources.binance_enabled", true)?
            .set_default("sources.bybit_enabled", true)?
            .set_default("sources.okx_enabled", true)?
            .set_default("sources.fetch_timeout_secs", 30)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (P2PSCOUT_*)
            .add_source(Environment::with_prefix("P2PSCOUT").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<()> {
        if self.cache.refresh_interval_secs == 0 {
            anyhow::bail!("cache.refresh_interval_secs must be positive");
        }
        if self.cache.max_age_secs < self.cache.refresh_interval_secs {
            anyhow::bail!("cache.max_age_secs must be >= cache.refresh_interval_secs");
        }
        if self.cache.top_n == 0 {
            anyhow::bail!("cache.top_n must be positive");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.cache.refresh_interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.cache.max_age_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.fetch_timeout_secs)
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "port={} market={}/{} refresh={}s max_age={}s top_n={} sources=[{}{}{}]",
            self.server.port,
            self.market.asset,
            self.market.fiat,
            self.cache.refresh_interval_secs,
            self.cache.max_age_secs,
            self.cache.top_n,
            if self.sources.binance_enabled { " binance" } else { "" },
            if self.sources.bybit_enabled { " bybit" } else { "" },
            if self.sources.okx_enabled { " okx" } else { "" },
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
