//! Configuration module for prefilter.
//!
//! Configuration is read from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use prefilter::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Error policy: {}", config.chain.error_policy);
//! ```

mod chain;
mod error;
mod logging;
mod parse;
mod target;

pub use chain::ChainConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use parse::{parse_duration, ProcessEnv, Vars};
pub use target::TargetConfig;

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub chain: ChainConfig,
    pub target: TargetConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&ProcessEnv)
    }

    pub fn from_vars(vars: &dyn Vars) -> Result<Self, ConfigError> {
        Ok(Self {
            chain: ChainConfig::from_vars(vars)?,
            target: TargetConfig::from_vars(vars)?,
            logging: LoggingConfig::from_vars(vars)?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Error policy: {}", self.chain.error_policy);

        if let Some(limit) = self.chain.rate_limit {
            info!("  Rate limit: {} req/{}s per IP", limit, self.chain.rate_window);
        }

        match self.chain.cache_ttl {
            Some(ttl) => info!(
                "  Response cache: {}s TTL, {} entries max",
                ttl.as_secs(),
                self.chain.cache_max_entries
            ),
            None => info!("  Response cache: disabled"),
        }

        if self.chain.method_override {
            info!("  Method override: enabled");
        }

        if self.chain.access_log {
            info!("  Access log: enabled");
        }

        info!(
            "  Target: {} {:?}{}",
            self.target.status,
            self.target.body,
            self.target
                .prefix
                .as_deref()
                .map(|p| format!(" under {}", p))
                .unwrap_or_default()
        );
    }
}
