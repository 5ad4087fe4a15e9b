//! Filter chain configuration.

use std::time::Duration;

use super::parse::{env_bool, env_duration, env_or, env_parse, Vars};
use super::ConfigError;
use crate::filter::cache::DEFAULT_MAX_ENTRIES;
use crate::filter::ErrorPolicy;

/// Which built-in filters to install and how the chain handles failures.
#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// What to do with I/O failures from filters or the target.
    pub error_policy: ErrorPolicy,
    /// Rate limit: max requests per IP per window (None = disabled).
    pub rate_limit: Option<u64>,
    /// Rate limit window in seconds.
    pub rate_window: u64,
    /// Response cache TTL (None = disabled).
    pub cache_ttl: Option<Duration>,
    /// Maximum number of cached responses.
    pub cache_max_entries: usize,
    /// Honor `X-HTTP-Method-Override` on POST requests.
    pub method_override: bool,
    /// Access logging enabled.
    pub access_log: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::Respond,
            rate_limit: None,
            rate_window: 60,
            cache_ttl: None,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            method_override: false,
            access_log: false,
        }
    }
}

impl ChainConfig {
    /// Load configuration from variables.
    pub fn from_vars(vars: &dyn Vars) -> Result<Self, ConfigError> {
        let policy = env_or(vars, "FILTER_ERROR_POLICY", "respond");
        let error_policy = policy.parse::<ErrorPolicy>().map_err(|message| ConfigError::Invalid {
            key: "FILTER_ERROR_POLICY".into(),
            message,
        })?;

        let rate_limit: u64 = env_parse(vars, "RATE_LIMIT", 0)?;
        let rate_window: u64 = env_parse(vars, "RATE_WINDOW", 60)?;
        if rate_window == 0 {
            return Err(ConfigError::Invalid {
                key: "RATE_WINDOW".into(),
                message: "window must be at least 1 second".into(),
            });
        }

        Ok(Self {
            error_policy,
            rate_limit: (rate_limit > 0).then_some(rate_limit),
            rate_window,
            cache_ttl: env_duration(vars, "CACHE_TTL", "off")?,
            cache_max_entries: env_parse(vars, "CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES)?,
            method_override: env_bool(vars, "METHOD_OVERRIDE", false),
            access_log: env_bool(vars, "ACCESS_LOG", false),
        })
    }

    pub fn is_rate_limiting_enabled(&self) -> bool {
        self.rate_limit.is_some()
    }

    pub fn is_caching_enabled(&self) -> bool {
        self.cache_ttl.is_some()
    }
}
