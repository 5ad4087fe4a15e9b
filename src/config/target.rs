//! Replay target configuration.

use http::StatusCode;

use super::parse::{env_opt, env_or, env_parse, Vars};
use super::ConfigError;

/// Response served by the replay tool's static target.
#[derive(Clone, Debug)]
pub struct TargetConfig {
    pub status: StatusCode,
    pub body: String,
    /// Only paths under this prefix match (None = everything matches).
    pub prefix: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            body: "OK".to_string(),
            prefix: None,
        }
    }
}

impl TargetConfig {
    pub fn from_vars(vars: &dyn Vars) -> Result<Self, ConfigError> {
        let code: u16 = env_parse(vars, "TARGET_STATUS", 200)?;
        let status = StatusCode::from_u16(code).map_err(|e| ConfigError::Invalid {
            key: "TARGET_STATUS".into(),
            message: e.to_string(),
        })?;

        Ok(Self {
            status,
            body: env_or(vars, "TARGET_BODY", "OK"),
            prefix: env_opt(vars, "TARGET_PREFIX"),
        })
    }
}
