//! Typed lookups over configuration variables.
//!
//! Every helper reads through a [`Vars`] lookup so configuration can be
//! loaded from the process environment or from a fixed map in tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;

/// Source of configuration variables.
pub trait Vars {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
pub struct ProcessEnv;

impl Vars for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Vars for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl Vars for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }
}

/// Get variable with default value.
pub fn env_or(vars: &dyn Vars, key: &str, default: &str) -> String {
    vars.var(key).unwrap_or_else(|| default.to_string())
}

/// Get optional variable (None if empty or missing).
pub fn env_opt(vars: &dyn Vars, key: &str) -> Option<String> {
    vars.var(key).filter(|s| !s.is_empty())
}

/// `1`, `true`, `yes` and `on` (any case) are true; any other set value is
/// false.
pub fn env_bool(vars: &dyn Vars, key: &str, default: bool) -> bool {
    match vars.var(key) {
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => default,
    }
}

/// Parse variable with type conversion.
pub fn env_parse<T: FromStr>(vars: &dyn Vars, key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match vars.var(key) {
        Some(v) if !v.is_empty() => v.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
            key: key.into(),
            value: v,
            error: e.to_string(),
        }),
        _ => Ok(default),
    }
}

/// Duration with a unit suffix: `30s`, `2m`, `1h`, `1d`, `1w`, or plain
/// seconds. `off`, empty and zero mean disabled (`None`).
pub fn parse_duration(s: &str) -> Result<Option<Duration>, String> {
    let text = s.trim().to_ascii_lowercase();
    if matches!(text.as_str(), "" | "off") {
        return Ok(None);
    }

    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);

    let multiplier: u64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        _ => return Err(format!("unknown duration unit in '{}'", s.trim())),
    };

    let count: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration: '{}'", s.trim()))?;
    let secs = count
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration too large: '{}'", s.trim()))?;

    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

/// Parse variable as duration.
pub fn env_duration(
    vars: &dyn Vars,
    key: &str,
    default: &str,
) -> Result<Option<Duration>, ConfigError> {
    let value = env_or(vars, key, default);
    parse_duration(&value).map_err(|e| ConfigError::Parse {
        key: key.into(),
        value,
        error: e,
    })
}
