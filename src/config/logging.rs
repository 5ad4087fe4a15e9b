//! Logging configuration.

use std::str::FromStr;

use super::parse::{env_or, Vars};
use super::ConfigError;

/// Output format of log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable tracing output.
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format '{}', expected: json, text", other)),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log level filter (from LOG_LEVEL or RUST_LOG).
    pub filter: String,
    /// Service name for structured logging.
    pub service_name: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Priority: LOG_LEVEL > RUST_LOG > default
    ///
    /// LOG_LEVEL accepts simple values: trace, debug, info, warn, error
    /// RUST_LOG accepts full tracing filter syntax: prefilter=debug,access=info
    pub fn from_vars(vars: &dyn Vars) -> Result<Self, ConfigError> {
        let format = env_or(vars, "LOG_FORMAT", "json")
            .parse::<LogFormat>()
            .map_err(|message| ConfigError::Invalid {
                key: "LOG_FORMAT".into(),
                message,
            })?;

        Ok(Self {
            filter: resolve_log_filter(vars),
            service_name: env_or(vars, "SERVICE_NAME", "prefilter"),
            format,
        })
    }
}

fn resolve_log_filter(vars: &dyn Vars) -> String {
    if let Some(level) = vars.var("LOG_LEVEL") {
        let level = level.to_lowercase();
        match level.as_str() {
            // Access events use their own target
            "trace" | "debug" | "info" | "warn" | "error" => {
                return format!("prefilter={level},access={level}");
            }
            _ => {
                // Subscriber is not installed yet
                eprintln!(
                    "Warning: Invalid LOG_LEVEL '{}', expected: trace, debug, info, warn, error",
                    level
                );
            }
        }
    }

    if let Some(filter) = vars.var("RUST_LOG").filter(|f| !f.is_empty()) {
        return filter;
    }

    "prefilter=info,access=info".to_string()
}
