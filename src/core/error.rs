//! Errors raised while running a filter chain.

use std::fmt;

/// Filter chain stage a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Before target resolution.
    PreMatch,
    /// After resolution, before the target runs.
    Request,
    /// After the target or a short-circuit.
    Response,
}

impl Stage {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::PreMatch => "pre_match",
            Stage::Request => "request",
            Stage::Response => "response",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core errors for filtering and invocation.
#[derive(Debug)]
pub enum Error {
    /// Invalid request (e.g. malformed method or URI).
    InvalidRequest(String),

    /// A filter failed with an I/O error.
    Filter {
        stage: Stage,
        filter: &'static str,
        source: std::io::Error,
    },

    /// The target invocation failed.
    Target(std::io::Error),

    /// Reading an input stream failed, e.g. on bytes that are not UTF-8.
    Io(std::io::Error),

    /// JSON encoding/decoding error.
    Json(serde_json::Error),
}

impl Error {
    /// Build a filter error.
    pub fn filter(stage: Stage, filter: &'static str, source: std::io::Error) -> Self {
        Error::Filter {
            stage,
            filter,
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            Error::Filter {
                stage,
                filter,
                source,
            } => write!(f, "{} filter '{}' failed: {}", stage, filter, source),
            Error::Target(e) => write!(f, "target invocation failed: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Filter { source, .. } => Some(source),
            Error::Target(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::InvalidRequest(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
