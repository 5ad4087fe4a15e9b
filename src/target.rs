//! Invocation targets: what the chain calls once filtering lets a request through.
//!
//! On the server side a target stands for a resource method, on the client
//! side for the outgoing HTTP call. Resolution is a single predicate;
//! routing tables live with the host.

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;

use crate::config::TargetConfig;
use crate::core::{FilterContext, Request, Response};

/// The thing a filtered request is finally dispatched to.
#[async_trait]
pub trait Target: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        "target"
    }

    /// Whether this target accepts the request.
    ///
    /// Evaluated after pre-match filtering. Request filters only run for
    /// matched requests.
    fn matches(&self, _request: &Request) -> bool {
        true
    }

    /// Invoke the target.
    async fn invoke(&self, ctx: &mut FilterContext) -> io::Result<Response>;
}

/// Target that answers every matched request with the same response.
#[derive(Clone, Debug)]
pub struct StaticTarget {
    status: StatusCode,
    body: Bytes,
    prefix: Option<String>,
}

impl StaticTarget {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            prefix: None,
        }
    }

    /// Only match request paths starting with `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn from_config(config: &TargetConfig) -> Self {
        let target = Self::new(config.status, config.body.clone());
        match &config.prefix {
            Some(prefix) => target.with_prefix(prefix.clone()),
            None => target,
        }
    }
}

#[async_trait]
impl Target for StaticTarget {
    fn name(&self) -> &'static str {
        "static"
    }

    fn matches(&self, request: &Request) -> bool {
        self.prefix
            .as_deref()
            .map_or(true, |prefix| request.path().starts_with(prefix))
    }

    async fn invoke(&self, _ctx: &mut FilterContext) -> io::Result<Response> {
        Ok(Response::builder()
            .status(self.status)
            .text()
            .body(self.body.clone())
            .build())
    }
}
