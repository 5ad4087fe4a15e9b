//! Access logging filter.
//!
//! Emits one structured `tracing` event per invocation on target `access`.

use std::io;

use crate::config::ChainConfig;
use crate::core::FilterContext;

use super::ResponseFilter;

/// Logs every completed invocation, short-circuited ones included.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessLogFilter;

impl AccessLogFilter {
    pub fn new() -> Self {
        Self
    }

    /// Returns None if access logging is disabled.
    pub fn from_config(config: &ChainConfig) -> Option<Self> {
        config.access_log.then_some(Self)
    }
}

impl ResponseFilter for AccessLogFilter {
    fn post_filter(&self, ctx: &mut FilterContext) -> io::Result<()> {
        let Some(res) = ctx.response() else {
            return Ok(());
        };

        let req = &ctx.request;
        let method = req.method().as_str();
        let path = req.path();
        let status = res.status().as_u16();

        tracing::info!(
            target: "access",
            method = method,
            path = path,
            query = req.query(),
            status = status,
            bytes = res.body_len() as u64,
            duration_ms = ctx.elapsed_ms(),
            ip = %ctx.client_ip,
            ua = req.user_agent(),
            referer = req.referer(),
            side = %ctx.side,
            aborted_by = ctx.aborted_by(),
            request_id = %ctx.request_id,
            trace_id = %ctx.trace_id,
            span_id = %ctx.span_id,
            "{} {} {}",
            method,
            path,
            status
        );

        Ok(())
    }
}
