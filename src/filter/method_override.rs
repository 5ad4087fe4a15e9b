//! HTTP method override pre-match filter.
//!
//! Lets clients that can only send `POST` reach `PUT`/`PATCH`/`DELETE`
//! targets through the `X-HTTP-Method-Override` header. Runs before
//! matching, so the rewritten method is what the target sees.

use std::io;

use http::Method;

use crate::config::ChainConfig;
use crate::core::FilterContext;

use super::PreMatchRequestFilter;

pub const OVERRIDE_HEADER: &str = "x-http-method-override";

/// Rewrites `POST` requests carrying `X-HTTP-Method-Override`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MethodOverrideFilter;

impl MethodOverrideFilter {
    pub fn new() -> Self {
        Self
    }

    /// Returns None if method override is disabled.
    pub fn from_config(config: &ChainConfig) -> Option<Self> {
        config.method_override.then_some(Self)
    }
}

impl PreMatchRequestFilter for MethodOverrideFilter {
    fn pre_match_filter(&self, ctx: &mut FilterContext) -> io::Result<()> {
        if ctx.request.method() != Method::POST {
            return Ok(());
        }

        let Some(value) = ctx.request.headers_mut().remove(OVERRIDE_HEADER) else {
            return Ok(());
        };

        let parsed = value
            .to_str()
            .ok()
            .map(|v| v.trim().to_ascii_uppercase())
            .and_then(|v| Method::from_bytes(v.as_bytes()).ok());

        match parsed {
            Some(method) if method != Method::CONNECT && method != Method::TRACE => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    method = %method,
                    "method overridden"
                );
                ctx.request.set_method(method);
            }
            _ => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    value = ?value,
                    "ignoring method override"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Request;

    fn context(method: &str, override_value: Option<&str>) -> FilterContext {
        let mut req = Request::parse(method, "/orders/1").unwrap();
        if let Some(v) = override_value {
            req = req.with_header(OVERRIDE_HEADER, v);
        }
        FilterContext::new(req)
    }

    #[test]
    fn test_overrides_post() {
        let mut ctx = context("POST", Some("delete"));
        MethodOverrideFilter.pre_match_filter(&mut ctx).unwrap();

        assert_eq!(ctx.request.method(), Method::DELETE);
        assert!(ctx.request.header(OVERRIDE_HEADER).is_none());
        assert!(!ctx.has_response());
    }

    #[test]
    fn test_ignores_other_methods() {
        let mut ctx = context("GET", Some("DELETE"));
        MethodOverrideFilter.pre_match_filter(&mut ctx).unwrap();
        assert_eq!(ctx.request.method(), Method::GET);
    }

    #[test]
    fn test_rejects_connect_and_trace() {
        for value in ["CONNECT", "TRACE"] {
            let mut ctx = context("POST", Some(value));
            MethodOverrideFilter.pre_match_filter(&mut ctx).unwrap();
            assert_eq!(ctx.request.method(), Method::POST);
        }
    }

    #[test]
    fn test_invalid_value_is_ignored() {
        let mut ctx = context("POST", Some("NOT A METHOD"));
        MethodOverrideFilter.pre_match_filter(&mut ctx).unwrap();
        assert_eq!(ctx.request.method(), Method::POST);
    }

    #[test]
    fn test_from_config() {
        let mut config = ChainConfig::default();
        assert!(MethodOverrideFilter::from_config(&config).is_none());
        config.method_override = true;
        assert!(MethodOverrideFilter::from_config(&config).is_some());
    }
}
