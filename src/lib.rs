//! prefilter - Pre-invocation request filters for HTTP services and clients.
//!
//! A [`RequestFilter`] runs after a request has been matched to its target
//! but before the target is invoked: a resource method on the server side,
//! or the outgoing HTTP call on the client side. A filter may inspect or
//! rewrite the request, or attach a response to the [`FilterContext`] to
//! short-circuit the invocation.
//!
//! # Features
//!
//! - **Ordered chains**: filters run in ascending [`Priority`] order, ties in
//!   registration order
//! - **Short-circuiting**: an attached response skips the remaining request
//!   filters and the target, but still passes through response filters
//! - **Pre-match and response stages**: hooks before matching and after
//!   invocation
//! - **Built-in filters**: rate limiting, response caching, method override,
//!   access logging
//! - **Structured logging**: JSON log lines via `tracing`
//!
//! # Example
//!
//! ```rust,ignore
//! use prefilter::{FilterChain, FilterContext, Priority};
//! use prefilter::core::{Request, Response};
//! use prefilter::target::StaticTarget;
//!
//! let chain = FilterChain::new().request(
//!     Priority::SECURITY,
//!     |ctx: &mut FilterContext| -> std::io::Result<()> {
//!         if ctx.request.header("authorization").is_none() {
//!             ctx.set_response(Response::empty(http::StatusCode::UNAUTHORIZED));
//!         }
//!         Ok(())
//!     },
//! );
//!
//! let mut ctx = FilterContext::new(Request::parse("GET", "/orders")?);
//! let res = chain.process(&mut ctx, &StaticTarget::new(http::StatusCode::OK, "ok")).await?;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars), empty outside a git checkout
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod config;
pub mod core;
pub mod filter;
pub mod logging;
pub mod replay;
pub mod target;

// Re-exports for convenience
pub use config::Config;
pub use crate::core::{Error, FilterContext, Request, Response, Result};
pub use filter::{
    ErrorPolicy, FilterChain, PreMatchRequestFilter, Priority, RequestFilter, ResponseFilter,
};
pub use target::{StaticTarget, Target};
