//! Request/response filter contracts and the chain that drives them.
//!
//! Three extension points surround a target invocation:
//!
//! ```text
//! Request → PreMatch filters → match target → Request filters → Target
//!                                                                  ↓
//! Response ←──────────── Response filters (reverse priority) ←─────┘
//! ```
//!
//! A request or pre-match filter short-circuits by attaching a response to
//! the context. Whatever produced the response, the response filters always
//! run.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::io;
//! use prefilter::core::{FilterContext, Response};
//! use prefilter::filter::{FilterChain, Priority};
//!
//! let chain = FilterChain::new().request_named(
//!     Priority::SECURITY,
//!     "require_token",
//!     |ctx: &mut FilterContext| -> io::Result<()> {
//!         if ctx.request.header("authorization").is_none() {
//!             ctx.set_response(Response::empty(http::StatusCode::UNAUTHORIZED));
//!         }
//!         Ok(())
//!     },
//! );
//! ```

mod chain;
mod priority;

pub mod access_log;
pub mod cache;
pub mod method_override;
pub mod rate_limit;

pub use chain::{ErrorPolicy, FilterChain};
pub use priority::Priority;

use std::io;

use crate::core::FilterContext;

/// Filter invoked at the pre-invocation extension point.
///
/// On the client side it runs before the HTTP call is dispatched; on the
/// server side it runs before the resource method is called but after the
/// request has been matched to it. Unmatched requests never reach it. Use a
/// [`PreMatchRequestFilter`] for work that must happen before matching.
///
/// Filters in a chain are ordered by the priority they were registered with.
/// If a filter attaches a response with [`FilterContext::set_response`], the
/// request chain stops and the response is returned without invoking the
/// target. Such responses still go through the response filter chain; a
/// caching filter is the typical user of this.
///
/// Any `Fn(&mut FilterContext) -> io::Result<()>` closure is a request
/// filter.
pub trait RequestFilter: Send + Sync {
    /// Filter the pending invocation.
    ///
    /// An `Err` is handed to the chain, which turns it into a 500 response
    /// or propagates it depending on its [`ErrorPolicy`].
    fn pre_filter(&self, ctx: &mut FilterContext) -> io::Result<()>;
}

/// Filter invoked before the request is matched to a target.
///
/// May rewrite the request (method, URI, headers) to influence matching, or
/// short-circuit with a response exactly like a [`RequestFilter`].
pub trait PreMatchRequestFilter: Send + Sync {
    fn pre_match_filter(&self, ctx: &mut FilterContext) -> io::Result<()>;
}

/// Filter invoked after the target ran or the request chain short-circuited.
///
/// The context always holds a response when this is called.
pub trait ResponseFilter: Send + Sync {
    fn post_filter(&self, ctx: &mut FilterContext) -> io::Result<()>;
}

impl<F> RequestFilter for F
where
    F: Fn(&mut FilterContext) -> io::Result<()> + Send + Sync,
{
    fn pre_filter(&self, ctx: &mut FilterContext) -> io::Result<()> {
        self(ctx)
    }
}

impl<F> PreMatchRequestFilter for F
where
    F: Fn(&mut FilterContext) -> io::Result<()> + Send + Sync,
{
    fn pre_match_filter(&self, ctx: &mut FilterContext) -> io::Result<()> {
        self(ctx)
    }
}

impl<F> ResponseFilter for F
where
    F: Fn(&mut FilterContext) -> io::Result<()> + Send + Sync,
{
    fn post_filter(&self, ctx: &mut FilterContext) -> io::Result<()> {
        self(ctx)
    }
}

/// Short type name used when a filter is registered without an explicit one.
///
/// `prefilter::filter::cache::CacheFilter` becomes `CacheFilter`.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
