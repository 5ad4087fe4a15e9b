//! Core types shared by filters, targets and the chain.
//!
//! - [`Request`] - the pending HTTP request (incoming or outgoing)
//! - [`Response`] - HTTP response with builder pattern
//! - [`FilterContext`] - mutable per-request invocation context
//! - [`Error`] - core error types
//!
//! # Example
//!
//! ```rust,ignore
//! use prefilter::core::{FilterContext, Request, Response};
//!
//! let mut ctx = FilterContext::new(Request::parse("GET", "/health")?);
//! ctx.set_response(Response::ok("up"));
//! assert!(ctx.has_response());
//! ```

mod context;
mod error;
mod request;
mod response;

pub use context::{
    generate_span_id, generate_trace_id, FilterContext, FilterContextBuilder, Side,
};
pub use error::{Error, Result, Stage};
pub use request::Request;
pub use response::{Response, ResponseBuilder};
