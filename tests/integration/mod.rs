//! Integration tests for prefilter
//!
//! Drive full filter chains through the public API, the way a host
//! framework or HTTP client would.
//!
//! Run with: cargo test --test integration

mod helpers;

mod builtins;
mod client_side;
mod ordering;
mod replay;
