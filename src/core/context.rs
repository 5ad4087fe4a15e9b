//! Invocation context passed through the filter chain.

use std::any::Any;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use serde::Deserialize;

use super::{Request, Response};

/// Which end of an HTTP exchange the chain is running on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Before a resource method is invoked.
    #[default]
    Server,
    /// Before an outgoing HTTP call is dispatched.
    Client,
}

impl Side {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Side::Server => "server",
            Side::Client => "client",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable per-request state handed to every filter.
///
/// A filter may inspect or rewrite the pending [`Request`], stash values for
/// later filters, or attach a [`Response`]. Attaching a response before the
/// target runs short-circuits the request chain; the response filters still
/// see it.
pub struct FilterContext {
    /// The pending request.
    pub request: Request,

    /// Server or client invocation.
    pub side: Side,

    /// Client IP address (peer address on the server side).
    pub client_ip: IpAddr,

    /// 32 hex chars, W3C trace-context compatible.
    pub trace_id: String,
    /// 16 hex chars.
    pub span_id: String,
    /// `<trace[..12]>-<span[..4]>`, used to correlate log lines.
    pub request_id: String,

    pub started_at: Instant,

    response: Option<Response>,
    aborted_by: Option<&'static str>,
    /// Queued for the final response; never override headers it already has.
    response_headers: HashMap<String, String>,
    properties: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl FilterContext {
    /// Server-side context with fresh trace identifiers.
    pub fn new(request: Request) -> Self {
        Self::builder(request).build()
    }

    pub fn builder(request: Request) -> FilterContextBuilder {
        FilterContextBuilder::new(request)
    }

    /// Attach a response.
    ///
    /// During request filtering this stops the chain: no later request filter
    /// and no target invocation will run.
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    #[inline]
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Registered name of the filter that short-circuited the request.
    pub fn aborted_by(&self) -> Option<&'static str> {
        self.aborted_by
    }

    pub(crate) fn mark_aborted(&mut self, filter: &'static str) {
        self.aborted_by = Some(filter);
    }

    /// Store a property for filters further down the chain.
    ///
    /// Properties are typed: reading one back with another type yields
    /// `None`.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.properties.insert(key.into(), Box::new(value));
    }

    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.properties.get(key)?.downcast_ref()
    }

    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.properties.get_mut(key)?.downcast_mut()
    }

    /// Take a property out. A property of another type is left in place.
    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        if !self.properties.get(key)?.is::<T>() {
            return None;
        }
        let value = self.properties.remove(key)?.downcast::<T>().ok()?;
        Some(*value)
    }

    /// Queue a header for the final response.
    pub fn set_response_header(&mut self, name: impl Into<String>, value: impl ToString) {
        self.response_headers.insert(name.into(), value.to_string());
    }

    pub fn response_headers(&self) -> &HashMap<String, String> {
        &self.response_headers
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl std::fmt::Debug for FilterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterContext")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("side", &self.side)
            .field("request_id", &self.request_id)
            .field("has_response", &self.response.is_some())
            .field("aborted_by", &self.aborted_by)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FilterContext`].
pub struct FilterContextBuilder {
    request: Request,
    side: Side,
    client_ip: IpAddr,
    trace_id: Option<String>,
    span_id: Option<String>,
}

impl FilterContextBuilder {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            side: Side::default(),
            client_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            trace_id: None,
            span_id: None,
        }
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Defaults to 127.0.0.1.
    pub fn client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = ip;
        self
    }

    /// Continue an existing trace instead of starting a new one.
    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    pub fn build(self) -> FilterContext {
        let trace_id = self.trace_id.unwrap_or_else(generate_trace_id);
        let span_id = self.span_id.unwrap_or_else(generate_span_id);
        let request_id = format!("{}-{}", prefix(&trace_id, 12), prefix(&span_id, 4));

        FilterContext {
            request: self.request,
            side: self.side,
            client_ip: self.client_ip,
            trace_id,
            span_id,
            request_id,
            started_at: Instant::now(),
            response: None,
            aborted_by: None,
            response_headers: HashMap::new(),
            properties: HashMap::new(),
        }
    }
}

/// At most `len` bytes of `s`, whole `s` if shorter or not on a char boundary.
fn prefix(s: &str, len: usize) -> &str {
    s.get(..len).unwrap_or(s)
}

// ============================================================================
// Identifier generation
// ============================================================================

/// splitmix64 over a process-wide counter.
///
/// The mix is a bijection, so ids never repeat within a process; the random
/// seed keeps them from repeating across processes.
fn next_id() -> u64 {
    static SEED: OnceLock<u64> = OnceLock::new();
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let seed = *SEED.get_or_init(|| {
        use std::collections::hash_map::RandomState;
        use std::hash::BuildHasher;
        RandomState::new().hash_one(std::process::id())
    });

    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut z = seed.wrapping_add(n.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D1_049B_B133_111E);
    z ^ (z >> 31)
}

/// Random 128-bit trace id as 32 lowercase hex chars.
pub fn generate_trace_id() -> String {
    format!("{:016x}{:016x}", next_id(), next_id())
}

/// Random 64-bit span id as 16 lowercase hex chars.
pub fn generate_span_id() -> String {
    format!("{:016x}", next_id())
}
