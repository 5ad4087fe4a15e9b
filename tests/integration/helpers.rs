//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::StatusCode;

use prefilter::core::{FilterContext, Request, Response};
use prefilter::target::Target;

/// Target that echoes the method and path it was invoked with.
#[derive(Default)]
pub struct EchoTarget {
    calls: AtomicUsize,
}

impl EchoTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Target for EchoTarget {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn matches(&self, request: &Request) -> bool {
        request.path().starts_with("/api")
    }

    async fn invoke(&self, ctx: &mut FilterContext) -> io::Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = format!("{} {}", ctx.request.method(), ctx.request.path());
        Ok(Response::builder()
            .status(StatusCode::OK)
            .text()
            .body(body)
            .build())
    }
}

/// Shared log of which filters ran, in order.
#[derive(Clone, Default)]
pub struct Trail(Arc<Mutex<Vec<String>>>);

impl Trail {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub fn context(method: &str, uri: &str) -> FilterContext {
    FilterContext::new(Request::parse(method, uri).unwrap())
}

pub fn context_from(method: &str, uri: &str, ip: [u8; 4]) -> FilterContext {
    FilterContext::builder(Request::parse(method, uri).unwrap())
        .client_ip(IpAddr::V4(Ipv4Addr::from(ip)))
        .build()
}
