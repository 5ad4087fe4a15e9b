//! Chain ordering and short-circuit tests

use std::io;

use http::StatusCode;

use prefilter::core::{FilterContext, Response};
use prefilter::filter::{ErrorPolicy, FilterChain, Priority};
use prefilter::Error;

use crate::helpers::*;

fn recording_chain(trail: &Trail) -> FilterChain {
    let (a, b, c, d, e) = (
        trail.clone(),
        trail.clone(),
        trail.clone(),
        trail.clone(),
        trail.clone(),
    );
    FilterChain::new()
        .request_named(Priority::USER, "user", move |_: &mut FilterContext| -> io::Result<()> {
            a.push("request:user");
            Ok(())
        })
        .request_named(Priority::SECURITY, "auth", move |_: &mut FilterContext| -> io::Result<()> {
            b.push("request:auth");
            Ok(())
        })
        .request_named(Priority::DECODER, "decode", move |_: &mut FilterContext| -> io::Result<()> {
            c.push("request:decode");
            Ok(())
        })
        .response_named(
            Priority::SECURITY,
            "audit",
            move |_: &mut FilterContext| -> io::Result<()> {
                d.push("response:audit");
                Ok(())
            },
        )
        .response_named(Priority::USER, "decorate", move |_: &mut FilterContext| -> io::Result<()> {
            e.push("response:decorate");
            Ok(())
        })
}

/// Request filters ascend by priority, response filters descend
#[tokio::test]
async fn test_filters_run_in_priority_order() {
    let trail = Trail::default();
    let chain = recording_chain(&trail);
    let target = EchoTarget::new();

    let mut ctx = context("GET", "/api/orders");
    let res = chain.process(&mut ctx, &target).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body().as_ref(), b"GET /api/orders");
    assert_eq!(
        trail.entries(),
        vec![
            "request:auth",
            "request:decode",
            "request:user",
            "response:decorate",
            "response:audit",
        ]
    );
}

/// A response attached by a request filter skips the rest and the target
#[tokio::test]
async fn test_short_circuit_reaches_response_filters() {
    let trail = Trail::default();
    let chain = recording_chain(&trail).request_named(
        Priority::HEADER_DECORATOR,
        "deny",
        |ctx: &mut FilterContext| -> io::Result<()> {
            ctx.set_response(Response::empty(StatusCode::FORBIDDEN));
            Ok(())
        },
    );
    let target = EchoTarget::new();

    let mut ctx = context("GET", "/api/orders");
    let res = chain.process(&mut ctx, &target).await.unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.aborted_by(), Some("deny"));
    assert_eq!(target.calls(), 0);
    assert_eq!(
        trail.entries(),
        vec!["request:auth", "response:decorate", "response:audit"]
    );
}

/// Unmatched requests get 404 without touching request filters
#[tokio::test]
async fn test_unmatched_request_never_reaches_request_filters() {
    let trail = Trail::default();
    let chain = recording_chain(&trail);
    let target = EchoTarget::new();

    let mut ctx = context("GET", "/other");
    let res = chain.process(&mut ctx, &target).await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(target.calls(), 0);
    assert_eq!(trail.entries(), vec!["response:decorate", "response:audit"]);
}

/// Pre-match filters can steer a request onto the target
#[tokio::test]
async fn test_pre_match_rewrite_enables_matching() {
    let chain = FilterChain::new().pre_match_named(
        Priority::USER,
        "legacy-prefix",
        |ctx: &mut FilterContext| -> io::Result<()> {
            if let Some(rest) = ctx.request.path().strip_prefix("/v1") {
                let uri = format!("/api{}", rest).parse::<http::Uri>().map_err(|e| {
                    io::Error::new(io::ErrorKind::InvalidInput, e)
                })?;
                ctx.request.set_uri(uri);
            }
            Ok(())
        },
    );
    let target = EchoTarget::new();

    let mut ctx = context("GET", "/v1/orders");
    let res = chain.process(&mut ctx, &target).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body().as_ref(), b"GET /api/orders");
}

/// Filter failures become 500s or errors depending on policy
#[tokio::test]
async fn test_error_policies() {
    let broken = |_: &mut FilterContext| -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "token store offline"))
    };
    let target = EchoTarget::new();

    let chain = FilterChain::new().request_named(Priority::SECURITY, "auth", broken);
    let mut ctx = context("GET", "/api/orders");
    let res = chain.process(&mut ctx, &target).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let chain = chain.with_error_policy(ErrorPolicy::Propagate);
    let mut ctx = context("GET", "/api/orders");
    match chain.process(&mut ctx, &target).await {
        Err(Error::Filter { filter, source, .. }) => {
            assert_eq!(filter, "auth");
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected filter error, got {:?}", other.map(|r| r.status())),
    }
    assert_eq!(target.calls(), 0);
}
