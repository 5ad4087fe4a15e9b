//! Built-in filters wired from configuration

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use http::StatusCode;

use prefilter::config::Config;
use prefilter::filter::FilterChain;

use crate::helpers::*;

fn chain_from(vars: &[(&str, &str)]) -> FilterChain {
    let vars: HashMap<&str, &str> = vars.iter().copied().collect();
    let config = Config::from_vars(&vars).expect("valid config");
    FilterChain::from_config(&config.chain)
}

#[tokio::test]
async fn test_configured_chain_caches_then_rate_limits() {
    let chain = chain_from(&[("RATE_LIMIT", "2"), ("CACHE_TTL", "1m")]);
    let target = EchoTarget::new();

    let mut ctx = context_from("GET", "/api/items", [10, 0, 0, 1]);
    let first = chain.process(&mut ctx, &target).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.header("x-cache"), Some("MISS"));
    assert_eq!(first.header("x-ratelimit-limit"), Some("2"));
    assert_eq!(first.header("x-ratelimit-remaining"), Some("1"));

    let mut ctx = context_from("GET", "/api/items", [10, 0, 0, 1]);
    let second = chain.process(&mut ctx, &target).await.unwrap();
    assert_eq!(second.header("x-cache"), Some("HIT"));
    assert_eq!(second.body().as_ref(), b"GET /api/items");
    assert_eq!(ctx.aborted_by(), Some("CacheFilter"));
    assert_eq!(target.calls(), 1);

    let mut ctx = context_from("GET", "/api/items", [10, 0, 0, 1]);
    let third = chain.process(&mut ctx, &target).await.unwrap();
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(third.header("x-ratelimit-remaining"), Some("0"));
    assert!(third.header("retry-after").is_some());
    assert_eq!(ctx.aborted_by(), Some("RateLimitFilter"));

    // Other clients keep their own budget
    let mut ctx = context_from("GET", "/api/items", [10, 0, 0, 2]);
    let other = chain.process(&mut ctx, &target).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_method_override_is_seen_by_target() {
    let chain = chain_from(&[("METHOD_OVERRIDE", "true")]);
    let target = EchoTarget::new();

    let mut ctx = context("POST", "/api/orders/7");
    ctx.request
        .headers_mut()
        .insert("x-http-method-override", http::HeaderValue::from_static("DELETE"));

    let res = chain.process(&mut ctx, &target).await.unwrap();
    assert_eq!(res.body().as_ref(), b"DELETE /api/orders/7");
}

#[tokio::test]
async fn test_empty_config_builds_empty_chain() {
    let chain = chain_from(&[]);
    assert!(chain.is_empty());

    let chain = chain_from(&[
        ("RATE_LIMIT", "10"),
        ("CACHE_TTL", "30s"),
        ("METHOD_OVERRIDE", "1"),
        ("ACCESS_LOG", "true"),
    ]);
    // Cache is registered on both stages
    assert_eq!(chain.len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_rate_limit() {
    let chain = Arc::new(chain_from(&[("RATE_LIMIT", "5"), ("RATE_WINDOW", "60")]));
    let target = Arc::new(EchoTarget::new());

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let chain = Arc::clone(&chain);
            let target = Arc::clone(&target);
            tokio::spawn(async move {
                let mut ctx = context_from("GET", "/api/items", [192, 168, 0, 9]);
                chain.process(&mut ctx, &*target).await.unwrap().status()
            })
        })
        .collect();

    let statuses: Vec<StatusCode> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let allowed = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let limited = statuses
        .iter()
        .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
        .count();
    assert_eq!(allowed, 5);
    assert_eq!(limited, 15);
    assert_eq!(target.calls(), 5);
}
