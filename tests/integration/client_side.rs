//! Client-side use: filters run before an outgoing call is dispatched

use std::io;

use async_trait::async_trait;
use http::StatusCode;

use prefilter::core::{FilterContext, Request, Response, Side};
use prefilter::filter::{FilterChain, Priority};
use prefilter::target::Target;

/// Stands in for the HTTP transport; answers from the prepared request.
struct Outgoing;

#[async_trait]
impl Target for Outgoing {
    fn name(&self) -> &'static str {
        "outgoing"
    }

    async fn invoke(&self, ctx: &mut FilterContext) -> io::Result<Response> {
        match ctx.request.header("authorization") {
            Some(token) => Ok(Response::ok(format!("sent with {}", token))),
            None => Ok(Response::empty(StatusCode::UNAUTHORIZED)),
        }
    }
}

fn client_chain() -> FilterChain {
    FilterChain::new()
        .request_named(
            Priority::HEADER_DECORATOR,
            "bearer",
            |ctx: &mut FilterContext| -> io::Result<()> {
                if ctx.side == Side::Client {
                    ctx.request.headers_mut().insert(
                        http::header::AUTHORIZATION,
                        http::HeaderValue::from_static("Bearer abc"),
                    );
                }
                Ok(())
            },
        )
        .request_named(
            Priority::USER,
            "offline",
            |ctx: &mut FilterContext| -> io::Result<()> {
                if ctx.request.header("x-offline").is_some() {
                    ctx.set_response(Response::empty(StatusCode::SERVICE_UNAVAILABLE));
                }
                Ok(())
            },
        )
}

fn outgoing(headers: &[(&str, &str)]) -> FilterContext {
    let mut request = Request::parse("GET", "https://upstream.test/resource").unwrap();
    for (name, value) in headers {
        request = request.with_header(name, value);
    }
    FilterContext::builder(request).side(Side::Client).build()
}

#[tokio::test]
async fn test_filter_decorates_outgoing_call() {
    let mut ctx = outgoing(&[]);
    let res = client_chain().process(&mut ctx, &Outgoing).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body().as_ref(), b"sent with Bearer abc");
}

#[tokio::test]
async fn test_short_circuit_skips_outgoing_call() {
    let mut ctx = outgoing(&[("x-offline", "1")]);
    let res = client_chain().process(&mut ctx, &Outgoing).await.unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ctx.aborted_by(), Some("offline"));
}

#[test]
fn test_chain_is_usable_from_sync_code() {
    let mut ctx = outgoing(&[]);
    let res = tokio_test::block_on(client_chain().process(&mut ctx, &Outgoing)).unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
