//! HTTP response abstraction for filters and targets.

use bytes::Bytes;
use http::header::{HeaderName, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderMap, HeaderValue, StatusCode};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// HTTP response.
///
/// Clone is cheap: the body is reference counted. Caching filters rely on it
/// to replay stored responses.
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    #[inline]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// Canned response with a static reason body.
    fn canned(status: StatusCode, body: &'static [u8]) -> Self {
        Self::empty(status).with_body(Bytes::from_static(body))
    }

    /// 200 OK with the given body.
    #[inline]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::empty(StatusCode::OK).with_body(body)
    }

    /// Answer for requests no target matched.
    pub fn not_found() -> Self {
        Self::canned(StatusCode::NOT_FOUND, b"Not Found")
    }

    /// Answer for failures translated by the chain.
    pub fn internal_error() -> Self {
        Self::canned(StatusCode::INTERNAL_SERVER_ERROR, b"Internal Server Error")
    }

    /// 429 carrying `Retry-After` in seconds.
    pub fn too_many_requests(retry_after: u64) -> Self {
        let mut res = Self::canned(StatusCode::TOO_MANY_REQUESTS, b"Too Many Requests");
        res.headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
        res
    }

    #[inline]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE)?.to_str().ok()
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Insert or replace a header. Invalid names or values are dropped.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes());
        let value = HeaderValue::from_str(value.as_ref());
        if let (Ok(name), Ok(value)) = (name, value) {
            self.headers.insert(name, value);
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::empty(StatusCode::OK)
    }
}

impl From<Response> for http::Response<Bytes> {
    fn from(res: Response) -> Self {
        let Response {
            status,
            headers,
            body,
        } = res;
        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        out
    }
}

impl<B: Into<Bytes>> From<http::Response<B>> for Response {
    fn from(res: http::Response<B>) -> Self {
        let (parts, body) = res.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body: body.into(),
        }
    }
}

/// Chained construction of a [`Response`], starting from an empty 200.
#[derive(Default)]
pub struct ResponseBuilder {
    inner: Response,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.inner.status = status;
        self
    }

    /// Invalid names or values are dropped.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.inner.set_header(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.inner.body = body.into();
        self
    }

    /// `Content-Type: text/plain; charset=utf-8`.
    pub fn text(mut self) -> Self {
        self.inner
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        self
    }

    #[inline]
    pub fn build(self) -> Response {
        self.inner
    }
}
