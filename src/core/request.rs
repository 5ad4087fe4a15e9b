//! HTTP request abstraction for the filter chain.

use bytes::Bytes;
use http::header::{AsHeaderName, HeaderName, HeaderValue};
use http::{header, HeaderMap, Method, Uri, Version};

use super::error::{Error, Result};

/// HTTP request as seen by filters.
///
/// On the server side this is the incoming request; on the client side it is
/// the fully prepared outgoing call. Everything a filter may rewrite before
/// the target runs is mutable.
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Bytes>,
}

impl Request {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let mut inner = http::Request::new(body);
        *inner.method_mut() = method;
        *inner.uri_mut() = uri;
        *inner.headers_mut() = headers;
        Self { inner }
    }

    /// Body-less request from method and URI text.
    pub fn parse(method: &str, uri: &str) -> Result<Self> {
        let parsed_method = Method::from_bytes(method.as_bytes())
            .map_err(|e| Error::InvalidRequest(format!("method '{}': {}", method, e)))?;
        let parsed_uri = uri
            .parse::<Uri>()
            .map_err(|e| Error::InvalidRequest(format!("uri '{}': {}", uri, e)))?;
        Ok(Self::new(parsed_method, parsed_uri, HeaderMap::new(), Bytes::new()))
    }

    #[inline]
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn set_method(&mut self, method: Method) {
        *self.inner.method_mut() = method;
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn set_uri(&mut self, uri: Uri) {
        *self.inner.uri_mut() = uri;
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.uri().query()
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        *self.inner.body_mut() = body.into();
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn set_version(&mut self, version: Version) {
        *self.inner.version_mut() = version;
    }

    /// Header value as text, if present and valid UTF-8. Names are
    /// case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.text_header(name)
    }

    fn text_header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Insert a header, builder style. Invalid names or values are dropped.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes());
        let value = HeaderValue::from_str(value.as_ref());
        if let (Ok(name), Ok(value)) = (name, value) {
            self.inner.headers_mut().insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.set_body(body);
        self
    }

    pub fn accept(&self) -> Option<&str> {
        self.text_header(header::ACCEPT)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.text_header(header::CONTENT_TYPE)
    }

    /// Declared body length; `None` when absent or not a number.
    pub fn content_length(&self) -> Option<u64> {
        self.text_header(header::CONTENT_LENGTH)?.trim().parse().ok()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.text_header(header::USER_AGENT)
    }

    pub fn referer(&self) -> Option<&str> {
        self.text_header(header::REFERER)
    }
}

impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        Self {
            inner: req.map(Into::into),
        }
    }
}

impl From<Request> for http::Request<Bytes> {
    fn from(req: Request) -> Self {
        req.inner
    }
}
