//! JSON-lines request replay.
//!
//! Each input line describes one request:
//! ```json
//! {"method":"GET","uri":"/items?page=1","headers":{"accept":"text/plain"},"body":"","client_ip":"10.0.0.1"}
//! ```
//! and produces one output line:
//! ```json
//! {"status":200,"headers":{"content-type":"text/plain"},"body":"OK","aborted_by":null}
//! ```
//! A line that cannot be parsed or processed yields `{"line":N,"error":"..."}`
//! and replay continues with the next one.

use std::collections::BTreeMap;
use std::io;
use std::net::IpAddr;

use http::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::{Error, FilterContext, Request, Response, Result, Side};
use crate::filter::FilterChain;
use crate::target::Target;

fn default_method() -> String {
    "GET".to_string()
}

/// One request read from the input stream.
#[derive(Debug, Deserialize)]
pub struct ReplayRequest {
    #[serde(default = "default_method")]
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub client_ip: Option<IpAddr>,
    #[serde(default)]
    pub side: Side,
}

impl ReplayRequest {
    /// Build a fresh invocation context for this request.
    pub fn into_context(self) -> Result<FilterContext> {
        let mut request = Request::parse(&self.method, &self.uri)?.with_body(self.body);

        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidRequest(format!("header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidRequest(format!("header '{}': {}", name, e)))?;
            request.headers_mut().append(name, value);
        }

        let mut builder = FilterContext::builder(request).side(self.side);
        if let Some(ip) = self.client_ip {
            builder = builder.client_ip(ip);
        }
        Ok(builder.build())
    }
}

/// One response written to the output stream.
#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub aborted_by: Option<&'static str>,
}

impl ReplayResponse {
    pub fn new(response: &Response, aborted_by: Option<&'static str>) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes());
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert_with(|| value.into_owned());
        }

        Self {
            status: response.status().as_u16(),
            headers,
            body: String::from_utf8_lossy(response.body()).into_owned(),
            aborted_by,
        }
    }
}

#[derive(Serialize)]
struct ReplayFailure {
    line: u64,
    error: String,
}

/// Counters for a replay run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Non-blank input lines seen.
    pub lines: u64,
    /// Lines that produced a response.
    pub ok: u64,
    /// Lines that produced an error line.
    pub failed: u64,
}

/// Run a single JSON line through the chain.
pub async fn replay_line<T>(chain: &FilterChain, target: &T, line: &str) -> Result<ReplayResponse>
where
    T: Target + ?Sized,
{
    let request: ReplayRequest = serde_json::from_str(line)?;
    let mut ctx = request.into_context()?;
    let response = chain.process(&mut ctx, target).await?;
    Ok(ReplayResponse::new(&response, ctx.aborted_by()))
}

/// Text of one raw input line, without its line terminator.
///
/// Bytes that are not UTF-8 are a stream error for that line only.
fn decode_line(raw: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    Ok(text.trim())
}

/// Replay every line of `reader`, writing one JSON line per request to `writer`.
///
/// Only I/O errors on the streams themselves stop the run.
pub async fn run<T, R, W>(
    chain: &FilterChain,
    target: &T,
    mut reader: R,
    mut writer: W,
) -> io::Result<ReplayStats>
where
    T: Target + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = ReplayStats::default();
    let mut raw = Vec::new();
    let mut line_no = 0u64;

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            break;
        }
        line_no += 1;

        let result = match decode_line(&raw) {
            Ok("") => continue,
            Ok(line) => replay_line(chain, target, line).await,
            Err(e) => Err(e),
        };
        stats.lines += 1;

        let encoded = match result {
            Ok(res) => {
                stats.ok += 1;
                serde_json::to_vec(&res)
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(line = line_no, error = %e, "replay failed");
                serde_json::to_vec(&ReplayFailure {
                    line: line_no,
                    error: e.to_string(),
                })
            }
        }
        .map_err(io::Error::from)?;

        writer.write_all(&encoded).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;

    tracing::debug!(
        lines = stats.lines,
        ok = stats.ok,
        failed = stats.failed,
        "replay finished"
    );

    Ok(stats)
}
