//! Incremental assembly of a [`Response`] from streamed header lines and
//! body chunks.
//!
//! An [`Engine`](crate::Engine) drives a [`ResponseSink`]: first the status
//! line and header lines (one call per line, CRLF optional), then body chunks
//! as they arrive. [`ResponseCollector::finish`] then yields the response and
//! leaves the collector empty for the next request.

use std::mem;

use http::{
    header::{HeaderName, HeaderValue},
    HeaderMap,
};
use tracing::debug;

use crate::{Response, TransportError};

/// Receiver of a response as it streams in.
pub trait ResponseSink {
    fn on_header_line(&mut self, line: &str);

    fn on_body_chunk(&mut self, chunk: &[u8]);
}

/// `HTTP/1.1 200 OK`, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub protocol_version: String,
    pub status_code: u16,
    pub reason_phrase: String,
}

impl StatusLine {
    /// Parse a status line. The reason phrase may be empty or contain spaces.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (version, rest) = match line.split_once(' ') {
            Some((version, rest)) => (version, rest.trim_start()),
            None => (line, ""),
        };
        let protocol = version.get(..5)?;
        if !protocol.eq_ignore_ascii_case("http/") {
            return None;
        }
        let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
        let status_code = code.parse::<u16>().ok()?;
        Some(StatusLine {
            protocol_version: version[5..].to_string(),
            status_code,
            reason_phrase: reason.to_string(),
        })
    }
}

/// Accumulates the status line and header lines of one response.
#[derive(Debug, Default)]
pub struct HeaderCollector {
    status: Option<StatusLine>,
    headers: HeaderMap,
}

impl HeaderCollector {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn process(&mut self, line: &str) {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return;
        }
        let is_status = line
            .get(..5)
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case("http/"));
        if is_status {
            if let Some(status) = StatusLine::parse(line) {
                // interim (1xx) or proxy responses precede the final one
                self.headers.clear();
                self.status = Some(status);
                return;
            }
        }
        match line.split_once(':') {
            Some((name, value)) => {
                match (
                    HeaderName::from_bytes(name.trim().as_bytes()),
                    HeaderValue::from_str(value.trim()),
                ) {
                    (Ok(name), Ok(value)) => {
                        self.headers.append(name, value);
                    }
                    _ => debug!(line, "dropping malformed response header"),
                }
            }
            None => debug!(line, "dropping response header line without a colon"),
        }
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn reset(&mut self) {
        self.status = None;
        self.headers.clear();
    }
}

/// Accumulates body chunks of one response.
#[derive(Debug, Default)]
pub struct BodyCollector {
    content: Vec<u8>,
}

impl BodyCollector {
    pub fn new() -> Self {
        Default::default()
    }

    /// Append a chunk and report how many bytes were consumed.
    pub fn process(&mut self, chunk: &[u8]) -> usize {
        self.content.extend_from_slice(chunk);
        chunk.len()
    }

    pub fn get(&self) -> &[u8] {
        &self.content
    }

    pub fn reset(&mut self) {
        self.content.clear();
    }
}

/// Header and body collectors driven together.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    headers: HeaderCollector,
    body: BodyCollector,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Default::default()
    }

    /// Produce the collected response and reset both collectors.
    pub fn finish(&mut self) -> Result<Response, TransportError> {
        let status = self.headers.status.take();
        let headers = mem::take(&mut self.headers.headers);
        let body = mem::take(&mut self.body.content);
        let status = status.ok_or(TransportError::MissingStatusLine)?;
        Ok(Response::new(
            status.status_code,
            status.reason_phrase,
            status.protocol_version,
            headers,
            body,
        ))
    }

    pub fn reset(&mut self) {
        self.headers.reset();
        self.body.reset();
    }

    pub fn is_empty(&self) -> bool {
        self.headers.status.is_none()
            && self.headers.headers.is_empty()
            && self.body.content.is_empty()
    }
}

impl ResponseSink for ResponseCollector {
    fn on_header_line(&mut self, line: &str) {
        self.headers.process(line);
    }

    fn on_body_chunk(&mut self, chunk: &[u8]) {
        self.body.process(chunk);
    }
}
