//! Scripted [`Engine`] for tests: replays canned responses in order and
//! records every wire request it receives.

use std::{
    collections::VecDeque,
    io::{self, Read},
};

use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::{Engine, ResponseSink, TransportError, WireBody, WireRequest};

#[derive(Debug)]
enum Reply {
    Lines { lines: Vec<String>, body: Vec<u8> },
    Fail,
}

/// A wire request as the engine saw it, with the body read out.
#[derive(Debug)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub port: Option<u16>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub spooled: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedEngine {
    replies: VecDeque<Reply>,
    pub requests: Vec<RecordedRequest>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Default::default()
    }

    /// Queue a response with a status line built from `status`.
    pub fn reply(self, status: u16, headers: &[(&str, &str)], body: &str) -> Self {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");
        let mut lines = vec![format!("HTTP/1.1 {} {}\r\n", status, reason)];
        lines.extend(
            headers
                .iter()
                .map(|(name, value)| format!("{}: {}\r\n", name, value)),
        );
        self.push(lines, body)
    }

    /// Queue raw header lines, status line included or not.
    pub fn reply_lines(self, lines: &[&str], body: &str) -> Self {
        let lines = lines.iter().map(|line| format!("{}\r\n", line)).collect();
        self.push(lines, body)
    }

    /// Queue an engine-level failure.
    pub fn fail(mut self) -> Self {
        self.replies.push_back(Reply::Fail);
        self
    }

    fn push(mut self, mut lines: Vec<String>, body: &str) -> Self {
        lines.push("\r\n".to_string());
        self.replies.push_back(Reply::Lines {
            lines,
            body: body.as_bytes().to_vec(),
        });
        self
    }
}

impl Engine for ScriptedEngine {
    fn perform(
        &mut self,
        request: WireRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), TransportError> {
        let WireRequest {
            method,
            url,
            port,
            headers,
            body,
        } = request;
        let (body, spooled) = match body {
            WireBody::Empty => (Vec::new(), false),
            WireBody::Bytes(bytes) => (bytes, false),
            WireBody::Spooled(spooled) => {
                let mut content = Vec::new();
                spooled.into_file().read_to_end(&mut content)?;
                (content, true)
            }
        };
        self.requests.push(RecordedRequest {
            method,
            url,
            port,
            headers,
            body,
            spooled,
        });

        match self.replies.pop_front() {
            Some(Reply::Lines { lines, body }) => {
                for line in &lines {
                    sink.on_header_line(line);
                }
                for chunk in body.chunks(4) {
                    sink.on_body_chunk(chunk);
                }
                Ok(())
            }
            Some(Reply::Fail) | None => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted failure",
            ))),
        }
    }
}
