use std::io::Read;

use http::Version;
use hyper::ext::ReasonPhrase;
use reqwest::{
    blocking::{Body, Client},
    redirect::Policy,
};

use crate::{Engine, ResponseSink, TransportError, WireBody, WireRequest};

const READ_CHUNK: usize = 8 * 1024;

/// Transport-wide defaults applied to the connection handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    follow_redirects: bool,
    user_agent: Option<String>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Follow `3xx` responses. Off by default: the redirect response itself
    /// is returned.
    pub fn follow_redirects(self, follow_redirects: bool) -> Self {
        TransportOptions {
            follow_redirects,
            ..self
        }
    }

    pub fn user_agent<T: Into<String>>(self, user_agent: T) -> Self {
        TransportOptions {
            user_agent: Some(user_agent.into()),
            ..self
        }
    }
}

/// [`Engine`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestEngine {
    client: Client,
}

impl ReqwestEngine {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_options(TransportOptions::default())
    }

    pub fn with_options(options: TransportOptions) -> Result<Self, TransportError> {
        let redirect = if options.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let mut builder = Client::builder().redirect(redirect);
        if let Some(user_agent) = options.user_agent {
            builder = builder.user_agent(user_agent);
        }
        Ok(ReqwestEngine {
            client: builder.build()?,
        })
    }

    /// Use a preconfigured client as is.
    pub fn from_client(client: Client) -> Self {
        ReqwestEngine { client }
    }
}

impl Engine for ReqwestEngine {
    fn perform(
        &mut self,
        request: WireRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), TransportError> {
        // the port is already part of the URL
        let WireRequest {
            method,
            url,
            headers,
            body,
            ..
        } = request;
        let builder = self.client.request(method, url).headers(headers);
        let builder = match body {
            WireBody::Empty => builder,
            WireBody::Bytes(bytes) => builder.body(bytes),
            WireBody::Spooled(spooled) => {
                let len = spooled.len();
                builder.body(Body::sized(spooled.into_file(), len))
            }
        };
        let mut response = builder.send()?;

        let status = response.status();
        // hyper only keeps the wire phrase when it is not the canonical one
        let reason = response
            .extensions()
            .get::<ReasonPhrase>()
            .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
            .or_else(|| status.canonical_reason())
            .unwrap_or("");
        sink.on_header_line(&format!(
            "HTTP/{} {} {}\r\n",
            version_str(response.version()),
            status.as_u16(),
            reason
        ));
        for (name, value) in response.headers() {
            sink.on_header_line(&format!(
                "{}: {}\r\n",
                name,
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        sink.on_header_line("\r\n");

        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let read = response.read(&mut buf)?;
            if read == 0 {
                break;
            }
            sink.on_body_chunk(&buf[..read]);
        }
        Ok(())
    }
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
