//! Request execution.
//!
//! [`Transport::execute`] turns a [`Request`] into an immutable
//! [`WireRequest`], hands it to an [`Engine`] together with a
//! [`ResponseCollector`], and assembles the collected [`Response`]. Cookies
//! flow both ways through the transport's [`CookieStore`].

use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, Seek, SeekFrom, Write},
};

use http::{
    header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue, Method,
};
use tracing::{debug, info};
use url::{form_urlencoded, Url};

use crate::{
    construct_request_url, Cookie, CookieStore, InputError, ReqwestEngine, Request, Response, ResponseCollector,
    ResponseSink, Result, TransportError, TransportOptions,
};

const SUPPORTED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
    Method::HEAD,
];

/// Performs a wire request, streaming the response into a sink.
///
/// Implementations feed the status line first, then one call per header line,
/// then the body in chunks. A failure must be reported as an error; the
/// transport never fabricates a response.
pub trait Engine {
    fn perform(
        &mut self,
        request: WireRequest,
        sink: &mut dyn ResponseSink,
    ) -> std::result::Result<(), TransportError>;
}

/// Everything an engine needs for one call. Built fresh per request.
#[derive(Debug)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub port: Option<u16>,
    pub headers: HeaderMap,
    pub body: WireBody,
}

#[derive(Debug)]
pub enum WireBody {
    Empty,
    Bytes(Vec<u8>),
    /// PUT content streamed from a temporary file.
    Spooled(SpooledBody),
}

/// Request content spooled to an anonymous temporary file.
///
/// The file has no name on disk; it is gone once this value (or the file
/// taken out of it) is dropped.
#[derive(Debug)]
pub struct SpooledBody {
    file: File,
    len: u64,
}

impl SpooledBody {
    pub fn spool(content: &[u8]) -> io::Result<Self> {
        let mut file = tempfile::tempfile()?;
        file.write_all(content)?;
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(SpooledBody {
            file,
            len: content.len() as u64,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The spool file, positioned at its start.
    pub fn into_file(self) -> File {
        self.file
    }
}

/// Cookie-aware HTTP transport. One request in flight at a time.
#[derive(Debug)]
pub struct Transport<E: Engine = ReqwestEngine> {
    engine: E,
    collector: ResponseCollector,
    cookies: CookieStore,
}

impl Transport<ReqwestEngine> {
    pub fn new() -> Result<Self> {
        Ok(Transport::with_engine(ReqwestEngine::new()?))
    }

    pub fn with_options(options: TransportOptions) -> Result<Self> {
        Ok(Transport::with_engine(ReqwestEngine::with_options(options)?))
    }
}

impl<E: Engine> Transport<E> {
    pub fn with_engine(engine: E) -> Self {
        Transport {
            engine,
            collector: ResponseCollector::new(),
            cookies: CookieStore::new(),
        }
    }

    /// Execute `request` and return the collected response.
    ///
    /// Cookies matching the URL are sent along, and `Set-Cookie` headers of
    /// the response are stored. Supported methods are GET, POST, PUT, DELETE,
    /// OPTIONS and HEAD.
    pub fn execute(&mut self, request: Request) -> Result<Response> {
        let result = self.execute_inner(request);
        self.collector.reset();
        result
    }

    fn execute_inner(&mut self, request: Request) -> Result<Response> {
        let url = request.url.clone();
        let wire = self.configure(request)?;
        info!(
            method = %wire.method,
            url = %construct_request_url(&wire.url),
            "executing request"
        );
        debug!(url = %wire.url, "full request URL");

        self.engine.perform(wire, &mut self.collector)?;

        let mut response = self.collector.finish()?;
        response.normalize_transfer_encoding();
        let set_cookies = response.header_all(SET_COOKIE.as_str());
        if !set_cookies.is_empty() {
            let stored = self.cookies.ingest(set_cookies, &url);
            debug!(stored, "stored response cookies");
        }
        debug!(status = response.status_code(), "request completed");
        Ok(response)
    }

    fn configure(&mut self, request: Request) -> Result<WireRequest> {
        let Request {
            method,
            url,
            mut headers,
            cookies,
            form,
            files,
            body,
            error,
        } = request;
        if let Some(err) = error {
            return Err(err.into());
        }
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(InputError::UnsupportedMethod(method.to_string()).into());
        }

        if let Some(cookie_header) = self.cookie_header(&url, cookies) {
            let value = HeaderValue::from_str(&cookie_header)
                .map_err(|_| InputError::InvalidHeader(cookie_header.clone()))?;
            headers.append(COOKIE, value);
        }

        let body = if method == Method::POST {
            match body {
                Some(body) => WireBody::Bytes(body),
                None if !form.is_empty() => {
                    headers.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static(
                        "application/x-www-form-urlencoded",
                    ));
                    let encoded = form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(&form)
                        .finish();
                    WireBody::Bytes(encoded.into_bytes())
                }
                None => WireBody::Empty,
            }
        } else if method == Method::PUT {
            if !files.is_empty() {
                return Err(InputError::PutWithFiles.into());
            }
            let content = body.unwrap_or_default();
            WireBody::Spooled(SpooledBody::spool(&content).map_err(TransportError::from)?)
        } else {
            WireBody::Empty
        };

        Ok(WireRequest {
            port: url.port_or_known_default(),
            method,
            url,
            headers,
            body,
        })
    }

    /// `name=value; ...` from the jar and the request's own cookies; the
    /// request's cookies win on a name clash.
    fn cookie_header(&mut self, url: &Url, explicit: BTreeMap<String, String>) -> Option<String> {
        let mut cookies: BTreeMap<String, String> = self
            .cookies
            .all_matching(url)
            .into_iter()
            .map(|cookie| (cookie.get_name().to_string(), cookie.get_value().to_string()))
            .collect();
        cookies.extend(explicit);
        if cookies.is_empty() {
            return None;
        }
        let pairs = cookies
            .iter()
            .map(|(name, value)| format!("{}={}", form_encode(name), form_encode(value)))
            .collect::<Vec<_>>();
        Some(pairs.join("; "))
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut CookieStore {
        &mut self.cookies
    }

    /// Seed the jar with a cookie.
    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.set(cookie);
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

fn form_encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
