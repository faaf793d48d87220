use std::{collections::BTreeMap, convert::TryFrom, path::PathBuf};

use http::{
    header::{HeaderName, HeaderValue},
    HeaderMap, Method,
};
use serde::Serialize;
use url::Url;

use crate::{InputError, Result};

/// An outgoing request, consumed by [`Transport::execute`](crate::Transport::execute).
///
/// Builder errors (an invalid header, an unserializable query) are kept and
/// reported when the request is executed.
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) cookies: BTreeMap<String, String>,
    pub(crate) form: Vec<(String, String)>,
    pub(crate) files: Vec<PathBuf>,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) error: Option<InputError>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Request {
            method,
            url,
            headers: HeaderMap::new(),
            cookies: BTreeMap::new(),
            form: Vec::new(),
            files: Vec::new(),
            body: None,
            error: None,
        }
    }

    /// Parse `uri` and the method name (case-insensitive).
    ///
    /// Any syntactically valid method is accepted here; the transport decides
    /// which ones it executes.
    pub fn simple(uri: &str, method: &str) -> Result<Self> {
        let url = Url::parse(uri).map_err(|e| InputError::InvalidUrl(uri.to_string(), e))?;
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| InputError::UnsupportedMethod(method.to_string()))?;
        Ok(Request::new(method, url))
    }

    /// Add a header, keeping values already set under the same name.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        if self.error.is_some() {
            return self;
        }
        match (HeaderName::try_from(key), HeaderValue::try_from(value)) {
            (Ok(key), Ok(value)) => {
                self.headers.append(key, value);
            }
            (Err(e), _) => {
                let e: http::Error = e.into();
                self.error = Some(InputError::InvalidHeader(e.to_string()));
            }
            (_, Err(e)) => {
                let e: http::Error = e.into();
                self.error = Some(InputError::InvalidHeader(e.to_string()));
            }
        }
        self
    }

    /// Merge a set of headers; each name given replaces the values set so far.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut prev_name: Option<HeaderName> = None;
        for (key, value) in headers {
            match key {
                Some(key) => {
                    self.headers.insert(key.clone(), value);
                    prev_name = Some(key);
                }
                None => {
                    if let Some(ref key) = prev_name {
                        self.headers.append(key, value);
                    }
                }
            }
        }
        self
    }

    /// Modify the query string of the URL.
    ///
    /// Parameters are appended: calling `.query(&[("foo", "a"), ("foo", "b")])`
    /// gives `"foo=a&foo=b"`.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        {
            let mut pairs = self.url.query_pairs_mut();
            let serializer = serde_urlencoded::Serializer::new(&mut pairs);
            if let Err(e) = query.serialize(serializer) {
                if self.error.is_none() {
                    self.error = Some(InputError::InvalidQuery(e.to_string()));
                }
            }
        }
        if let Some("") = self.url.query() {
            self.url.set_query(None);
        }
        self
    }

    /// Send a cookie with this request only. It wins over a jar cookie with
    /// the same name.
    pub fn cookie<TName, TValue>(mut self, name: TName, value: TValue) -> Self
    where
        TName: Into<String>,
        TValue: Into<String>,
    {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Add form fields, form-encoded as the POST body when no raw body is set.
    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a file. Not supported for PUT.
    pub fn file<T: Into<PathBuf>>(mut self, path: T) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn body<T: Into<Vec<u8>>>(self, body: T) -> Self {
        Request {
            body: Some(body.into()),
            ..self
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers_ref(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn form_fields(&self) -> &[(String, String)] {
        &self.form
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn body_ref(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}
