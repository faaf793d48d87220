//! Cookie storage keyed by domain, path and name.
//!
//! The jar is fed from `Set-Cookie` response headers and queried for the
//! cookies to send with the next request. Matching follows the classic
//! rules: the stored domain must be a dot-suffix of the request host and the
//! stored path a prefix of the request path. A cookie stored **without** a
//! domain matches every host; callers seeding cookies by hand should always
//! give one.
//!
//! Expired cookies are purged lazily before every read. Session cookies (no
//! expiry) live as long as the jar.
//!
//! The jar is not synchronized; share it across threads behind a lock.

use std::collections::BTreeMap;

use cookie::Cookie as SetCookie;
use percent_encoding::percent_decode_str;
use time::OffsetDateTime;
use tracing::debug;
use url::Url;

use crate::CookieParseError;

/// A single cookie. Replace it to change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    domain: String,
    path: String,
    expires_at: Option<OffsetDateTime>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    /// A session cookie valid for every path of every domain.
    pub fn new<TName, TValue>(name: TName, value: TValue) -> Self
    where
        TName: Into<String>,
        TValue: Into<String>,
    {
        Cookie {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: String::from("/"),
            expires_at: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn domain<T: Into<String>>(self, domain: T) -> Self {
        Cookie {
            domain: domain.into(),
            ..self
        }
    }

    pub fn path<T: Into<String>>(self, path: T) -> Self {
        Cookie {
            path: path.into(),
            ..self
        }
    }

    pub fn expires_at(self, expires_at: OffsetDateTime) -> Self {
        Cookie {
            expires_at: Some(expires_at),
            ..self
        }
    }

    pub fn secure(self, secure: bool) -> Self {
        Cookie { secure, ..self }
    }

    pub fn http_only(self, http_only: bool) -> Self {
        Cookie { http_only, ..self }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_value(&self) -> &str {
        &self.value
    }

    pub fn get_domain(&self) -> &str {
        &self.domain
    }

    pub fn get_path(&self) -> &str {
        &self.path
    }

    pub fn get_expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    pub fn is_session(&self) -> bool {
        self.expires_at.is_none()
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at < now)
    }

    /// Parse one cookie of a `Set-Cookie` header value.
    ///
    /// Without a `Domain`/`Path` attribute, the host of `base` and the
    /// directory of its path are used. `Secure` is honoured only when `base`
    /// is `https`. Name and value are URL-decoded.
    pub fn parse_set_cookie(cookie: &str, base: Option<&Url>) -> Result<Self, CookieParseError> {
        let pair = cookie.split(';').next().unwrap_or_default();
        if !pair.contains('=') {
            return Err(CookieParseError::MissingPair(pair.to_string()));
        }
        let parsed = SetCookie::parse(cookie)
            .map_err(|_| CookieParseError::Malformed(cookie.to_string()))?;

        let (default_domain, default_path) = match base {
            Some(base) => (
                base.host_str().unwrap_or_default().to_string(),
                default_path(base.path()),
            ),
            None => (String::new(), String::from("/")),
        };
        let secure_origin = base.map_or(false, |base| base.scheme() == "https");

        Ok(Cookie {
            name: url_decode(parsed.name()),
            value: url_decode(parsed.value()),
            domain: parsed
                .domain()
                .map(str::to_string)
                .unwrap_or(default_domain),
            path: parsed.path().map(str::to_string).unwrap_or(default_path),
            // the epoch itself marks a session cookie
            expires_at: parsed
                .expires()
                .and_then(|e| e.datetime())
                .filter(|t| t.unix_timestamp() > 0),
            secure: secure_origin && parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
        })
    }

    fn matches_domain(&self, domain: &str) -> bool {
        if self.domain.is_empty() {
            return true;
        }
        let cookie_domain = format!(".{}", self.domain.trim_start_matches('.')).to_ascii_lowercase();
        format!(".{}", domain)
            .to_ascii_lowercase()
            .ends_with(&cookie_domain)
    }

    fn matches_path(&self, path: &str) -> bool {
        path.starts_with(&self.path)
    }
}

fn default_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => String::from("/"),
        Some(idx) => path[..idx].to_string(),
    }
}

fn url_decode(value: &str) -> String {
    percent_decode_str(&value.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// Whether a comma-separated fragment opens a new cookie (`token=`).
fn starts_cookie_pair(fragment: &str) -> bool {
    let fragment = fragment.trim_start();
    let token_len = fragment
        .find(|c: char| !is_token_char(c))
        .unwrap_or(fragment.len());
    token_len > 0 && fragment[token_len..].starts_with('=')
}

/// Split a `Set-Cookie` value that may fold several cookies together.
///
/// Commas inside `Expires` dates are not separators: a fragment that does not
/// start with `token=` is glued back to the previous one.
pub fn split_set_cookie(value: &str) -> Vec<String> {
    let mut cookies: Vec<String> = Vec::new();
    for (i, part) in value.split(',').enumerate() {
        match cookies.last_mut() {
            Some(last) if i > 0 && !starts_cookie_pair(part) => {
                last.push(',');
                last.push_str(part);
            }
            _ => cookies.push(part.trim_start().to_string()),
        }
    }
    cookies
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CookieKey {
    domain: String,
    path: String,
    name: String,
}

/// Cookie jar. At most one cookie per `(domain, path, name)`.
#[derive(Debug, Clone, Default)]
pub struct CookieStore {
    cookies: BTreeMap<CookieKey, Cookie>,
}

impl CookieStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// Insert the cookie, replacing one with the same domain, path and name.
    pub fn set(&mut self, cookie: Cookie) {
        let key = CookieKey {
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            name: cookie.name.clone(),
        };
        self.cookies.insert(key, cookie);
    }

    /// First unexpired cookie named `name` that matches `domain` and `path`.
    pub fn get(&mut self, name: &str, domain: &str, path: &str) -> Option<&Cookie> {
        self.purge_expired();
        self.cookies
            .values()
            .filter(|cookie| cookie.name == name)
            .find(|cookie| cookie.matches_domain(domain) && cookie.matches_path(path))
    }

    /// Unexpired cookies to send to `uri`, one per name.
    ///
    /// Secure cookies are only returned for `https`. When several cookies
    /// with one name match, the last in store order wins.
    pub fn all_matching(&mut self, uri: &Url) -> Vec<Cookie> {
        self.purge_expired();
        let host = uri.host_str().unwrap_or_default();
        let path = match uri.path() {
            "" => "/",
            path => path,
        };
        let https = uri.scheme() == "https";

        let mut matched: BTreeMap<&str, &Cookie> = BTreeMap::new();
        for cookie in self.cookies.values() {
            if !cookie.matches_domain(host) || !cookie.matches_path(path) {
                continue;
            }
            if cookie.secure && !https {
                continue;
            }
            matched.insert(&cookie.name, cookie);
        }
        matched.into_values().cloned().collect()
    }

    /// Every unexpired cookie regardless of domain.
    pub fn all(&mut self) -> Vec<Cookie> {
        self.purge_expired();
        self.cookies.values().cloned().collect()
    }

    pub fn purge_expired(&mut self) {
        self.purge_expired_at(OffsetDateTime::now_utc());
    }

    /// Remove cookies that expired before `now`. Session cookies stay.
    pub fn purge_expired_at(&mut self, now: OffsetDateTime) {
        self.cookies.retain(|_, cookie| !cookie.is_expired(now));
    }

    /// Store the cookies of `Set-Cookie` header values received from `base`.
    ///
    /// Unparsable cookies are skipped. Returns how many cookies were stored.
    pub fn ingest<I, S>(&mut self, set_cookies: I, base: &Url) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stored = 0;
        for value in set_cookies {
            for raw in split_set_cookie(value.as_ref()) {
                match Cookie::parse_set_cookie(&raw, Some(base)) {
                    Ok(cookie) => {
                        self.set(cookie);
                        stored += 1;
                    }
                    Err(err) => debug!(%err, "ignoring invalid cookie"),
                }
            }
        }
        stored
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
