use std::{convert::TryFrom, fmt, str::FromStr};

use serde::Deserialize;
use url::Url;

use crate::{ConfigError, SecretsProvider};

/// Value of `oauth_callback` meaning out-of-band.
pub const OUT_OF_BAND: &str = "oob";
/// The only OAuth version this consumer speaks.
pub const OAUTH_VERSION: &str = "1.0";

/// Options that must be set before the consumer sends anything.
pub const REQUIRED_OPTIONS: [&str; 6] = [
    "requestTokenUrl",
    "accessTokenUrl",
    "authorizeUrl",
    "consumerKey",
    "consumerSecret",
    "realm",
];

/// Signature methods recognized by OAuth 1.0a. Only `HMAC-SHA1` can sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SignatureMethod {
    HmacSha1,
    RsaSha1,
    Plaintext,
}

impl SignatureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::RsaSha1 => "RSA-SHA1",
            SignatureMethod::Plaintext => "PLAINTEXT",
        }
    }
}

impl Default for SignatureMethod {
    fn default() -> Self {
        SignatureMethod::HmacSha1
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HMAC-SHA1" => Ok(SignatureMethod::HmacSha1),
            "RSA-SHA1" => Ok(SignatureMethod::RsaSha1),
            "PLAINTEXT" => Ok(SignatureMethod::Plaintext),
            _ => Err(ConfigError::UnsupportedSignatureMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for SignatureMethod {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Where the oauth parameters travel, per OAuth 1.0a section 5.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum RequestScheme {
    /// `Authorization: OAuth ...` header (preferred).
    Header,
    /// Form-encoded request body. Requires `POST`.
    PostBody,
    /// URL query string.
    Query,
}

impl Default for RequestScheme {
    fn default() -> Self {
        RequestScheme::Header
    }
}

impl FromStr for RequestScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HEADER" => Ok(RequestScheme::Header),
            "POSTBODY" => Ok(RequestScheme::PostBody),
            "QUERY" => Ok(RequestScheme::Query),
            _ => Err(ConfigError::UnsupportedRequestScheme(s.to_string())),
        }
    }
}

impl TryFrom<String> for RequestScheme {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// HTTP method used against the token endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
        }
    }

    pub fn to_http(self) -> http::Method {
        match self {
            RequestMethod::Get => http::Method::GET,
            RequestMethod::Post => http::Method::POST,
        }
    }
}

impl Default for RequestMethod {
    fn default() -> Self {
        RequestMethod::Post
    }
}

impl FromStr for RequestMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(RequestMethod::Get),
            "POST" => Ok(RequestMethod::Post),
            _ => Err(ConfigError::UnsupportedRequestMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for RequestMethod {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// OAuth consumer configuration.
///
/// The required options are listed in [`REQUIRED_OPTIONS`]; a configuration
/// missing any of them can be built, but [`OAuthConfig::is_valid`] is `false`
/// and the consumer refuses to send requests with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct OAuthConfig {
    signature_method: SignatureMethod,
    request_scheme: RequestScheme,
    request_method: RequestMethod,
    callback_url: Option<String>,
    request_token_url: Option<String>,
    access_token_url: Option<String>,
    authorize_url: Option<String>,
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    realm: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    signature_method: Option<SignatureMethod>,
    request_scheme: Option<RequestScheme>,
    request_method: Option<RequestMethod>,
    callback_url: Option<String>,
    request_token_url: Option<String>,
    access_token_url: Option<String>,
    authorize_url: Option<String>,
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    realm: Option<String>,
}

impl TryFrom<RawConfig> for OAuthConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let config = OAuthConfig {
            signature_method: raw.signature_method.unwrap_or_default(),
            request_scheme: raw.request_scheme.unwrap_or_default(),
            request_method: raw.request_method.unwrap_or_default(),
            callback_url: raw.callback_url,
            request_token_url: raw.request_token_url,
            access_token_url: raw.access_token_url,
            authorize_url: raw.authorize_url,
            consumer_key: raw.consumer_key,
            consumer_secret: raw.consumer_secret,
            realm: raw.realm,
        };
        config.check_scheme()?;
        Ok(config)
    }
}

impl OAuthConfig {
    pub fn new() -> Self {
        Default::default()
    }

    /// Build a configuration from a flat key/value map using the camelCase
    /// option names (`requestTokenUrl`, `consumerKey`, ...).
    ///
    /// Unknown keys are ignored.
    pub fn from_map<I, K, V>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = RawConfig::default();
        for (key, value) in options {
            let value = value.into();
            match key.as_ref() {
                "signatureMethod" => raw.signature_method = Some(value.parse()?),
                "requestScheme" => raw.request_scheme = Some(value.parse()?),
                "requestMethod" => raw.request_method = Some(value.parse()?),
                "callbackUrl" => raw.callback_url = Some(value),
                "requestTokenUrl" => raw.request_token_url = Some(value),
                "accessTokenUrl" => raw.access_token_url = Some(value),
                "authorizeUrl" => raw.authorize_url = Some(value),
                "consumerKey" => raw.consumer_key = Some(value),
                "consumerSecret" => raw.consumer_secret = Some(value),
                "realm" => raw.realm = Some(value),
                _ => {}
            }
        }
        OAuthConfig::try_from(raw)
    }

    // ------------------------------------------------------------------------
    // Builder

    pub fn signature_method(self, signature_method: SignatureMethod) -> Self {
        OAuthConfig {
            signature_method,
            ..self
        }
    }

    /// Set the request scheme.
    ///
    /// `POSTBODY` together with a `GET` request method is rejected by
    /// [`OAuthConfig::check_scheme`], which the consumer calls on construction.
    pub fn request_scheme(self, request_scheme: RequestScheme) -> Self {
        OAuthConfig {
            request_scheme,
            ..self
        }
    }

    pub fn request_method(self, request_method: RequestMethod) -> Self {
        OAuthConfig {
            request_method,
            ..self
        }
    }

    pub fn callback_url<T: Into<String>>(self, url: T) -> Self {
        OAuthConfig {
            callback_url: Some(url.into()),
            ..self
        }
    }

    pub fn request_token_url<T: Into<String>>(self, url: T) -> Self {
        OAuthConfig {
            request_token_url: Some(url.into()),
            ..self
        }
    }

    pub fn access_token_url<T: Into<String>>(self, url: T) -> Self {
        OAuthConfig {
            access_token_url: Some(url.into()),
            ..self
        }
    }

    pub fn authorize_url<T: Into<String>>(self, url: T) -> Self {
        OAuthConfig {
            authorize_url: Some(url.into()),
            ..self
        }
    }

    pub fn consumer<TKey, TSecret>(self, key: TKey, secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        OAuthConfig {
            consumer_key: Some(key.into()),
            consumer_secret: Some(secret.into()),
            ..self
        }
    }

    pub fn realm<T: Into<String>>(self, realm: T) -> Self {
        OAuthConfig {
            realm: Some(realm.into()),
            ..self
        }
    }

    // ------------------------------------------------------------------------
    // Validation

    /// `true` iff every option in [`REQUIRED_OPTIONS`] is set.
    pub fn is_valid(&self) -> bool {
        self.missing_options().is_empty()
    }

    /// Names of the required options that are not set, in declaration order.
    pub fn missing_options(&self) -> Vec<&'static str> {
        let values = [
            &self.request_token_url,
            &self.access_token_url,
            &self.authorize_url,
            &self.consumer_key,
            &self.consumer_secret,
            &self.realm,
        ];
        REQUIRED_OPTIONS
            .iter()
            .zip(values.iter())
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        let missing = self.missing_options();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingFields(missing))
        }
    }

    pub fn check_scheme(&self) -> Result<(), ConfigError> {
        if self.request_scheme == RequestScheme::PostBody
            && self.request_method == RequestMethod::Get
        {
            return Err(ConfigError::PostBodyWithGet);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Getters

    pub fn get_signature_method(&self) -> SignatureMethod {
        self.signature_method
    }

    pub fn get_request_scheme(&self) -> RequestScheme {
        self.request_scheme
    }

    pub fn get_request_method(&self) -> RequestMethod {
        self.request_method
    }

    pub fn get_version(&self) -> &'static str {
        OAUTH_VERSION
    }

    /// The callback URL, or `"oob"` when none is configured.
    pub fn get_callback_url(&self) -> &str {
        self.callback_url.as_deref().unwrap_or(OUT_OF_BAND)
    }

    pub fn get_request_token_url(&self) -> Option<&str> {
        self.request_token_url.as_deref()
    }

    pub fn get_access_token_url(&self) -> Option<&str> {
        self.access_token_url.as_deref()
    }

    pub fn get_authorize_url(&self) -> Option<&str> {
        self.authorize_url.as_deref()
    }

    pub fn get_consumer_key(&self) -> Option<&str> {
        self.consumer_key.as_deref()
    }

    pub fn get_consumer_secret(&self) -> Option<&str> {
        self.consumer_secret.as_deref()
    }

    pub fn get_realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    pub(crate) fn parse_url(
        name: &'static str,
        value: Option<&str>,
    ) -> Result<Url, ConfigError> {
        let value = value.ok_or_else(|| ConfigError::MissingFields(vec![name]))?;
        Url::parse(value).map_err(|e| ConfigError::InvalidUrl(name, e))
    }
}

impl SecretsProvider for OAuthConfig {
    fn get_consumer_key_pair(&self) -> (&str, &str) {
        (
            self.consumer_key.as_deref().unwrap_or_default(),
            self.consumer_secret.as_deref().unwrap_or_default(),
        )
    }

    fn get_token_pair_option(&self) -> Option<(&str, &str)> {
        None
    }
}
