use thiserror::Error;

use crate::SignatureMethod;

pub type Result<T> = std::result::Result<T, Error>;
pub type SignResult<T> = std::result::Result<T, SignError>;
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration : {0}")]
    Config(#[from] ConfigError),
    #[error("token acquisition failed : {0}")]
    Protocol(#[from] ProtocolError),
    #[error("OAuth sign failed : {0}")]
    Signer(#[from] SignError),
    #[error("request failed : {0}")]
    Transport(#[from] TransportError),
    #[error("invalid input : {0}")]
    Input(#[from] InputError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the OAuth consumer configuration is not valid, the following options must be set: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("unsupported signature method {0}, only HMAC-SHA1, RSA-SHA1, PLAINTEXT are supported")]
    UnsupportedSignatureMethod(String),
    #[error("unsupported request scheme {0}, only HEADER, POSTBODY, QUERY are supported")]
    UnsupportedRequestScheme(String),
    #[error("invalid request method {0}, only GET, POST are supported")]
    UnsupportedRequestMethod(String),
    #[error("cannot use the POSTBODY request scheme in conjunction with a GET request method")]
    PostBodyWithGet,
    #[error("option {0} is not a valid URL : {1}")]
    InvalidUrl(&'static str, url::ParseError),
    #[error("a valid request token was not found")]
    NoRequestToken,
    #[error("no access token has been obtained yet")]
    NoAccessToken,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("the service provider responded: {status} {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("unable to parse token response: {0:?}")]
    EmptyResponse(String),
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("{0} currently not a supported signature method")]
    Unimplemented(SignatureMethod),
    #[error("invalid signature method provided : {0}")]
    UnknownMethod(String),
    #[error("missing oauth parameter : {0}")]
    MissingParameter(&'static str),
    #[error("signing key rejected")]
    InvalidKey,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("i/o failure : {0}")]
    Io(#[from] std::io::Error),
    #[error("response did not start with a status line")]
    MissingStatusLine,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("unsupported request method {0} specified, only GET, POST, PUT, DELETE, OPTIONS, HEAD are allowed")]
    UnsupportedMethod(String),
    #[error("PUT file handling via attached files is not supported")]
    PutWithFiles,
    #[error("authorization data must contain a non-empty {0}")]
    MissingAuthData(&'static str),
    #[error("invalid header {0}")]
    InvalidHeader(String),
    #[error("query could not be serialized : {0}")]
    InvalidQuery(String),
    #[error("invalid URL {0} : {1}")]
    InvalidUrl(String, url::ParseError),
}

/// Per-cookie failure; [`crate::CookieStore::ingest`] drops such cookies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CookieParseError {
    #[error("the cookie string {0:?} is not valid")]
    MissingPair(String),
    #[error("the cookie string {0:?} could not be parsed")]
    Malformed(String),
}
