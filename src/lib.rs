/*!
oauth1-transport: a cookie-aware blocking HTTP transport with an OAuth 1.0a consumer.

# Overview

This library sends requests through a [`Transport`] that keeps a
[`CookieStore`] across calls and reassembles every response from streamed
header lines and body chunks. On top of it, [`Consumer`] drives the OAuth 1.0a
three-legged handshake: it signs parameter sets with HMAC-SHA1, fetches the
request token, builds the user authorization URL and exchanges the verifier
for the access token.

Everything is synchronous; the wire is handled by [`ReqwestEngine`] (blocking
`reqwest`), and any other [`Engine`] can be plugged in.

# How to use

## Basic usecase 1 - acquiring the access token

```no_run
use std::io;
use oauth1_transport::{Consumer, OAuthConfig, Parameters};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let config = OAuthConfig::new()
    .request_token_url("https://api.example.com/oauth/request_token")
    .access_token_url("https://api.example.com/oauth/access_token")
    .authorize_url("https://api.example.com/oauth/authorize")
    .consumer("[CONSUMER_KEY]", "[CONSUMER_SECRET]")
    .realm("https://api.example.com/");

let mut consumer = Consumer::new(config)?;

// step 1: acquire the request token
consumer.request_token(&Parameters::new())?;

// step 2: let the user authorize it and read the verifier
println!("please access to: {}", consumer.auth_redirect_url()?);
println!("input pin: ");
let mut user_input = String::new();
io::stdin().read_line(&mut user_input)?;

let oauth_token = consumer.get_request_token().map(|t| t.token().to_string());
let mut auth_data = Parameters::new();
auth_data.insert("oauth_token".into(), oauth_token.unwrap_or_default());
auth_data.insert("oauth_verifier".into(), user_input.trim().into());

// step 3: exchange it for the access token
let token = consumer.access_token(&auth_data)?;
println!(
    "your token and secret is: \n token: {}\n secret: {}",
    token.token(),
    token.token_secret()
);
println!("other attributes: {:#?}", token.additional_params());
# Ok(())
# }
```

## Basic usecase 2 - plain requests with cookies

```no_run
use oauth1_transport::{Request, Transport};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut transport = Transport::new()?;
let login = Request::simple("https://example.com/login", "POST")?
    .form(vec![("user", "name"), ("password", "secret")]);
transport.execute(login)?;

// cookies set by the login response are sent along
let page = transport.execute(Request::simple("https://example.com/home", "GET")?)?;
println!("{}", page.text());
# Ok(())
# }
```
*/
mod collector;
mod config;
mod consumer;
mod cookie_jar;
mod engine;
mod error;
mod request;
mod response;
mod secrets;
mod signer;
#[cfg(test)]
mod test_engine;
mod token;
mod transport;

// exposed to external program
pub use collector::{BodyCollector, HeaderCollector, ResponseCollector, ResponseSink, StatusLine};
pub use config::{
    OAuthConfig, RequestMethod, RequestScheme, SignatureMethod, OAUTH_VERSION, OUT_OF_BAND,
    REQUIRED_OPTIONS,
};
pub use consumer::Consumer;
pub use cookie_jar::{split_set_cookie, Cookie, CookieStore};
pub use engine::{ReqwestEngine, TransportOptions};
pub use error::{
    ConfigError, CookieParseError, Error, InputError, ProtocolError, ProtocolResult, Result,
    SignError, SignResult, TransportError,
};
pub use request::Request;
pub use response::Response;
pub use secrets::{Secrets, SecretsProvider};
pub use signer::{
    assemble_key, construct_request_url, create_auth_header, create_base_string,
    create_base_string_from_pairs, encode, generate_nonce, generate_timestamp,
    normalize_parameter_pairs, normalize_request_parameters, sign, sign_pairs, Parameters, Signer,
};
pub use token::Token;
pub use transport::{Engine, SpooledBody, Transport, WireBody, WireRequest};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_callback_confirmed`.
pub const OAUTH_CALLBACK_CONFIRMED_KEY: &str = "oauth_callback_confirmed";
/// Represents `oauth_consumer_key`.
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_signature`.
pub const OAUTH_SIGNATURE_KEY: &str = "oauth_signature";
/// Represents `oauth_signature_method`.
pub const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_token_secret`.
pub const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";
