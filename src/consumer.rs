//! OAuth 1.0a three-legged flow.
//!
//! ```text
//! Unauthenticated --request_token--> HasRequestToken --access_token--> HasAccessToken
//! ```
//!
//! Both tokens are fetched on first use and cached for the lifetime of the
//! [`Consumer`]; re-authenticating takes a new one.

use http::{header::AUTHORIZATION, HeaderMap, Method};
use tracing::{debug, warn};
use url::Url;

use crate::{
    create_auth_header, generate_nonce, generate_timestamp, normalize_request_parameters,
    sign_pairs, ConfigError, Engine, InputError, OAuthConfig, Parameters, ProtocolError, Request,
    RequestMethod, RequestScheme, ReqwestEngine, Response, Result, Secrets, SecretsProvider,
    Signer, Token, Transport, OAUTH_CALLBACK_KEY, OAUTH_CONSUMER_KEY, OAUTH_NONCE_KEY,
    OAUTH_SIGNATURE_KEY, OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY, OAUTH_TOKEN_KEY,
    OAUTH_VERIFIER_KEY, OAUTH_VERSION_KEY,
};

/// An OAuth 1.0a consumer talking to one service provider.
#[derive(Debug)]
pub struct Consumer<E: Engine = ReqwestEngine> {
    transport: Transport<E>,
    config: OAuthConfig,
    request_token: Option<Token>,
    access_token: Option<Token>,
}

impl Consumer<ReqwestEngine> {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        Consumer::with_transport(Transport::new()?, config)
    }
}

impl<E: Engine> Consumer<E> {
    /// Fails if the configured request scheme cannot be used with the
    /// configured request method.
    pub fn with_transport(transport: Transport<E>, config: OAuthConfig) -> Result<Self> {
        config.check_scheme()?;
        Ok(Consumer {
            transport,
            config,
            request_token: None,
            access_token: None,
        })
    }

    /// Obtain the request token, fetching it on first call.
    ///
    /// `extra` parameters are signed and sent along with the standard ones
    /// and override them on a name clash. Sent with the configured request
    /// method, so a `GET` configuration also makes this a `GET` on the wire.
    pub fn request_token(&mut self, extra: &Parameters) -> Result<&Token> {
        let token = match self.request_token.take() {
            Some(token) => {
                debug!("using cached request token");
                token
            }
            None => self.fetch_request_token(extra)?,
        };
        Ok(&*self.request_token.insert(token))
    }

    /// The URL to send the user to for authorizing the request token.
    pub fn auth_redirect_url(&self) -> Result<String> {
        let token = self
            .request_token
            .as_ref()
            .ok_or(ConfigError::NoRequestToken)?;
        let authorize_url = self
            .config
            .get_authorize_url()
            .ok_or_else(|| ConfigError::MissingFields(vec!["authorizeUrl"]))?;
        let mut params = token.additional_params().clone();
        params.insert(OAUTH_TOKEN_KEY.to_string(), token.token().to_string());
        Ok(format!(
            "{}?{}",
            authorize_url,
            normalize_request_parameters(&params)
        ))
    }

    /// Exchange the authorized request token for the access token.
    ///
    /// `auth_data` holds what the provider handed back to the callback and
    /// must carry a non-empty `oauth_token` and `oauth_verifier`. Once
    /// obtained, the access token is returned as is on later calls.
    ///
    /// Like [`Consumer::request_token`], this is sent with the configured
    /// request method rather than always as `POST`.
    pub fn access_token(&mut self, auth_data: &Parameters) -> Result<&Token> {
        let token = match self.access_token.take() {
            Some(token) => {
                debug!("using cached access token");
                token
            }
            None => self.fetch_access_token(auth_data)?,
        };
        Ok(&*self.access_token.insert(token))
    }

    /// Send an unsigned request through the consumer's transport.
    pub fn send_request(&mut self, uri: &str, headers: HeaderMap, method: &str) -> Result<Response> {
        self.config.ensure_valid()?;
        let request = Request::simple(uri, method)?.headers(headers);
        Ok(self.transport.execute(request)?)
    }

    /// Sign `request` with the access token and send it.
    ///
    /// Query parameters, and form fields of a POST without a raw body, are
    /// part of the signature; a repeated name is signed once per value.
    pub fn send_signed_request(&mut self, request: Request) -> Result<Response> {
        self.config.ensure_valid()?;
        let access_token = self
            .access_token
            .as_ref()
            .ok_or(ConfigError::NoAccessToken)?;

        let mut oauth = self.oauth_parameters();
        oauth.insert(OAUTH_TOKEN_KEY.to_string(), access_token.token().to_string());

        let mut signing: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if request.method() == Method::POST && request.body_ref().is_none() {
            signing.extend(request.form_fields().iter().cloned());
        }
        signing.extend(oauth.iter().map(|(k, v)| (k.clone(), v.clone())));

        let (_, consumer_secret) = self.config.get_consumer_key_pair();
        let signature = sign_pairs(
            &signing,
            request.method().as_str(),
            request.url(),
            consumer_secret,
            Some(access_token.token_secret()),
        )?;
        oauth.insert(OAUTH_SIGNATURE_KEY.to_string(), signature);

        let request = self.authorize(request, &oauth);
        Ok(self.transport.execute(request)?)
    }

    /// `Authorization` header value for already signed `params`.
    pub fn create_auth_header(&self, params: &Parameters) -> String {
        create_auth_header(params, self.config.get_realm())
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn get_request_token(&self) -> Option<&Token> {
        self.request_token.as_ref()
    }

    pub fn get_access_token(&self) -> Option<&Token> {
        self.access_token.as_ref()
    }

    pub fn transport(&self) -> &Transport<E> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<E> {
        &mut self.transport
    }

    fn fetch_request_token(&mut self, extra: &Parameters) -> Result<Token> {
        self.config.ensure_valid()?;
        let url = OAuthConfig::parse_url("requestTokenUrl", self.config.get_request_token_url())?;

        let mut params = self.oauth_parameters();
        params.insert(
            OAUTH_CALLBACK_KEY.to_string(),
            self.config.get_callback_url().to_string(),
        );
        params.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        let method = self.config.get_request_method();
        let signed = Signer::new(&self.config).sign_parameters(params, method.as_str(), &url)?;
        self.fetch_token(method, url, &signed)
    }

    fn fetch_access_token(&mut self, auth_data: &Parameters) -> Result<Token> {
        let oauth_token = required_auth_data(auth_data, OAUTH_TOKEN_KEY)?;
        let verifier = required_auth_data(auth_data, OAUTH_VERIFIER_KEY)?;
        let request_token = self
            .request_token
            .as_ref()
            .ok_or(ConfigError::NoRequestToken)?;
        if request_token.token() != oauth_token {
            warn!(
                expected = request_token.token(),
                received = oauth_token,
                "authorized token differs from the cached request token"
            );
        }
        self.config.ensure_valid()?;
        let url = OAuthConfig::parse_url("accessTokenUrl", self.config.get_access_token_url())?;

        let mut params = self.oauth_parameters();
        params.insert(
            OAUTH_TOKEN_KEY.to_string(),
            request_token.token().to_string(),
        );
        params.insert(OAUTH_VERIFIER_KEY.to_string(), verifier.to_string());

        let method = self.config.get_request_method();
        let signed = {
            let (consumer_key, consumer_secret) = self.config.get_consumer_key_pair();
            let secrets = Secrets::new(consumer_key, consumer_secret)
                .token(request_token.token(), request_token.token_secret());
            Signer::new(&secrets).sign_parameters(params, method.as_str(), &url)?
        };
        self.fetch_token(method, url, &signed)
    }

    fn fetch_token(&mut self, method: RequestMethod, url: Url, signed: &Parameters) -> Result<Token> {
        let request = self.authorize(Request::new(method.to_http(), url), signed);
        let response = self.transport.execute(request)?;
        if response.status_code() != 200 {
            return Err(ProtocolError::UnexpectedStatus {
                status: response.status_code(),
                body: response.text(),
            }
            .into());
        }
        Ok(Token::from_response(&response)?)
    }

    /// Standard parameters with a fresh nonce and timestamp.
    fn oauth_parameters(&self) -> Parameters {
        let (consumer_key, _) = self.config.get_consumer_key_pair();
        let mut params = Parameters::new();
        params.insert(OAUTH_CONSUMER_KEY.to_string(), consumer_key.to_string());
        params.insert(
            OAUTH_SIGNATURE_METHOD_KEY.to_string(),
            self.config.get_signature_method().as_str().to_string(),
        );
        params.insert(
            OAUTH_TIMESTAMP_KEY.to_string(),
            generate_timestamp().to_string(),
        );
        params.insert(OAUTH_NONCE_KEY.to_string(), generate_nonce());
        params.insert(
            OAUTH_VERSION_KEY.to_string(),
            self.config.get_version().to_string(),
        );
        params
    }

    /// Place signed parameters on the request per the request scheme.
    ///
    /// POSTBODY falls back to the query when the request has no form body to
    /// carry them (not a POST, or a raw body is set).
    fn authorize(&self, request: Request, params: &Parameters) -> Request {
        match self.config.get_request_scheme() {
            RequestScheme::Header => {
                request.header(AUTHORIZATION, self.create_auth_header(params))
            }
            RequestScheme::PostBody
                if request.method() == Method::POST && request.body_ref().is_none() =>
            {
                request.form(params.iter().map(|(k, v)| (k.clone(), v.clone())))
            }
            RequestScheme::PostBody | RequestScheme::Query => request.query(params),
        }
    }
}

fn required_auth_data<'a>(auth_data: &'a Parameters, key: &'static str) -> Result<&'a str> {
    auth_data
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| InputError::MissingAuthData(key).into())
}
