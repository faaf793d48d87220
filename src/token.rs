use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

use crate::{
    ProtocolError, ProtocolResult, Response, OAUTH_CALLBACK_CONFIRMED_KEY, OAUTH_TOKEN_KEY,
    OAUTH_TOKEN_SECRET_KEY,
};

/// Token handed out by the service provider (request token or access token).
///
/// Parameters other than `oauth_token`, `oauth_token_secret` and
/// `oauth_callback_confirmed` are kept in [`Token::additional_params`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    token: String,
    token_secret: String,
    callback_confirmed: Option<bool>,
    additional: BTreeMap<String, String>,
}

impl Token {
    /// Parse the body of a token response.
    pub fn from_response(response: &Response) -> ProtocolResult<Self> {
        read_oauth_token(&response.text())
    }

    pub fn parse(body: &str) -> ProtocolResult<Self> {
        read_oauth_token(body)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_secret(&self) -> &str {
        &self.token_secret
    }

    pub fn callback_confirmed(&self) -> Option<bool> {
        self.callback_confirmed
    }

    pub fn additional_params(&self) -> &BTreeMap<String, String> {
        &self.additional
    }

    /// Look a parameter up by its wire name.
    pub fn param(&self, key: &str) -> Option<&str> {
        match key {
            OAUTH_TOKEN_KEY => Some(&self.token),
            OAUTH_TOKEN_SECRET_KEY => Some(&self.token_secret),
            OAUTH_CALLBACK_CONFIRMED_KEY => self
                .callback_confirmed
                .map(|confirmed| if confirmed { "true" } else { "false" }),
            _ => self.additional.get(key).map(String::as_str),
        }
    }
}

// providers double-encode values, so each one is decoded once more
fn read_oauth_token(text: &str) -> ProtocolResult<Token> {
    let mut destructured = url::form_urlencoded::parse(text.trim().as_bytes())
        .filter(|(key, value)| !(key.is_empty() && value.is_empty()))
        .map(|(key, value)| {
            (
                key.into_owned(),
                percent_decode_str(&value).decode_utf8_lossy().into_owned(),
            )
        })
        .collect::<BTreeMap<String, String>>();
    if destructured.is_empty() {
        return Err(ProtocolError::EmptyResponse(text.to_string()));
    }
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    let callback_confirmed = destructured
        .remove(OAUTH_CALLBACK_CONFIRMED_KEY)
        .map(|v| v.eq_ignore_ascii_case("true"));
    match (oauth_token, oauth_token_secret) {
        (Some(token), Some(token_secret)) => Ok(Token {
            token,
            token_secret,
            callback_confirmed,
            additional: destructured,
        }),
        (None, _) => Err(ProtocolError::TokenKeyNotFound(
            OAUTH_TOKEN_KEY,
            text.to_string(),
        )),
        (_, None) => Err(ProtocolError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text.to_string(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_response_typical() {
        let resp_str_sample = "oauth_token=Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik&oauth_token_secret=Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM&oauth_callback_confirmed=true&user_id=42";
        let parsed = Token::parse(resp_str_sample).unwrap();
        assert_eq!(parsed.token(), "Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik");
        assert_eq!(
            parsed.token_secret(),
            "Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM"
        );
        assert_eq!(parsed.callback_confirmed(), Some(true));
        assert_eq!(parsed.additional_params().len(), 1);
        assert_eq!(parsed.param("user_id"), Some("42"));
        assert_eq!(parsed.param("oauth_callback_confirmed"), Some("true"));
        assert_eq!(parsed.param("oauth_token"), Some(parsed.token()));
    }

    #[test]
    fn parse_response_edge() {
        let resp_str_sample = "oauth_token==&oauth_token_secret=&keyonly=&keyonly2&&";
        let parsed = Token::parse(resp_str_sample).unwrap();
        assert_eq!(parsed.token(), "=");
        assert_eq!(parsed.token_secret(), "");
        assert_eq!(parsed.callback_confirmed(), None);
        assert_eq!(parsed.additional_params().len(), 2);
        assert_eq!(parsed.param("keyonly"), Some(""));
        assert_eq!(parsed.param("keyonly2"), Some(""));
    }

    #[test]
    fn parse_minimal() {
        let parsed = Token::parse("oauth_token&oauth_token_secret").unwrap();
        assert_eq!(parsed.token(), "");
        assert_eq!(parsed.token_secret(), "");
        assert!(parsed.additional_params().is_empty());
    }

    #[test]
    fn values_are_decoded_twice() {
        let parsed =
            Token::parse("oauth_token=a%252Fb&oauth_token_secret=c%2520d&screen_name=x%2By").unwrap();
        assert_eq!(parsed.token(), "a/b");
        assert_eq!(parsed.token_secret(), "c d");
        // `+` survives the second, raw decode
        assert_eq!(parsed.param("screen_name"), Some("x+y"));
    }

    #[test]
    fn callback_not_confirmed() {
        let parsed =
            Token::parse("oauth_token=a&oauth_token_secret=b&oauth_callback_confirmed=false")
                .unwrap();
        assert_eq!(parsed.callback_confirmed(), Some(false));
        assert_eq!(parsed.param("oauth_callback_confirmed"), Some("false"));
    }

    #[test]
    fn parse_empty() {
        assert_eq!(
            Token::parse(""),
            Err(ProtocolError::EmptyResponse(String::new()))
        );
        assert_eq!(
            Token::parse("&&\r\n"),
            Err(ProtocolError::EmptyResponse("&&\r\n".to_string()))
        );
    }

    #[test]
    fn parse_token_notfound() {
        let resp_str_sample = "oauth_token_secret=";
        assert_eq!(
            Token::parse(resp_str_sample),
            Err(ProtocolError::TokenKeyNotFound(
                OAUTH_TOKEN_KEY,
                resp_str_sample.to_string()
            ))
        );
    }

    #[test]
    fn parse_token_secret_notfound() {
        let resp_str_sample = "oauth_token=";
        assert_eq!(
            Token::parse(resp_str_sample),
            Err(ProtocolError::TokenKeyNotFound(
                OAUTH_TOKEN_SECRET_KEY,
                resp_str_sample.to_string()
            ))
        );
    }
}
