use std::borrow::Cow;

/// Supplies the key material a signature is computed with.
pub trait SecretsProvider {
    fn get_consumer_key_pair(&self) -> (&str, &str);

    fn get_token_pair_option(&self) -> Option<(&str, &str)>;

    fn get_token_secret_option(&self) -> Option<&str> {
        self.get_token_pair_option().map(|(_, secret)| secret)
    }
}

/// Consumer credentials, optionally paired with a token.
///
/// `Secrets<'_, ()>` holds consumer credentials only (request token step);
/// `.token(..)` upgrades it to carry a token and its secret (access token
/// step and protected resource requests).
#[derive(Debug, Clone)]
pub struct Secrets<'a, T> {
    token: T,
    consumer_key: Cow<'a, str>,
    consumer_secret: Cow<'a, str>,
}

impl<'a> Secrets<'a, ()> {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            token: (),
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    pub fn token<TKey, TSecret>(
        self,
        token: TKey,
        token_secret: TSecret,
    ) -> Secrets<'a, (Cow<'a, str>, Cow<'a, str>)>
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            token: (token.into(), token_secret.into()),
            consumer_key: self.consumer_key,
            consumer_secret: self.consumer_secret,
        }
    }
}

impl SecretsProvider for Secrets<'_, ()> {
    fn get_consumer_key_pair(&self) -> (&str, &str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option(&self) -> Option<(&str, &str)> {
        None
    }
}

impl SecretsProvider for Secrets<'_, (Cow<'_, str>, Cow<'_, str>)> {
    fn get_consumer_key_pair(&self) -> (&str, &str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option(&self) -> Option<(&str, &str)> {
        Some((&self.token.0, &self.token.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumer_only() {
        let secrets = Secrets::new("ck", "cs");
        assert_eq!(secrets.get_consumer_key_pair(), ("ck", "cs"));
        assert_eq!(secrets.get_token_pair_option(), None);
        assert_eq!(secrets.get_token_secret_option(), None);
    }

    #[test]
    fn with_token() {
        let token = String::from("abc");
        let secrets = Secrets::new("ck", "cs").token(token, "xyz");
        assert_eq!(secrets.get_consumer_key_pair(), ("ck", "cs"));
        assert_eq!(secrets.get_token_pair_option(), Some(("abc", "xyz")));
        assert_eq!(secrets.get_token_secret_option(), Some("xyz"));
    }
}
