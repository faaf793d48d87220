use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::RngCore;
use sha1::Sha1;
use url::Url;

use crate::{
    SecretsProvider, SignError, SignResult, SignatureMethod, OAUTH_SIGNATURE_KEY,
    OAUTH_SIGNATURE_METHOD_KEY, REALM_KEY,
};

/// OAuth request parameters, kept sorted by key.
pub type Parameters = BTreeMap<String, String>;

/// RFC 3986 unreserved characters are the only ones left as-is.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const EXCLUDED_FROM_SIGNATURE: [&str; 2] = [REALM_KEY, OAUTH_SIGNATURE_KEY];

/// Percent-encode a value the way OAuth 1.0a section 5.1 requires.
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Normalize request parameters for the signature base string.
///
/// `realm` and `oauth_signature` are excluded; keys and values are encoded
/// and joined as `k=v&k=v` in key order.
pub fn normalize_request_parameters(params: &Parameters) -> String {
    normalize(params.iter().map(|(key, value)| (key.as_str(), value.as_str())))
}

/// Like [`normalize_request_parameters`], for parameter lists that may repeat
/// a name.
///
/// Every pair is kept. Pairs are sorted by encoded name, then by encoded
/// value (RFC 5849 section 3.4.1.3.2).
pub fn normalize_parameter_pairs(pairs: &[(String, String)]) -> String {
    normalize(pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())))
}

fn normalize<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut encoded = pairs
        .into_iter()
        .filter(|(key, _)| !EXCLUDED_FROM_SIGNATURE.contains(key))
        .map(|(key, value)| (encode(key), encode(value)))
        .collect::<Vec<_>>();
    encoded.sort();
    encoded
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// `scheme://host[:port]/path`, the port only when it is not the scheme's default.
pub fn construct_request_url(url: &Url) -> String {
    let mut constructed = format!(
        "{}://{}",
        url.scheme().to_ascii_lowercase(),
        url.host_str().unwrap_or_default().to_ascii_lowercase()
    );
    // Url::port() is None for the scheme's default port
    if let Some(port) = url.port() {
        constructed.push(':');
        constructed.push_str(&port.to_string());
    }
    constructed.push_str(url.path());
    constructed
}

pub fn create_base_string(params: &Parameters, method: &str, url: &Url) -> String {
    format_base_string(method, url, &normalize_request_parameters(params))
}

pub fn create_base_string_from_pairs(
    pairs: &[(String, String)],
    method: &str,
    url: &Url,
) -> String {
    format_base_string(method, url, &normalize_parameter_pairs(pairs))
}

fn format_base_string(method: &str, url: &Url, normalized: &str) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&construct_request_url(url)),
        encode(normalized)
    )
}

pub fn assemble_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        encode(consumer_secret),
        token_secret.map(encode).unwrap_or_default()
    )
}

/// Sign `params` with the method named by their `oauth_signature_method`.
pub fn sign(
    params: &Parameters,
    method: &str,
    url: &Url,
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> SignResult<String> {
    let signature_method = params.get(OAUTH_SIGNATURE_METHOD_KEY).map(String::as_str);
    sign_normalized(
        signature_method,
        &normalize_request_parameters(params),
        method,
        url,
        (consumer_secret, token_secret),
    )
}

/// [`sign`] over a parameter list that may repeat a name, such as a query
/// string or form fields merged with the OAuth parameters.
pub fn sign_pairs(
    pairs: &[(String, String)],
    method: &str,
    url: &Url,
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> SignResult<String> {
    let signature_method = pairs
        .iter()
        .find(|(key, _)| key == OAUTH_SIGNATURE_METHOD_KEY)
        .map(|(_, value)| value.as_str());
    sign_normalized(
        signature_method,
        &normalize_parameter_pairs(pairs),
        method,
        url,
        (consumer_secret, token_secret),
    )
}

fn sign_normalized(
    signature_method: Option<&str>,
    normalized: &str,
    method: &str,
    url: &Url,
    (consumer_secret, token_secret): (&str, Option<&str>),
) -> SignResult<String> {
    let signature_method =
        signature_method.ok_or(SignError::MissingParameter(OAUTH_SIGNATURE_METHOD_KEY))?;
    let parsed: SignatureMethod = signature_method
        .parse()
        .map_err(|_| SignError::UnknownMethod(signature_method.to_string()))?;
    match parsed {
        SignatureMethod::HmacSha1 => {
            let base_string = format_base_string(method, url, normalized);
            let key = assemble_key(consumer_secret, token_secret);
            hmac_sha1(&key, &base_string)
        }
        other => Err(SignError::Unimplemented(other)),
    }
}

fn hmac_sha1(key: &str, base_string: &str) -> SignResult<String> {
    let mut mac =
        Hmac::<Sha1>::new_from_slice(key.as_bytes()).map_err(|_| SignError::InvalidKey)?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// 128 random bits, hex encoded. Never reuse one across requests.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn generate_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Build the value of the `Authorization` header, OAuth 1.0a section 5.4.1.
///
/// The realm leads when given and is not encoded; every parameter is.
pub fn create_auth_header(params: &Parameters, realm: Option<&str>) -> String {
    let mut header = String::from("OAuth ");
    if let Some(realm) = realm {
        header.push_str(&format!("{}=\"{}\",", REALM_KEY, realm));
    }
    let formatted = params
        .iter()
        .filter(|(key, _)| key.as_str() != REALM_KEY)
        .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
        .collect::<Vec<_>>();
    header.push_str(&formatted.join(","));
    header
}

/// Signs parameter sets with the key material of a [`SecretsProvider`].
#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: &'a TSecretsProvider,
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: &'a TSecretsProvider) -> Self {
        Signer { secrets }
    }

    /// Sign `params` and return them with `oauth_signature` added.
    pub fn sign_parameters(
        &self,
        mut params: Parameters,
        method: &str,
        url: &Url,
    ) -> SignResult<Parameters> {
        let (_, consumer_secret) = self.secrets.get_consumer_key_pair();
        let token_secret = self.secrets.get_token_secret_option();
        let signature = sign(&params, method, url, consumer_secret, token_secret)?;
        params.insert(OAUTH_SIGNATURE_KEY.to_string(), signature);
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Secrets;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn rfc_initiate_params() -> Parameters {
        // https://tools.ietf.org/html/rfc5849#section-1.2
        params(&[
            ("realm", "photos"),
            ("oauth_consumer_key", "dpf43f3p2l4k3l03"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "137131200"),
            ("oauth_nonce", "wIjqoS"),
            ("oauth_callback", "http://printer.example.com/ready"),
        ])
    }

    #[test]
    fn encode_unreserved_only() {
        assert_eq!(encode("abcXYZ019-._~"), "abcXYZ019-._~");
        assert_eq!(encode("a b+c/d=e&f"), "a%20b%2Bc%2Fd%3De%26f");
        assert_eq!(encode("少女"), "%E5%B0%91%E5%A5%B3");
    }

    #[test]
    fn normalize_excludes_and_sorts() {
        let p = params(&[
            ("z", "last"),
            ("realm", "photos"),
            ("oauth_signature", "sig"),
            ("a", "first value"),
            ("m", "x/y"),
        ]);
        assert_eq!(
            normalize_request_parameters(&p),
            "a=first%20value&m=x%2Fy&z=last"
        );
    }

    #[test]
    fn normalize_is_order_independent() {
        let forward = params(&[("b", "2"), ("a", "1"), ("c", "3")]);
        let mut backward = Parameters::new();
        backward.insert("c".into(), "3".into());
        backward.insert("a".into(), "1".into());
        backward.insert("b".into(), "2".into());
        assert_eq!(
            normalize_request_parameters(&forward),
            normalize_request_parameters(&backward)
        );
    }

    #[test]
    fn normalize_pairs_keeps_repeated_names() {
        let pairs = vec![
            ("id".to_string(), "2".to_string()),
            ("oauth_signature".to_string(), "sig".to_string()),
            ("a b".to_string(), "x".to_string()),
            ("id".to_string(), "1".to_string()),
            ("id".to_string(), "10".to_string()),
        ];
        assert_eq!(normalize_parameter_pairs(&pairs), "a%20b=x&id=1&id=10&id=2");
    }

    #[test]
    fn normalize_pairs_sorts_on_encoded_names() {
        // raw "a-" < "a/", encoded "a%2F" < "a-"
        let pairs = vec![
            ("a-".to_string(), "1".to_string()),
            ("a/".to_string(), "2".to_string()),
        ];
        assert_eq!(normalize_parameter_pairs(&pairs), "a%2F=2&a-=1");
    }

    #[test]
    fn sign_pairs_rfc_example() {
        // https://tools.ietf.org/html/rfc5849#section-3.4.1.1, `a3` is sent
        // twice (query and body)
        let url = Url::parse("http://example.com/request?b5=%3D%253D&a3=a&c%40=&a2=r%20b").unwrap();
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        for (key, value) in [
            ("c2", ""),
            ("a3", "2 q"),
            ("oauth_consumer_key", "9djdj82h48djs9d2"),
            ("oauth_token", "kkk9d7dh3k39sjv7"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "137131201"),
            ("oauth_nonce", "7d8f3e4a"),
        ] {
            pairs.push((key.to_string(), value.to_string()));
        }
        assert_eq!(
            normalize_parameter_pairs(&pairs),
            "a2=r%20b&a3=2%20q&a3=a&b5=%3D%253D&c%40=&c2=&oauth_consumer_key=9djdj82h48djs9d2&oauth_nonce=7d8f3e4a&oauth_signature_method=HMAC-SHA1&oauth_timestamp=137131201&oauth_token=kkk9d7dh3k39sjv7"
        );
        assert_eq!(
            create_base_string_from_pairs(&pairs, "POST", &url),
            "POST&http%3A%2F%2Fexample.com%2Frequest&a2%3Dr%2520b%26a3%3D2%2520q%26a3%3Da%26b5%3D%253D%25253D%26c%2540%3D%26c2%3D%26oauth_consumer_key%3D9djdj82h48djs9d2%26oauth_nonce%3D7d8f3e4a%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D137131201%26oauth_token%3Dkkk9d7dh3k39sjv7"
        );

        let collapsed: Parameters = pairs.iter().cloned().collect();
        let expected = hmac_sha1(
            "j49sk3j29djd&dh893hdasih9",
            &create_base_string_from_pairs(&pairs, "POST", &url),
        )
        .unwrap();
        assert_eq!(
            sign_pairs(&pairs, "POST", &url, "j49sk3j29djd", Some("dh893hdasih9")).unwrap(),
            expected
        );
        assert_ne!(
            sign(&collapsed, "POST", &url, "j49sk3j29djd", Some("dh893hdasih9")).unwrap(),
            expected
        );
    }

    #[test]
    fn sign_pairs_matches_sign_without_repeats() {
        let url = Url::parse("https://photos.example.net/initiate").unwrap();
        let pairs: Vec<(String, String)> = rfc_initiate_params().into_iter().collect();
        assert_eq!(
            sign_pairs(&pairs, "POST", &url, "kd94hf93k423kf44", None).unwrap(),
            "74KNZJeDHnMBp0EMJ9ZHt/XKycU="
        );
        assert_eq!(
            sign_pairs(&[], "POST", &url, "kd94hf93k423kf44", None),
            Err(SignError::MissingParameter(OAUTH_SIGNATURE_METHOD_KEY))
        );
    }

    #[test]
    fn request_url_ports() {
        let cases = [
            ("https://Example.com:443/rt", "https://example.com/rt"),
            ("http://example.com:80/rt", "http://example.com/rt"),
            ("https://example.com:8443/rt?x=1", "https://example.com:8443/rt"),
            ("http://example.com:443/rt", "http://example.com:443/rt"),
            ("https://example.com", "https://example.com/"),
        ];
        for (input, expected) in &cases {
            let url = Url::parse(input).unwrap();
            assert_eq!(&construct_request_url(&url), expected);
        }
    }

    #[test]
    fn base_string_rfc() {
        let url = Url::parse("https://photos.example.net/initiate").unwrap();
        assert_eq!(
            create_base_string(&rfc_initiate_params(), "post", &url),
            "POST&https%3A%2F%2Fphotos.example.net%2Finitiate&oauth_callback%3Dhttp%253A%252F%252Fprinter.example.com%252Fready%26oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3DwIjqoS%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D137131200"
        );
    }

    #[test]
    fn key_without_token_secret() {
        assert_eq!(assemble_key("kd94hf93k423kf44", None), "kd94hf93k423kf44&");
        assert_eq!(assemble_key("c s", Some("t&s")), "c%20s&t%26s");
    }

    #[test]
    fn sign_post_query() {
        // https://tools.ietf.org/html/rfc5849
        let url = Url::parse("https://photos.example.net/initiate").unwrap();
        let signature = sign(&rfc_initiate_params(), "POST", &url, "kd94hf93k423kf44", None);
        assert_eq!(signature.unwrap(), "74KNZJeDHnMBp0EMJ9ZHt/XKycU=");
    }

    #[test]
    fn sign_get_query() {
        // https://tools.ietf.org/html/rfc5849
        let url = Url::parse("http://photos.example.net/photos").unwrap();
        let p = params(&[
            ("realm", "Photos"),
            ("file", "vacation.jpg"),
            ("size", "original"),
            ("oauth_consumer_key", "dpf43f3p2l4k3l03"),
            ("oauth_token", "nnch734d00sl2jdk"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "137131202"),
            ("oauth_nonce", "chapoH"),
        ]);
        let signature = sign(&p, "GET", &url, "kd94hf93k423kf44", Some("pfkkdhi9sl3r4s00"));
        assert_eq!(signature.unwrap(), "MdpQcU8iPSUjWoN/UDMsK2sui9I=");
    }

    #[test]
    fn sign_post_body() {
        // https://developer.twitter.com/ja/docs/basics/authentication/guides/creating-a-signature
        let url = Url::parse("https://api.twitter.com/1.1/statuses/update.json").unwrap();
        let p = params(&[
            ("include_entities", "true"),
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            ("oauth_version", "1.0"),
        ]);
        let signature = sign(
            &p,
            "POST",
            &url,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            Some("LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"),
        );
        assert_eq!(signature.unwrap(), "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn sign_is_deterministic_and_sensitive() {
        let url = Url::parse("https://example.com/rt").unwrap();
        let base = params(&[
            ("oauth_consumer_key", "ck"),
            ("oauth_token", "abc"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1600000000"),
            ("oauth_nonce", "n0nce"),
        ]);
        let reference = sign(&base, "POST", &url, "cs", Some("xyz")).unwrap();
        assert_eq!(reference, sign(&base, "POST", &url, "cs", Some("xyz")).unwrap());

        for key in &["oauth_consumer_key", "oauth_token", "oauth_timestamp", "oauth_nonce"] {
            let mut changed = base.clone();
            changed.insert(key.to_string(), "other".to_string());
            assert_ne!(reference, sign(&changed, "POST", &url, "cs", Some("xyz")).unwrap());
        }
        assert_ne!(reference, sign(&base, "POST", &url, "cs2", Some("xyz")).unwrap());
        assert_ne!(reference, sign(&base, "POST", &url, "cs", Some("xyz2")).unwrap());
        assert_ne!(reference, sign(&base, "POST", &url, "cs", None).unwrap());
        assert_ne!(reference, sign(&base, "GET", &url, "cs", Some("xyz")).unwrap());
        let other_url = Url::parse("https://example.com/at").unwrap();
        assert_ne!(reference, sign(&base, "POST", &other_url, "cs", Some("xyz")).unwrap());
    }

    #[test]
    fn sign_ignores_realm_and_previous_signature() {
        let url = Url::parse("https://example.com/rt").unwrap();
        let base = params(&[("oauth_signature_method", "HMAC-SHA1"), ("a", "1")]);
        let mut decorated = base.clone();
        decorated.insert("realm".into(), "r".into());
        decorated.insert("oauth_signature".into(), "stale".into());
        assert_eq!(
            sign(&base, "POST", &url, "cs", None),
            sign(&decorated, "POST", &url, "cs", None)
        );
    }

    #[test]
    fn unimplemented_methods_fail_closed() {
        let url = Url::parse("https://example.com/rt").unwrap();
        for (name, method) in &[
            ("RSA-SHA1", SignatureMethod::RsaSha1),
            ("PLAINTEXT", SignatureMethod::Plaintext),
        ] {
            let p = params(&[("oauth_signature_method", *name)]);
            assert_eq!(
                sign(&p, "POST", &url, "cs", None),
                Err(SignError::Unimplemented(*method))
            );
        }
        let p = params(&[("oauth_signature_method", "MD5")]);
        assert_eq!(
            sign(&p, "POST", &url, "cs", None),
            Err(SignError::UnknownMethod("MD5".to_string()))
        );
        assert_eq!(
            sign(&Parameters::new(), "POST", &url, "cs", None),
            Err(SignError::MissingParameter("oauth_signature_method"))
        );
    }

    #[test]
    fn nonce_and_timestamp() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert!(generate_timestamp() > 1_500_000_000);
    }

    #[test]
    fn auth_header_format() {
        let p = params(&[
            ("oauth_consumer_key", "ck"),
            ("oauth_signature", "a+b/c="),
            ("oauth_callback", "oob"),
        ]);
        assert_eq!(
            create_auth_header(&p, Some("r")),
            "OAuth realm=\"r\",oauth_callback=\"oob\",oauth_consumer_key=\"ck\",oauth_signature=\"a%2Bb%2Fc%3D\""
        );
        assert_eq!(
            create_auth_header(&p, None),
            "OAuth oauth_callback=\"oob\",oauth_consumer_key=\"ck\",oauth_signature=\"a%2Bb%2Fc%3D\""
        );
    }

    #[test]
    fn signer_uses_token_secret() {
        let url = Url::parse("https://example.com/at").unwrap();
        let p = params(&[("oauth_signature_method", "HMAC-SHA1"), ("oauth_token", "abc")]);
        let consumer_only = Secrets::new("ck", "cs");
        let with_token = Secrets::new("ck", "cs").token("abc", "xyz");

        let signed = Signer::new(&with_token)
            .sign_parameters(p.clone(), "POST", &url)
            .unwrap();
        assert_eq!(
            signed.get("oauth_signature"),
            Some(&sign(&p, "POST", &url, "cs", Some("xyz")).unwrap())
        );
        let unsigned_token = Signer::new(&consumer_only)
            .sign_parameters(p.clone(), "POST", &url)
            .unwrap();
        assert_ne!(signed.get("oauth_signature"), unsigned_token.get("oauth_signature"));
    }
}
