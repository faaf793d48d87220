use http::{
    header::{CONTENT_LENGTH, TRANSFER_ENCODING},
    HeaderMap, HeaderValue,
};

/// A response as received by the [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status_code: u16,
    reason_phrase: String,
    protocol_version: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new(
        status_code: u16,
        reason_phrase: String,
        protocol_version: String,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        Response {
            status_code,
            reason_phrase,
            protocol_version,
            headers,
            body,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn reason_phrase(&self) -> &str {
        &self.reason_phrase
    }

    /// e.g. `1.1`
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the header, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a multi-valued header such as `Set-Cookie`.
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// The body was collected fully decoded: a chunked marker no longer
    /// describes it, so it is replaced by the decoded length.
    pub(crate) fn normalize_transfer_encoding(&mut self) {
        let chunked = self
            .headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.to_ascii_lowercase().contains("chunked"));
        if chunked {
            self.headers.remove(TRANSFER_ENCODING);
            self.headers
                .insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }
    }
}
