//! Captured HTTP responses handed to result matchers.

use std::collections::HashMap;

/// A response whose body can be asserted on
pub trait CapturedResponse {
    /// Raw body bytes
    fn body(&self) -> &[u8];

    /// Character encoding declared by the response metadata, if any
    fn declared_encoding(&self) -> Option<&str>;
}

/// The `charset` parameter of a `Content-Type` value.
///
/// ```
/// use html_result_matchers::charset_from_content_type;
///
/// assert_eq!(charset_from_content_type("text/html; charset=\"UTF-8\""), Some("UTF-8"));
/// assert_eq!(charset_from_content_type("text/html"), None);
/// ```
#[must_use]
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then_some(value)
    })
}

/// An owned response: status, headers and body
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names as given
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
}

impl Default for ResponseSnapshot {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }
}

impl ResponseSnapshot {
    /// Create an empty 200 response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a 200 response with an HTML body and no declared charset
    #[must_use]
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self::default()
            .with_header("Content-Type", "text/html")
            .with_body(body)
    }

    /// Set the status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add or replace a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Declare `charset` on the content type
    #[must_use]
    pub fn with_charset(self, charset: &str) -> Self {
        let media_type = self
            .header("Content-Type")
            .and_then(|value| value.split(';').next())
            .map_or_else(|| "text/html".to_string(), |media| media.trim().to_string());
        self.with_header("Content-Type", format!("{media_type};charset={charset}"))
    }

    /// Header value by case-insensitive name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl CapturedResponse for ResponseSnapshot {
    fn body(&self) -> &[u8] {
        &self.body
    }

    fn declared_encoding(&self) -> Option<&str> {
        self.header("Content-Type")
            .and_then(charset_from_content_type)
    }
}

#[cfg(feature = "http")]
impl<B: AsRef<[u8]>> CapturedResponse for http::Response<B> {
    fn body(&self) -> &[u8] {
        http::Response::body(self).as_ref()
    }

    fn declared_encoding(&self) -> Option<&str> {
        self.headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type)
    }
}
