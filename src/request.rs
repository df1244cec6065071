//! Transport-neutral request and response carriers.
//!
//! Strictly data: the http binding fills a [`Request`] from the incoming
//! message and renders the [`Response`] back out. No core logic depends on
//! the transport protocol.
use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use url::Url;

use crate::error::{ErrorKind, OAuthError};

/// An incoming request, decoded by the transport layer.
///
/// Parameters may arrive in the urlencoded body or the query component; body
/// values take precedence. Header names are matched case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct Request {
    /// The http method.
    pub method: String,

    /// The key-value pairs in the url query component.
    pub query: HashMap<String, String>,

    /// The key-value pairs of a `x-www-form-urlencoded` body.
    pub body: HashMap<String, String>,

    /// The request headers.
    pub headers: HashMap<String, String>,
}

impl Request {
    /// A request parameter, from the body or failing that the query.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.body
            .get(name)
            .or_else(|| self.query.get(name))
            .map(String::as_str)
    }

    /// A header value, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Credentials of an http basic authorization header, if present.
    ///
    /// Returns the client id and, when given, its secret. A header that is
    /// present but not well-formed basic authentication is an error: only
    /// one authentication attempt may be made per request.
    pub fn basic_credentials(&self) -> Result<Option<(String, Option<String>)>, OAuthError> {
        let header = match self.header("authorization") {
            None => return Ok(None),
            Some(header) => header,
        };

        let encoded = header
            .strip_prefix("Basic ")
            .ok_or_else(|| OAuthError::new(ErrorKind::InvalidClient, "unsupported authentication scheme"))?;
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| OAuthError::new(ErrorKind::InvalidClient, "malformed authorization header"))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| OAuthError::new(ErrorKind::InvalidClient, "malformed authorization header"))?;

        match decoded.split_once(':') {
            Some((id, secret)) => Ok(Some((id.to_owned(), Some(secret.to_owned())))),
            None => Ok(Some((decoded, None))),
        }
    }
}

/// The outgoing response the transport layer renders.
#[derive(Debug)]
pub struct Response {
    /// The http status code.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// The response body, if any.
    pub body: Option<String>,
}

impl Response {
    /// Redirect the user-agent to the given location.
    pub fn redirect(&mut self, url: Url) {
        self.status = 302;
        self.headers.insert("location".to_owned(), url.into());
    }

    /// The redirect location, if one was set.
    pub fn location(&self) -> Option<&str> {
        self.headers.get("location").map(String::as_str)
    }

    /// Set a json body, leaving the status untouched.
    pub fn body_json(&mut self, data: String) {
        self.headers
            .insert("content-type".to_owned(), "application/json".to_owned());
        self.body = Some(data);
    }
}

impl Default for Response {
    fn default() -> Self {
        Response {
            status: 200,
            headers: HashMap::new(),
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_auth(header: &str) -> Request {
        let mut request = Request::default();
        request
            .headers
            .insert("Authorization".to_owned(), header.to_owned());
        request
    }

    #[test]
    fn body_shadows_query() {
        let mut request = Request::default();
        request.query.insert("scope".into(), "from-query".into());
        assert_eq!(request.param("scope"), Some("from-query"));
        request.body.insert("scope".into(), "from-body".into());
        assert_eq!(request.param("scope"), Some("from-body"));
    }

    #[test]
    fn basic_credentials_decoded() {
        // "abc:s3cr3t"
        let request = with_auth("Basic YWJjOnMzY3IzdA==");
        let (id, secret) = request.basic_credentials().unwrap().unwrap();
        assert_eq!(id, "abc");
        assert_eq!(secret.as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn malformed_basic_rejected() {
        assert!(with_auth("Basic !!!").basic_credentials().is_err());
        assert!(with_auth("Bearer abc").basic_credentials().is_err());
        assert!(Request::default().basic_credentials().unwrap().is_none());
    }

    #[test]
    fn redirect_sets_location() {
        let mut response = Response::default();
        response.redirect("https://client.example/cb?code=1".parse().unwrap());
        assert_eq!(response.status, 302);
        assert_eq!(response.location(), Some("https://client.example/cb?code=1"));
    }
}
