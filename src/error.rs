//! The closed set of protocol errors defined in [rfc6749] and [rfc6750].
//!
//! [rfc6749]: https://tools.ietf.org/html/rfc6749#section-5.2
//! [rfc6750]: https://tools.ietf.org/html/rfc6750#section-3.1

use std::borrow::Cow;
use std::fmt;
use std::vec;

/// Machine readable kinds of protocol errors.
///
/// Each kind maps to a wire error code, used as the `error` parameter of
/// redirects and as the `error` field of json bodies, and to the http status
/// a non-redirect response should carry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// The request is missing a required parameter, includes an invalid parameter value, includes
    /// a parameter more than once, or is otherwise malformed.
    InvalidRequest,

    /// Client authentication failed (e.g., unknown client, no client authentication included, or
    /// unsupported authentication method).
    InvalidClient,

    /// The provided authorization grant (e.g., authorization code, resource owner credentials) or
    /// refresh token is invalid, expired, revoked, does not match the redirection URI used in the
    /// authorization request, or was issued to another client.
    InvalidGrant,

    /// The requested scope is invalid, unknown, malformed, or exceeds the scope granted by the
    /// resource owner.
    InvalidScope,

    /// The authenticated client is not authorized to use this authorization grant type.
    UnauthorizedClient,

    /// The authorization grant type is not supported by the authorization server.
    UnsupportedGrantType,

    /// The authorization server does not support obtaining an authorization code or access token
    /// using this method.
    UnsupportedResponseType,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The access token provided is expired, revoked, malformed, or invalid for other reasons
    /// (rfc6750).
    InvalidToken,

    /// The request requires higher privileges than provided by the access token (rfc6750).
    InsufficientScope,

    /// The authorization server encountered an unexpected condition that prevented it from
    /// fulfilling the request. (This error code is needed because a 500 Internal Server Error
    /// status code cannot be returned to the client via a redirect.)
    ServerError,

    /// A caller contract violation, i.e. the server itself was misconfigured or invoked with
    /// arguments it documents as required. Never caused by the requesting party.
    InvalidArgument,
}

impl ErrorKind {
    /// The wire error code of this kind.
    pub fn wire_code(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidClient => "invalid_client",
            ErrorKind::InvalidGrant => "invalid_grant",
            ErrorKind::InvalidScope => "invalid_scope",
            ErrorKind::UnauthorizedClient => "unauthorized_client",
            ErrorKind::UnsupportedGrantType => "unsupported_grant_type",
            ErrorKind::UnsupportedResponseType => "unsupported_response_type",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::InsufficientScope => "insufficient_scope",
            ErrorKind::ServerError => "server_error",
            ErrorKind::InvalidArgument => "invalid_argument",
        }
    }

    /// The http status for a response that is not a redirect.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::InvalidRequest => 400,
            ErrorKind::InvalidClient => 401,
            ErrorKind::InvalidGrant => 400,
            ErrorKind::InvalidScope => 400,
            ErrorKind::UnauthorizedClient => 400,
            ErrorKind::UnsupportedGrantType => 400,
            ErrorKind::UnsupportedResponseType => 400,
            ErrorKind::AccessDenied => 400,
            ErrorKind::InvalidToken => 401,
            ErrorKind::InsufficientScope => 403,
            ErrorKind::ServerError => 500,
            ErrorKind::InvalidArgument => 500,
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "the request is malformed",
            ErrorKind::InvalidClient => "client authentication failed",
            ErrorKind::InvalidGrant => "the provided grant is invalid",
            ErrorKind::InvalidScope => "the requested scope is invalid",
            ErrorKind::UnauthorizedClient => "the client may not use this grant type",
            ErrorKind::UnsupportedGrantType => "the grant type is not supported",
            ErrorKind::UnsupportedResponseType => "the response type is not supported",
            ErrorKind::AccessDenied => "the resource owner denied the request",
            ErrorKind::InvalidToken => "the access token is invalid",
            ErrorKind::InsufficientScope => "the token has insufficient scope",
            ErrorKind::ServerError => "an unexpected condition occurred",
            ErrorKind::InvalidArgument => "a caller contract was violated",
        }
    }
}

impl AsRef<str> for ErrorKind {
    fn as_ref(&self) -> &str {
        self.wire_code()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.wire_code())
    }
}

/// A protocol error with its human readable description.
///
/// Every failure observable by callers of this crate is an instance of this
/// type; collaborator failures are wrapped into the `ServerError` kind with
/// their original message preserved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OAuthError {
    kind: ErrorKind,
    message: Cow<'static, str>,
}

impl OAuthError {
    /// Construct an error of the given kind with a specific description.
    pub fn new<M: Into<Cow<'static, str>>>(kind: ErrorKind, message: M) -> Self {
        OAuthError {
            kind,
            message: message.into(),
        }
    }

    /// Construct an error with the generic description of its kind.
    pub fn kind_only(kind: ErrorKind) -> Self {
        OAuthError {
            kind,
            message: Cow::Borrowed(kind.default_message()),
        }
    }

    /// The formal kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The wire error code, i.e. the value of the `error` parameter.
    pub fn wire_code(&self) -> &'static str {
        self.kind.wire_code()
    }

    /// The http status for a non-redirect rendering of this error.
    pub fn status(&self) -> u16 {
        self.kind.status()
    }

    /// The human readable description, used as `error_description`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The key-value pairs to attach to a redirect or an urlencoded body.
    pub fn iter(&self) -> <&Self as IntoIterator>::IntoIter {
        self.into_iter()
    }

    /// Encode as the json body of a non-redirect error response.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "error": self.wire_code(),
            "error_description": self.message(),
        })
        .to_string()
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind.wire_code(), self.message)
    }
}

impl std::error::Error for OAuthError {}

/// The error as key-value pairs, in the order they appear on the wire.
impl IntoIterator for &'_ OAuthError {
    type Item = (&'static str, Cow<'static, str>);
    type IntoIter = vec::IntoIter<(&'static str, Cow<'static, str>)>;

    fn into_iter(self) -> Self::IntoIter {
        vec![
            ("error", Cow::Borrowed(self.kind.wire_code())),
            ("error_description", self.message.clone()),
        ]
        .into_iter()
    }
}

/// A failure inside the persistence collaborator.
///
/// Carries only a message; whatever went wrong below the storage interface is
/// never a protocol error of its own, it surfaces as `ServerError`.
#[derive(Clone, Debug)]
pub struct StorageError {
    message: String,
}

impl StorageError {
    /// Wrap a storage failure description.
    pub fn new<M: Into<String>>(message: M) -> Self {
        StorageError {
            message: message.into(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for OAuthError {
    fn from(err: StorageError) -> Self {
        OAuthError::new(ErrorKind::ServerError, err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_rfc() {
        assert_eq!(ErrorKind::InvalidRequest.status(), 400);
        assert_eq!(ErrorKind::InvalidClient.status(), 401);
        assert_eq!(ErrorKind::InvalidToken.status(), 401);
        assert_eq!(ErrorKind::InsufficientScope.status(), 403);
        assert_eq!(ErrorKind::ServerError.status(), 500);
        assert_eq!(ErrorKind::InvalidArgument.status(), 500);
    }

    #[test]
    fn wire_pairs() {
        let error = OAuthError::new(ErrorKind::AccessDenied, "user denied access");
        let pairs: Vec<_> = error.iter().collect();
        assert_eq!(pairs[0], ("error", Cow::Borrowed("access_denied")));
        assert_eq!(pairs[1].0, "error_description");
        assert_eq!(pairs[1].1, "user denied access");
    }

    #[test]
    fn storage_failures_become_server_errors() {
        let err: OAuthError = StorageError::new("connection reset").into();
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.message(), "connection reset");
    }

    #[test]
    fn json_body() {
        let error = OAuthError::kind_only(ErrorKind::UnsupportedGrantType);
        let body: serde_json::Value = serde_json::from_str(&error.to_json()).unwrap();
        assert_eq!(body["error"], "unsupported_grant_type");
        assert!(body["error_description"].is_string());
    }
}
