//! The data model and the collaborator contracts this core consumes.
//!
//! Clients, users and issued artifacts are owned by the persistence
//! collaborator; this core only requests creation, lookup and revocation
//! through the [`Storage`] trait and enforces ordering and validity rules
//! around those calls. Resolution of the currently authenticated resource
//! owner is delegated to an [`Authenticator`].
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{OAuthError, StorageError};
use crate::request::{Request, Response};
use crate::scope::Scope;

/// One OAuth 2.0 token-issuance strategy.
///
/// The set is closed by the rfc; clients carry an allow-list of these.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum GrantKind {
    /// Exchange of a previously issued authorization code, section 4.1.
    AuthorizationCode,
    /// Direct issuance to the user-agent, section 4.2.
    Implicit,
    /// Exchange of a refresh token, section 6.
    RefreshToken,
    /// The client acts on its own behalf, section 4.4.
    ClientCredentials,
    /// Resource owner password credentials, section 4.3.
    Password,
}

impl GrantKind {
    /// The grant name as it appears in `grant_type` parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            GrantKind::AuthorizationCode => "authorization_code",
            GrantKind::Implicit => "implicit",
            GrantKind::RefreshToken => "refresh_token",
            GrantKind::ClientCredentials => "client_credentials",
            GrantKind::Password => "password",
        }
    }
}

impl FromStr for GrantKind {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, ()> {
        match string {
            "authorization_code" => Ok(GrantKind::AuthorizationCode),
            "implicit" => Ok(GrantKind::Implicit),
            "refresh_token" => Ok(GrantKind::RefreshToken),
            "client_credentials" => Ok(GrantKind::ClientCredentials),
            "password" => Ok(GrantKind::Password),
            _ => Err(()),
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered client application.
///
/// Immutable for the duration of a request. Registration itself is not
/// covered by this crate.
#[derive(Clone, Debug)]
pub struct Client {
    /// The client identifier.
    pub id: String,

    /// The grants this client may use.
    pub grants: Vec<GrantKind>,

    /// Registered redirect uris, matched verbatim. Must not be empty.
    pub redirect_uris: Vec<String>,

    /// Per-client access token lifetime in seconds, overriding the configured one.
    pub access_token_lifetime: Option<i64>,

    /// Per-client refresh token lifetime in seconds, overriding the configured one.
    pub refresh_token_lifetime: Option<i64>,
}

impl Client {
    /// Whether the client is allowed to use the given grant.
    pub fn allows(&self, grant: GrantKind) -> bool {
        self.grants.contains(&grant)
    }
}

/// The resource owner, as resolved by the authentication collaborator.
///
/// Opaque to this core: passed through into issued artifacts, never
/// inspected beyond identity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct User {
    /// Identifies the owner within the persistence collaborator.
    pub id: String,
}

/// An issued, not yet redeemed authorization code.
#[derive(Clone, Debug)]
pub struct AuthorizationCode {
    /// The code value handed to the user-agent.
    pub code: String,

    /// Expiry of the code.
    pub expires_at: DateTime<Utc>,

    /// The redirect uri the code was issued for, recorded verbatim.
    pub redirect_uri: String,

    /// The scope granted with this code.
    pub scope: Option<Scope>,

    /// The client the code was issued to.
    pub client_id: String,

    /// The resource owner who approved the grant.
    pub user: User,
}

impl AuthorizationCode {
    /// Whether the code may no longer be redeemed.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// A persisted token bundle: an access token and optionally a refresh token.
#[derive(Clone, Debug)]
pub struct Token {
    /// The access token value.
    pub access_token: String,

    /// Expiry of the access token; `None` means the token does not expire.
    pub access_token_expires_at: Option<DateTime<Utc>>,

    /// The refresh token value, if one was issued.
    pub refresh_token: Option<String>,

    /// Expiry of the refresh token.
    pub refresh_token_expires_at: Option<DateTime<Utc>>,

    /// The scope granted to this bundle.
    pub scope: Option<Scope>,

    /// The client the bundle was issued to.
    pub client_id: String,

    /// The resource owner the bundle belongs to.
    pub user: User,
}

/// The persistence collaborator contract.
///
/// Implementations are responsible for atomicity of the cross-request
/// invariants: a code must be redeemable at most once and a rotated refresh
/// token must be invalid immediately, so `revoke_*` should be a
/// check-and-remove in one transaction. This core only sequences the calls.
///
/// The `validate_scope` and `generate_*` methods are optional hooks; the
/// default implementations restore the behavior of a collaborator without
/// the hook.
#[async_trait(?Send)]
pub trait Storage {
    /// Look a client up by id and, when given, authenticate its secret.
    ///
    /// The authorize flow always passes `None`; the token endpoint forwards
    /// whatever credentials the client presented. A confidential client must
    /// not be returned for a missing or wrong secret.
    async fn get_client(&self, id: &str, secret: Option<&str>) -> Result<Option<Client>, StorageError>;

    /// Persist a freshly issued authorization code.
    async fn save_authorization_code(
        &self, code: AuthorizationCode,
    ) -> Result<AuthorizationCode, StorageError>;

    /// Recover an authorization code by value.
    async fn get_authorization_code(&self, code: &str) -> Result<Option<AuthorizationCode>, StorageError>;

    /// Revoke an authorization code, returning whether it was still valid.
    async fn revoke_authorization_code(&self, code: &AuthorizationCode) -> Result<bool, StorageError>;

    /// Recover a token bundle by its refresh token value.
    async fn get_refresh_token(&self, refresh_token: &str) -> Result<Option<Token>, StorageError>;

    /// Revoke a token bundle, returning whether it was still valid.
    async fn revoke_token(&self, token: &Token) -> Result<bool, StorageError>;

    /// Persist a freshly issued token bundle.
    async fn save_token(&self, token: Token) -> Result<Token, StorageError>;

    /// Authenticate a resource owner by credentials, for the password grant.
    async fn get_user(&self, _username: &str, _password: &str) -> Result<Option<User>, StorageError> {
        Ok(None)
    }

    /// The user a client acts as, for the client credentials grant.
    async fn get_user_from_client(&self, _client: &Client) -> Result<Option<User>, StorageError> {
        Ok(None)
    }

    /// Replace or approve the requested scope.
    ///
    /// The default echoes the request. An override returning `None` for a
    /// request that did carry a scope rejects it, surfacing as
    /// `invalid_scope`; returning a different scope replaces the requested
    /// one entirely.
    async fn validate_scope(
        &self, _user: &User, _client: &Client, scope: Option<&Scope>,
    ) -> Result<Option<Scope>, StorageError> {
        Ok(scope.cloned())
    }

    /// Supply an access token value, overriding the random generator.
    async fn generate_access_token(
        &self, _client: &Client, _user: &User, _scope: Option<&Scope>,
    ) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    /// Supply a refresh token value, overriding the random generator.
    async fn generate_refresh_token(
        &self, _client: &Client, _user: &User, _scope: Option<&Scope>,
    ) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    /// Supply an authorization code value, overriding the random generator.
    async fn generate_authorization_code(
        &self, _client: &Client, _user: &User, _scope: Option<&Scope>,
    ) -> Result<Option<String>, StorageError> {
        Ok(None)
    }
}

/// The authentication collaborator contract.
///
/// Resolves the resource owner behind a request, typically from a session or
/// a bearer token. Any error it raises is propagated unchanged by the
/// authorize flow; `Ok(None)` is a collaborator contract violation and
/// surfaces as `server_error`.
#[async_trait(?Send)]
pub trait Authenticator {
    /// Resolve the user making this request.
    async fn handle(&self, request: &Request, response: &mut Response)
        -> Result<Option<User>, OAuthError>;
}
