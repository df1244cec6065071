//! The grant engine: one module per rfc6749 token-issuance strategy.
//!
//! Every flow ends in [`Issuance::save_token`], which assembles the token
//! bundle and hands it to the persistence collaborator. The shared helpers
//! here replace what a base class would provide: scope validation, token
//! value generation and expiry computation, injected into each variant by
//! composition.
use chrono::{DateTime, Duration, Utc};

use crate::error::{ErrorKind, OAuthError};
use crate::generator::RandomGenerator;
use crate::model::{Client, Storage, Token, User};
use crate::scope::Scope;

pub mod authorization_code;
pub mod client_credentials;
pub mod implicit;
pub mod password;
pub mod refresh;

pub use self::authorization_code::AuthorizationCodeGrant;
pub use self::client_credentials::ClientCredentialsGrant;
pub use self::implicit::ImplicitGrant;
pub use self::password::PasswordGrant;
pub use self::refresh::RefreshTokenGrant;

/// Issuance policy shared by every grant flow.
#[derive(Clone, Debug)]
pub struct GrantOptions {
    /// Access token lifetime in seconds; `None` issues tokens without expiry.
    pub access_token_lifetime: Option<i64>,

    /// Refresh token lifetime in seconds; `None` issues tokens without expiry.
    pub refresh_token_lifetime: Option<i64>,

    /// Authorization code lifetime in seconds.
    pub authorization_code_lifetime: i64,

    /// Whether redeeming a refresh token revokes it and mints a new one.
    ///
    /// When disabled the old refresh token stays valid and no new one is
    /// issued.
    pub always_issue_new_refresh_token: bool,
}

impl Default for GrantOptions {
    fn default() -> Self {
        GrantOptions {
            access_token_lifetime: Some(3600),
            refresh_token_lifetime: Some(1_209_600),
            authorization_code_lifetime: 300,
            always_issue_new_refresh_token: true,
        }
    }
}

/// The composed helpers each grant variant delegates to.
pub(crate) struct Issuance<'a> {
    pub storage: &'a dyn Storage,
    pub options: &'a GrantOptions,
    pub generator: &'a RandomGenerator,
}

impl<'a> Issuance<'a> {
    /// Run the collaborator's scope hook over the requested scope.
    ///
    /// A request that carried a scope which the hook did not approve fails
    /// with `invalid_scope`; a request without one passes through.
    pub async fn validate_scope(
        &self, user: &User, client: &Client, requested: Option<&Scope>,
    ) -> Result<Option<Scope>, OAuthError> {
        match self.storage.validate_scope(user, client, requested).await? {
            Some(scope) => Ok(Some(scope)),
            None if requested.is_none() => Ok(None),
            None => Err(OAuthError::new(
                ErrorKind::InvalidScope,
                "Invalid scope: Requested scope is invalid",
            )),
        }
    }

    /// An access token value, from the collaborator hook or the generator.
    pub async fn access_token(
        &self, client: &Client, user: &User, scope: Option<&Scope>,
    ) -> Result<String, OAuthError> {
        if let Some(token) = self.storage.generate_access_token(client, user, scope).await? {
            return Ok(token);
        }
        self.generator.generate()
    }

    /// A refresh token value, from the collaborator hook or the generator.
    pub async fn refresh_token(
        &self, client: &Client, user: &User, scope: Option<&Scope>,
    ) -> Result<String, OAuthError> {
        if let Some(token) = self.storage.generate_refresh_token(client, user, scope).await? {
            return Ok(token);
        }
        self.generator.generate()
    }

    /// Expiry of a new access token; the client's lifetime wins over the configured one.
    pub fn access_token_expiry(&self, client: &Client) -> Option<DateTime<Utc>> {
        client
            .access_token_lifetime
            .or(self.options.access_token_lifetime)
            .map(|seconds| Utc::now() + Duration::seconds(seconds))
    }

    /// Expiry of a new refresh token.
    pub fn refresh_token_expiry(&self, client: &Client) -> Option<DateTime<Utc>> {
        client
            .refresh_token_lifetime
            .or(self.options.refresh_token_lifetime)
            .map(|seconds| Utc::now() + Duration::seconds(seconds))
    }

    /// Assemble and persist the token bundle every flow ends in.
    pub async fn save_token(
        &self, client: &Client, user: User, scope: Option<Scope>, with_refresh: bool,
    ) -> Result<Token, OAuthError> {
        let access_token = self.access_token(client, &user, scope.as_ref()).await?;
        let refresh_token = if with_refresh {
            Some(self.refresh_token(client, &user, scope.as_ref()).await?)
        } else {
            None
        };

        let token = Token {
            access_token,
            access_token_expires_at: self.access_token_expiry(client),
            refresh_token_expires_at: refresh_token
                .as_ref()
                .and_then(|_| self.refresh_token_expiry(client)),
            refresh_token,
            scope,
            client_id: client.id.clone(),
            user,
        };

        tracing::debug!(client = %token.client_id, refresh = token.refresh_token.is_some(), "persisting token bundle");
        Ok(self.storage.save_token(token).await?)
    }
}
