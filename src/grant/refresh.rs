//! Exchanges a refresh token for a new token bundle, rfc6749 section 6.
use chrono::Utc;

use crate::error::{ErrorKind, OAuthError};
use crate::generator::RandomGenerator;
use crate::model::{Client, Storage, Token};
use crate::request::Request;
use crate::scope::Scope;
use crate::validate;

use super::{GrantOptions, Issuance};

/// The refresh token grant flow.
pub struct RefreshTokenGrant<'a> {
    inner: Issuance<'a>,
}

impl<'a> RefreshTokenGrant<'a> {
    /// Bind the flow to its collaborator and policy.
    pub fn new(
        storage: &'a dyn Storage, options: &'a GrantOptions, generator: &'a RandomGenerator,
    ) -> Self {
        RefreshTokenGrant {
            inner: Issuance {
                storage,
                options,
                generator,
            },
        }
    }

    /// Redeem the refresh token carried by the request.
    ///
    /// With rotation enabled (the default) the old token is revoked and a new
    /// refresh token minted; with rotation disabled the old token stays valid
    /// and the new bundle carries none.
    pub async fn handle(&self, request: &Request, client: &Client) -> Result<Token, OAuthError> {
        let value = request.param("refresh_token").ok_or_else(|| {
            OAuthError::new(ErrorKind::InvalidRequest, "Missing parameter: `refresh_token`")
        })?;
        if !validate::vschar(value) {
            return Err(OAuthError::new(
                ErrorKind::InvalidRequest,
                "Invalid parameter: `refresh_token`",
            ));
        }

        let token = self
            .inner
            .storage
            .get_refresh_token(value)
            .await?
            .ok_or_else(|| {
                OAuthError::new(ErrorKind::InvalidGrant, "Invalid grant: refresh token is invalid")
            })?;

        if token.client_id != client.id {
            return Err(OAuthError::new(
                ErrorKind::InvalidGrant,
                "Invalid grant: refresh token is invalid",
            ));
        }
        if let Some(expires_at) = token.refresh_token_expires_at {
            if expires_at <= Utc::now() {
                return Err(OAuthError::new(
                    ErrorKind::InvalidGrant,
                    "Invalid grant: refresh token has expired",
                ));
            }
        }

        let scope = self.narrowed_scope(request, &token)?;

        let rotate = self.inner.options.always_issue_new_refresh_token;
        if rotate {
            if !self.inner.storage.revoke_token(&token).await? {
                return Err(OAuthError::new(
                    ErrorKind::InvalidGrant,
                    "Invalid grant: refresh token is invalid",
                ));
            }
            tracing::debug!(client = %client.id, "refresh token rotated");
        }

        self.inner.save_token(client, token.user, scope, rotate).await
    }

    /// The scope of the new bundle: the original one, or the requested scope
    /// when it does not exceed the original (section 6, "MUST NOT include any
    /// scope not originally granted").
    fn narrowed_scope(&self, request: &Request, token: &Token) -> Result<Option<Scope>, OAuthError> {
        let requested = match request.param("scope") {
            None => return Ok(token.scope.clone()),
            Some(raw) => raw
                .parse::<Scope>()
                .map_err(|_| OAuthError::new(ErrorKind::InvalidScope, "Invalid parameter: `scope`"))?,
        };

        match &token.scope {
            Some(original) if requested <= *original => Ok(Some(requested)),
            _ => Err(OAuthError::new(
                ErrorKind::InvalidScope,
                "Invalid scope: requested scope exceeds the granted scope",
            )),
        }
    }
}
