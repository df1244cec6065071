//! Redeems an authorization code for a token bundle, rfc6749 section 4.1.3.
use crate::error::{ErrorKind, OAuthError};
use crate::generator::RandomGenerator;
use crate::model::{Client, Storage, Token};
use crate::request::Request;
use crate::validate;

use super::{GrantOptions, Issuance};

/// The authorization code grant flow.
pub struct AuthorizationCodeGrant<'a> {
    inner: Issuance<'a>,
}

impl<'a> AuthorizationCodeGrant<'a> {
    /// Bind the flow to its collaborator and policy.
    pub fn new(
        storage: &'a dyn Storage, options: &'a GrantOptions, generator: &'a RandomGenerator,
    ) -> Self {
        AuthorizationCodeGrant {
            inner: Issuance {
                storage,
                options,
                generator,
            },
        }
    }

    /// Exchange the code carried by the request for a fresh token bundle.
    ///
    /// The code is revoked before the bundle is issued; the persistence
    /// collaborator must make that revocation atomic so a second exchange of
    /// the same value fails.
    pub async fn handle(&self, request: &Request, client: &Client) -> Result<Token, OAuthError> {
        let value = request
            .param("code")
            .ok_or_else(|| OAuthError::new(ErrorKind::InvalidRequest, "Missing parameter: `code`"))?;
        if !validate::vschar(value) {
            return Err(OAuthError::new(ErrorKind::InvalidRequest, "Invalid parameter: `code`"));
        }

        let code = self
            .inner
            .storage
            .get_authorization_code(value)
            .await?
            .ok_or_else(|| {
                OAuthError::new(ErrorKind::InvalidGrant, "Invalid grant: authorization code is invalid")
            })?;

        if code.client_id != client.id {
            return Err(OAuthError::new(
                ErrorKind::InvalidGrant,
                "Invalid grant: authorization code is invalid",
            ));
        }
        if code.is_expired() {
            return Err(OAuthError::new(
                ErrorKind::InvalidGrant,
                "Invalid grant: authorization code has expired",
            ));
        }

        // The code records the uri it was issued for; redemption must present
        // the identical one (section 4.1.3).
        match request.param("redirect_uri") {
            Some(uri) if uri == code.redirect_uri => (),
            _ => {
                return Err(OAuthError::new(
                    ErrorKind::InvalidRequest,
                    "Invalid request: `redirect_uri` is invalid",
                ))
            }
        }

        if !self.inner.storage.revoke_authorization_code(&code).await? {
            return Err(OAuthError::new(
                ErrorKind::InvalidGrant,
                "Invalid grant: authorization code is invalid",
            ));
        }
        tracing::debug!(client = %client.id, "authorization code redeemed");

        self.inner
            .save_token(client, code.user, code.scope, true)
            .await
    }
}
