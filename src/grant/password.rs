//! Resource owner password credentials, rfc6749 section 4.3.
use crate::error::{ErrorKind, OAuthError};
use crate::generator::RandomGenerator;
use crate::model::{Client, Storage, Token};
use crate::request::Request;
use crate::scope::Scope;
use crate::validate;

use super::{GrantOptions, Issuance};

/// The password grant flow.
pub struct PasswordGrant<'a> {
    inner: Issuance<'a>,
}

impl<'a> PasswordGrant<'a> {
    /// Bind the flow to its collaborator and policy.
    pub fn new(
        storage: &'a dyn Storage, options: &'a GrantOptions, generator: &'a RandomGenerator,
    ) -> Self {
        PasswordGrant {
            inner: Issuance {
                storage,
                options,
                generator,
            },
        }
    }

    /// Authenticate the resource owner's credentials and issue a bundle.
    pub async fn handle(&self, request: &Request, client: &Client) -> Result<Token, OAuthError> {
        let username = request.param("username").ok_or_else(|| {
            OAuthError::new(ErrorKind::InvalidRequest, "Missing parameter: `username`")
        })?;
        let password = request.param("password").ok_or_else(|| {
            OAuthError::new(ErrorKind::InvalidRequest, "Missing parameter: `password`")
        })?;
        if !validate::vschar(username) || !validate::vschar(password) {
            return Err(OAuthError::new(
                ErrorKind::InvalidRequest,
                "Invalid parameter: `username` or `password`",
            ));
        }

        let requested = match request.param("scope") {
            None => None,
            Some(raw) => Some(raw.parse::<Scope>().map_err(|_| {
                OAuthError::new(ErrorKind::InvalidScope, "Invalid parameter: `scope`")
            })?),
        };

        let user = self
            .inner
            .storage
            .get_user(username, password)
            .await?
            .ok_or_else(|| {
                OAuthError::new(ErrorKind::InvalidGrant, "Invalid grant: user credentials are invalid")
            })?;

        let scope = self
            .inner
            .validate_scope(&user, client, requested.as_ref())
            .await?;
        self.inner.save_token(client, user, scope, true).await
    }
}
