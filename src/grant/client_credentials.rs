//! The client acts on its own behalf, rfc6749 section 4.4.
use crate::error::{ErrorKind, OAuthError};
use crate::generator::RandomGenerator;
use crate::model::{Client, Storage, Token};
use crate::request::Request;
use crate::scope::Scope;

use super::{GrantOptions, Issuance};

/// The client credentials grant flow.
pub struct ClientCredentialsGrant<'a> {
    inner: Issuance<'a>,
}

impl<'a> ClientCredentialsGrant<'a> {
    /// Bind the flow to its collaborator and policy.
    pub fn new(
        storage: &'a dyn Storage, options: &'a GrantOptions, generator: &'a RandomGenerator,
    ) -> Self {
        ClientCredentialsGrant {
            inner: Issuance {
                storage,
                options,
                generator,
            },
        }
    }

    /// Issue an access token to the already authenticated client.
    ///
    /// No refresh token: the client can always authenticate again
    /// (section 4.4.3).
    pub async fn handle(&self, request: &Request, client: &Client) -> Result<Token, OAuthError> {
        let requested = match request.param("scope") {
            None => None,
            Some(raw) => Some(raw.parse::<Scope>().map_err(|_| {
                OAuthError::new(ErrorKind::InvalidScope, "Invalid parameter: `scope`")
            })?),
        };

        let user = self
            .inner
            .storage
            .get_user_from_client(client)
            .await?
            .ok_or_else(|| {
                OAuthError::new(ErrorKind::InvalidGrant, "Invalid grant: user credentials are invalid")
            })?;

        let scope = self
            .inner
            .validate_scope(&user, client, requested.as_ref())
            .await?;
        self.inner.save_token(client, user, scope, false).await
    }
}
