//! Issues an access token directly to the user-agent, rfc6749 section 4.2.
use crate::error::OAuthError;
use crate::generator::RandomGenerator;
use crate::model::{Client, Storage, Token, User};
use crate::scope::Scope;

use super::{GrantOptions, Issuance};

/// The implicit grant flow.
///
/// Only reachable through the authorize endpoint's `token` response type;
/// the resource owner is already authenticated and the scope already
/// validated when this runs.
pub struct ImplicitGrant<'a> {
    inner: Issuance<'a>,
}

impl<'a> ImplicitGrant<'a> {
    /// Bind the flow to its collaborator and policy.
    pub fn new(
        storage: &'a dyn Storage, options: &'a GrantOptions, generator: &'a RandomGenerator,
    ) -> Self {
        ImplicitGrant {
            inner: Issuance {
                storage,
                options,
                generator,
            },
        }
    }

    /// Issue an access token for the authenticated user.
    ///
    /// Never issues a refresh token (section 4.2 forbids them for this flow).
    pub async fn handle(
        &self, client: &Client, user: &User, scope: Option<&Scope>,
    ) -> Result<Token, OAuthError> {
        self.inner
            .save_token(client, user.clone(), scope.cloned(), false)
            .await
    }
}
