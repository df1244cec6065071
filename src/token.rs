//! The token endpoint flow, rfc6749 section 3.2.
//!
//! Authenticates the client, dispatches to the grant named by `grant_type`
//! and renders the issued bundle as a bearer response. Unlike the authorize
//! endpoint there is no redirect: failures render as json error bodies with
//! the status of their kind.
use chrono::Utc;

use crate::bearer::BearerToken;
use crate::error::{ErrorKind, OAuthError};
use crate::generator::RandomGenerator;
use crate::grant::{
    AuthorizationCodeGrant, ClientCredentialsGrant, GrantOptions, PasswordGrant, RefreshTokenGrant,
};
use crate::model::{Client, GrantKind, Storage, Token};
use crate::request::{Request, Response};
use crate::validate;

/// The token endpoint.
pub struct TokenEndpoint<'a> {
    storage: &'a dyn Storage,
    options: GrantOptions,
    generator: &'a RandomGenerator,
}

impl<'a> TokenEndpoint<'a> {
    /// Bind the endpoint to its collaborator and policy.
    pub fn new(storage: &'a dyn Storage, options: GrantOptions, generator: &'a RandomGenerator) -> Self {
        TokenEndpoint {
            storage,
            options,
            generator,
        }
    }

    /// Run the flow for one request, rendering the outcome onto the response.
    ///
    /// On success the response body is the bearer encoding of the returned
    /// bundle; on failure it is the json rendering of the returned error.
    pub async fn handle(
        &self, request: &Request, response: &mut Response,
    ) -> Result<Token, OAuthError> {
        match self.issue(request).await {
            Ok(token) => {
                self.render_token(&token, response)?;
                Ok(token)
            }
            Err(err) => {
                tracing::warn!(error = %err.wire_code(), "token request failed");
                self.render_error(request, &err, response);
                Err(err)
            }
        }
    }

    async fn issue(&self, request: &Request) -> Result<Token, OAuthError> {
        if !request.method.eq_ignore_ascii_case("POST") {
            return Err(OAuthError::new(
                ErrorKind::InvalidRequest,
                "Invalid request: method must be POST",
            ));
        }

        let kind = self.grant_kind(request)?;
        let client = self.authenticate_client(request).await?;
        if !client.allows(kind) {
            return Err(OAuthError::new(
                ErrorKind::UnauthorizedClient,
                "Unauthorized client: `grant_type` is invalid",
            ));
        }

        match kind {
            GrantKind::AuthorizationCode => {
                AuthorizationCodeGrant::new(self.storage, &self.options, self.generator)
                    .handle(request, &client)
                    .await
            }
            GrantKind::RefreshToken => {
                RefreshTokenGrant::new(self.storage, &self.options, self.generator)
                    .handle(request, &client)
                    .await
            }
            GrantKind::ClientCredentials => {
                ClientCredentialsGrant::new(self.storage, &self.options, self.generator)
                    .handle(request, &client)
                    .await
            }
            GrantKind::Password => {
                PasswordGrant::new(self.storage, &self.options, self.generator)
                    .handle(request, &client)
                    .await
            }
            // Implicit tokens are only issued by the authorize endpoint.
            GrantKind::Implicit => Err(OAuthError::new(
                ErrorKind::UnsupportedGrantType,
                "Unsupported grant type: `grant_type` is invalid",
            )),
        }
    }

    fn grant_kind(&self, request: &Request) -> Result<GrantKind, OAuthError> {
        let raw = request.param("grant_type").ok_or_else(|| {
            OAuthError::new(ErrorKind::InvalidRequest, "Missing parameter: `grant_type`")
        })?;
        if !validate::vschar(raw) {
            return Err(OAuthError::new(ErrorKind::InvalidRequest, "Invalid parameter: `grant_type`"));
        }
        raw.parse().map_err(|_| {
            OAuthError::new(
                ErrorKind::UnsupportedGrantType,
                "Unsupported grant type: `grant_type` is invalid",
            )
        })
    }

    /// Recover the client's credentials and authenticate it.
    ///
    /// Credentials come from the basic authorization header or, failing
    /// that, the request body. The secret is forwarded to the collaborator,
    /// which decides whether the client is confidential.
    async fn authenticate_client(&self, request: &Request) -> Result<Client, OAuthError> {
        let (id, secret) = match request.basic_credentials()? {
            Some(credentials) => credentials,
            None => match request.param("client_id") {
                Some(id) => (
                    id.to_owned(),
                    request.param("client_secret").map(str::to_owned),
                ),
                None => {
                    return Err(OAuthError::new(
                        ErrorKind::InvalidClient,
                        "Invalid client: cannot retrieve client credentials",
                    ));
                }
            },
        };

        self.storage
            .get_client(&id, secret.as_deref())
            .await?
            .ok_or_else(|| {
                OAuthError::new(ErrorKind::InvalidClient, "Invalid client: client credentials are invalid")
            })
    }

    fn render_token(&self, token: &Token, response: &mut Response) -> Result<(), OAuthError> {
        let lifetime = token
            .access_token_expires_at
            .map(|at| at.signed_duration_since(Utc::now()).num_seconds());
        let bearer = BearerToken::new(
            Some(token.access_token.clone()),
            lifetime,
            token.refresh_token.clone(),
            token.scope.clone(),
        )?;

        // Token responses must never be cached (section 5.1).
        response
            .headers
            .insert("cache-control".to_owned(), "no-store".to_owned());
        response
            .headers
            .insert("pragma".to_owned(), "no-cache".to_owned());
        response.body_json(bearer.to_json());
        Ok(())
    }

    fn render_error(&self, request: &Request, err: &OAuthError, response: &mut Response) {
        response.status = err.status();
        // A failed basic authentication attempt gets a challenge back
        // (rfc6749 section 5.2).
        if err.kind() == ErrorKind::InvalidClient && request.header("authorization").is_some() {
            response
                .headers
                .insert("www-authenticate".to_owned(), "Basic realm=\"Service\"".to_owned());
        }
        response.body_json(err.to_json());
    }
}
