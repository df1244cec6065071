//! The authorization endpoint flow, rfc6749 section 3.1.
//!
//! The flow is split at a trust boundary. Until the client and its redirect
//! uri have been verified, failures only propagate to the caller: redirecting
//! would send the error to an unvetted address. Once the uri is trusted,
//! failures are additionally rendered as an error redirect so the client
//! application learns the outcome, and still propagate as `Err` to the
//! caller.
use std::borrow::Cow;

use url::Url;

use crate::error::{ErrorKind, OAuthError};
use crate::generator::RandomGenerator;
use crate::grant::{GrantOptions, Issuance};
use crate::model::{Authenticator, Client, GrantKind, Storage, User};
use crate::request::{Request, Response};
use crate::response_type::{Artifact, ResponseKind, ResponseType};
use crate::scope::Scope;
use crate::validate;

/// Policy knobs of the authorize flow.
#[derive(Clone, Debug)]
pub struct AuthorizeOptions {
    /// Accept requests without a `state` parameter.
    ///
    /// Off by default; rfc6749 only recommends `state`, but omitting it
    /// invites csrf against the redirect endpoint.
    pub allow_empty_state: bool,

    /// Issuance policy forwarded to the grant engine.
    pub grant: GrantOptions,
}

impl Default for AuthorizeOptions {
    fn default() -> Self {
        AuthorizeOptions {
            allow_empty_state: false,
            grant: GrantOptions::default(),
        }
    }
}

/// The authorization endpoint.
pub struct AuthorizeEndpoint<'a> {
    storage: &'a dyn Storage,
    authenticator: &'a dyn Authenticator,
    options: AuthorizeOptions,
    generator: &'a RandomGenerator,
}

impl<'a> AuthorizeEndpoint<'a> {
    /// Bind the endpoint to its collaborators and policy.
    pub fn new(
        storage: &'a dyn Storage, authenticator: &'a dyn Authenticator, options: AuthorizeOptions,
        generator: &'a RandomGenerator,
    ) -> Self {
        AuthorizeEndpoint {
            storage,
            authenticator,
            options,
            generator,
        }
    }

    /// Run the flow for one request.
    ///
    /// On success the response carries a redirect to the client with the
    /// issued artifact and the echoed `state`. On failure past the trust
    /// boundary the response carries an error redirect and the error is
    /// still returned.
    pub async fn handle(
        &self, request: &Request, response: &mut Response,
    ) -> Result<Artifact, OAuthError> {
        if request.query.get("allowed").map(String::as_str) == Some("false") {
            return Err(OAuthError::new(
                ErrorKind::AccessDenied,
                "Access denied: user denied access to application",
            ));
        }

        let client = self.resolve_client(request).await?;
        let user = self.resolve_user(request, response).await?;

        // The uri is trusted from here on: either the client supplied one
        // that matched its registration verbatim, or we fall back to the
        // registered one.
        let uri_raw = request
            .param("redirect_uri")
            .unwrap_or(&client.redirect_uris[0])
            .to_owned();
        let uri = uri_raw.parse::<Url>().map_err(|_| {
            OAuthError::new(ErrorKind::ServerError, "registered redirect uri is not a valid URI")
        })?;

        let mut state = None;
        let mut kind = None;
        match self
            .within_boundary(request, response, &client, &user, &uri_raw, &uri, &mut state, &mut kind)
            .await
        {
            Ok(artifact) => Ok(artifact),
            Err(err) => {
                tracing::warn!(client = %client.id, error = %err.wire_code(), "authorization failed, redirecting error");
                self.redirect_error(response, &uri, &err, state.as_deref(), kind);
                Err(err)
            }
        }
    }

    /// Everything that may fail before the redirect uri is trusted.
    async fn resolve_client(&self, request: &Request) -> Result<Client, OAuthError> {
        let client_id = request.param("client_id").ok_or_else(|| {
            OAuthError::new(ErrorKind::InvalidRequest, "Missing parameter: `client_id`")
        })?;
        if !validate::vschar(client_id) {
            return Err(OAuthError::new(ErrorKind::InvalidRequest, "Invalid parameter: `client_id`"));
        }

        let supplied_uri = request.param("redirect_uri");
        if let Some(uri) = supplied_uri {
            if uri.parse::<Url>().is_err() {
                return Err(OAuthError::new(
                    ErrorKind::InvalidRequest,
                    "Invalid request: `redirect_uri` is not a valid URI",
                ));
            }
        }

        let client = self
            .storage
            .get_client(client_id, None)
            .await?
            .ok_or_else(|| {
                OAuthError::new(ErrorKind::InvalidClient, "Invalid client: client credentials are invalid")
            })?;

        if client.grants.is_empty() {
            return Err(OAuthError::new(
                ErrorKind::InvalidClient,
                "Invalid client: missing client `grants`",
            ));
        }
        // The `token` response type is checked against the implicit grant
        // later, inside the boundary; everything else must carry the
        // authorization code grant.
        if request.param("response_type") != Some("token")
            && !client.allows(GrantKind::AuthorizationCode)
        {
            return Err(OAuthError::new(
                ErrorKind::UnauthorizedClient,
                "Unauthorized client: `grant_type` is invalid",
            ));
        }
        if client.redirect_uris.is_empty() {
            return Err(OAuthError::new(
                ErrorKind::InvalidClient,
                "Invalid client: missing client `redirectUri`",
            ));
        }
        if let Some(uri) = supplied_uri {
            if !client.redirect_uris.iter().any(|registered| registered == uri) {
                return Err(OAuthError::new(
                    ErrorKind::InvalidClient,
                    "Invalid client: `redirect_uri` does not match client value",
                ));
            }
        }

        Ok(client)
    }

    /// Delegate resource owner resolution to the authentication collaborator.
    async fn resolve_user(
        &self, request: &Request, response: &mut Response,
    ) -> Result<User, OAuthError> {
        self.authenticator
            .handle(request, response)
            .await?
            .ok_or_else(|| {
                OAuthError::new(
                    ErrorKind::ServerError,
                    "Server error: `handle()` did not return a `user` object",
                )
            })
    }

    /// Everything that may fail once the redirect uri is trusted.
    ///
    /// `state` and `kind` are written as soon as they are known so a failure
    /// later in the flow still renders them on the error redirect.
    #[allow(clippy::too_many_arguments)]
    async fn within_boundary(
        &self, request: &Request, response: &mut Response, client: &Client, user: &User,
        uri_raw: &str, uri: &Url, state: &mut Option<String>, kind: &mut Option<ResponseKind>,
    ) -> Result<Artifact, OAuthError> {
        match request.param("state") {
            None if !self.options.allow_empty_state => {
                return Err(OAuthError::new(ErrorKind::InvalidRequest, "Missing parameter: `state`"));
            }
            None => {}
            Some(value) => {
                if !validate::vschar(value) {
                    return Err(OAuthError::new(ErrorKind::InvalidRequest, "Invalid parameter: `state`"));
                }
                *state = Some(value.to_owned());
            }
        }

        let requested = match request.param("scope") {
            None => None,
            Some(raw) => Some(raw.parse::<Scope>().map_err(|_| {
                OAuthError::new(ErrorKind::InvalidScope, "Invalid parameter: `scope`")
            })?),
        };
        let issuance = Issuance {
            storage: self.storage,
            options: &self.options.grant,
            generator: self.generator,
        };
        let scope = issuance.validate_scope(user, client, requested.as_ref()).await?;

        let resolved = ResponseKind::resolve(request, client)?;
        *kind = Some(resolved);

        let response_type = ResponseType::new(self.storage, &self.options.grant, self.generator);
        let artifact = response_type
            .handle(resolved, client, user, uri_raw, scope.as_ref())
            .await?;

        let mut location = response_type.redirect_uri(uri, &artifact)?;
        if let Some(state) = state.as_deref() {
            resolved.apply_params(&mut location, [("state", state)]);
        }

        response.redirect(location);
        tracing::debug!(client = %client.id, kind = ?resolved, "authorization granted");
        Ok(artifact)
    }

    /// Render an in-boundary failure back to the client application.
    ///
    /// Parameters travel in the component of the resolved response kind;
    /// when the failure happened before one was resolved they fall back to
    /// the query component.
    fn redirect_error(
        &self, response: &mut Response, uri: &Url, err: &OAuthError, state: Option<&str>,
        kind: Option<ResponseKind>,
    ) {
        let placement = kind.unwrap_or(ResponseKind::Code);
        let mut location = uri.clone();
        let mut params: Vec<(&str, Cow<str>)> = err.iter().collect();
        if let Some(state) = state {
            params.push(("state", Cow::Borrowed(state)));
        }
        placement.apply_params(&mut location, params.iter().map(|(key, value)| (*key, value.as_ref())));
        response.redirect(location);
    }
}
