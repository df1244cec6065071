//! Resolves the `response_type` parameter and produces the authorization
//! artifact it names, rfc6749 section 3.1.1.
//!
//! The two kinds also dictate where their parameters travel on the redirect:
//! `code` responses use the query component, `token` responses the fragment,
//! so the access token never reaches the client's server.
use chrono::{Duration, Utc};
use url::Url;

use crate::bearer::BearerToken;
use crate::error::{ErrorKind, OAuthError};
use crate::generator::RandomGenerator;
use crate::grant::{GrantOptions, ImplicitGrant};
use crate::model::{AuthorizationCode, Client, GrantKind, Storage, Token, User};
use crate::request::Request;
use crate::scope::Scope;

/// The supported response types, tagged so dispatch is exhaustive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseKind {
    /// `response_type=code`: issue an authorization code.
    Code,
    /// `response_type=token`: issue an access token directly (implicit flow).
    Token,
}

impl ResponseKind {
    /// Resolve the response type named by the request.
    ///
    /// The `token` type runs the implicit grant, so it additionally requires
    /// that grant on the client's allow-list.
    pub fn resolve(request: &Request, client: &Client) -> Result<Self, OAuthError> {
        let raw = request.param("response_type").ok_or_else(|| {
            OAuthError::new(ErrorKind::InvalidRequest, "Missing parameter: `response_type`")
        })?;

        match raw {
            "code" => Ok(ResponseKind::Code),
            "token" => {
                if !client.allows(GrantKind::Implicit) {
                    return Err(OAuthError::new(
                        ErrorKind::UnauthorizedClient,
                        "Unauthorized client: `grant_type` is invalid",
                    ));
                }
                Ok(ResponseKind::Token)
            }
            _ => Err(OAuthError::new(
                ErrorKind::UnsupportedResponseType,
                "Unsupported response type: `response_type` is not supported",
            )),
        }
    }

    /// Attach parameters to the redirect uri in this kind's component.
    pub fn apply_params<'p, I>(self, url: &mut Url, params: I)
    where
        I: IntoIterator<Item = (&'p str, &'p str)>,
    {
        match self {
            ResponseKind::Code => {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in params {
                    pairs.append_pair(key, value);
                }
            }
            ResponseKind::Token => {
                let mut fragment = url
                    .fragment()
                    .map(|existing| format!("{}&", existing))
                    .unwrap_or_default();
                let mut serializer = url::form_urlencoded::Serializer::new(String::new());
                for (key, value) in params {
                    serializer.append_pair(key, value);
                }
                fragment.push_str(&serializer.finish());
                url.set_fragment(Some(&fragment));
            }
        }
    }
}

/// What the authorize flow handed back to the user-agent.
#[derive(Clone, Debug)]
pub enum Artifact {
    /// An authorization code, to be exchanged at the token endpoint.
    Code(AuthorizationCode),
    /// A token bundle, issued directly by the implicit flow.
    Token(Token),
}

/// Produces the artifact for a resolved response kind.
pub struct ResponseType<'a> {
    storage: &'a dyn Storage,
    options: &'a GrantOptions,
    generator: &'a RandomGenerator,
}

impl<'a> ResponseType<'a> {
    /// Bind the engine to its collaborator and policy.
    pub fn new(
        storage: &'a dyn Storage, options: &'a GrantOptions, generator: &'a RandomGenerator,
    ) -> Self {
        ResponseType {
            storage,
            options,
            generator,
        }
    }

    /// Issue the artifact for an approved authorization.
    pub async fn handle(
        &self, kind: ResponseKind, client: &Client, user: &User, redirect_uri: &str,
        scope: Option<&Scope>,
    ) -> Result<Artifact, OAuthError> {
        match kind {
            ResponseKind::Code => {
                let code = self.authorization_code(client, user, redirect_uri, scope).await?;
                Ok(Artifact::Code(code))
            }
            ResponseKind::Token => {
                let grant = ImplicitGrant::new(self.storage, self.options, self.generator);
                let token = grant.handle(client, user, scope).await?;
                Ok(Artifact::Token(token))
            }
        }
    }

    async fn authorization_code(
        &self, client: &Client, user: &User, redirect_uri: &str, scope: Option<&Scope>,
    ) -> Result<AuthorizationCode, OAuthError> {
        let value = match self
            .storage
            .generate_authorization_code(client, user, scope)
            .await?
        {
            Some(value) => value,
            None => self.generator.generate()?,
        };

        let code = AuthorizationCode {
            code: value,
            expires_at: Utc::now() + Duration::seconds(self.options.authorization_code_lifetime),
            redirect_uri: redirect_uri.to_owned(),
            scope: scope.cloned(),
            client_id: client.id.clone(),
            user: user.clone(),
        };

        tracing::debug!(client = %code.client_id, "persisting authorization code");
        Ok(self.storage.save_authorization_code(code).await?)
    }

    /// Render the artifact onto the redirect uri.
    pub fn redirect_uri(&self, base: &Url, artifact: &Artifact) -> Result<Url, OAuthError> {
        let mut url = base.clone();
        match artifact {
            Artifact::Code(code) => {
                ResponseKind::Code.apply_params(&mut url, [("code", code.code.as_str())]);
            }
            Artifact::Token(token) => {
                let lifetime = token
                    .access_token_expires_at
                    .map(|at| at.signed_duration_since(Utc::now()).num_seconds());
                let bearer = BearerToken::new(
                    Some(token.access_token.clone()),
                    lifetime,
                    None,
                    token.scope.clone(),
                )?;
                let pairs = bearer.fragment_pairs();
                ResponseKind::Token
                    .apply_params(&mut url, pairs.iter().map(|(k, v)| (*k, v.as_str())));
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(grants: Vec<GrantKind>) -> Client {
        Client {
            id: "client".into(),
            grants,
            redirect_uris: vec!["https://client.example/cb".into()],
            access_token_lifetime: None,
            refresh_token_lifetime: None,
        }
    }

    fn with_response_type(value: Option<&str>) -> Request {
        let mut request = Request::default();
        if let Some(value) = value {
            request.query.insert("response_type".into(), value.into());
        }
        request
    }

    #[test]
    fn resolve_code() {
        let kind = ResponseKind::resolve(
            &with_response_type(Some("code")),
            &client(vec![GrantKind::AuthorizationCode]),
        )
        .unwrap();
        assert_eq!(kind, ResponseKind::Code);
    }

    #[test]
    fn token_requires_implicit_grant() {
        let request = with_response_type(Some("token"));

        let err = ResponseKind::resolve(&request, &client(vec![GrantKind::AuthorizationCode]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnauthorizedClient);

        let kind = ResponseKind::resolve(&request, &client(vec![GrantKind::Implicit])).unwrap();
        assert_eq!(kind, ResponseKind::Token);
    }

    #[test]
    fn unknown_and_missing_response_type() {
        let permissive = client(vec![GrantKind::AuthorizationCode, GrantKind::Implicit]);

        let err = ResponseKind::resolve(&with_response_type(Some("id_token")), &permissive)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedResponseType);

        let err = ResponseKind::resolve(&with_response_type(None), &permissive).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.message(), "Missing parameter: `response_type`");
    }

    #[test]
    fn code_params_go_in_query() {
        let mut url: Url = "https://client.example/cb".parse().unwrap();
        ResponseKind::Code.apply_params(&mut url, [("code", "abc"), ("state", "xyz")]);
        assert_eq!(url.as_str(), "https://client.example/cb?code=abc&state=xyz");
    }

    #[test]
    fn token_params_go_in_fragment() {
        let mut url: Url = "https://client.example/cb".parse().unwrap();
        ResponseKind::Token.apply_params(&mut url, [("access_token", "abc")]);
        ResponseKind::Token.apply_params(&mut url, [("state", "xyz")]);
        assert_eq!(url.fragment(), Some("access_token=abc&state=xyz"));
        assert_eq!(url.query(), None);
    }
}
