//! Serializes an issued token pair into the canonical bearer response,
//! rfc6750 section 4.
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, OAuthError};
use crate::scope::Scope;

/// The wire shape of a token response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    /// The access token issued by the authorization server.
    pub access_token: String,

    /// The type of the token issued.
    pub token_type: String,

    /// The lifetime in seconds of the access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// The refresh token, which can be used to obtain new access tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// The scope, which limits the permissions on the access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// An issued token pair ready for encoding as a bearer response.
#[derive(Clone, Debug)]
pub struct BearerToken {
    access_token: String,
    access_token_lifetime: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<Scope>,
}

impl BearerToken {
    /// Assemble a bearer response value.
    ///
    /// An absent access token is a caller contract violation, not a protocol
    /// error the requesting party could have caused.
    pub fn new(
        access_token: Option<String>, access_token_lifetime: Option<i64>,
        refresh_token: Option<String>, scope: Option<Scope>,
    ) -> Result<Self, OAuthError> {
        let access_token = access_token.ok_or_else(|| {
            OAuthError::new(ErrorKind::InvalidArgument, "Missing parameter: `accessToken`")
        })?;

        Ok(BearerToken {
            access_token,
            access_token_lifetime,
            refresh_token,
            scope,
        })
    }

    /// The canonical response value.
    ///
    /// `expires_in` appears only when a lifetime was supplied, `refresh_token`
    /// and `scope` only when present.
    pub fn to_response(&self) -> TokenResponse {
        TokenResponse {
            access_token: self.access_token.clone(),
            token_type: "Bearer".to_owned(),
            expires_in: self.access_token_lifetime,
            refresh_token: self.refresh_token.clone(),
            scope: self.scope.as_ref().map(Scope::to_string),
        }
    }

    /// Encode as the json body of a token response.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_response()).expect("token response serialization is infallible")
    }

    /// The key-value pairs for a fragment rendering, in wire order.
    ///
    /// Used by the implicit flow, which transports the token in the redirect
    /// fragment instead of a body.
    pub fn fragment_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("access_token", self.access_token.clone()),
            ("token_type", "Bearer".to_owned()),
        ];
        if let Some(expires_in) = self.access_token_lifetime {
            pairs.push(("expires_in", expires_in.to_string()));
        }
        if let Some(scope) = &self.scope {
            pairs.push(("scope", scope.to_string()));
        }
        pairs
    }
}
