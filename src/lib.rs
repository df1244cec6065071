//! The protocol core of an OAuth 2.0 authorization server.
//!
//! This crate implements the issuance flows of [rfc6749] and the bearer
//! token encoding of [rfc6750] as transport-neutral state machines. It does
//! not speak http itself and it does not persist anything: the surrounding
//! application binds a web server to [`Request`] and [`Response`] and plugs
//! its data layer in through the [`Storage`] trait, while resolution of the
//! authenticated resource owner goes through an [`Authenticator`].
//!
//! ## Endpoints
//!
//! Two flows are exposed. [`AuthorizeEndpoint`] drives the authorization
//! endpoint: it verifies the client and its redirect uri, resolves the
//! resource owner and hands an authorization code or, for the implicit flow,
//! an access token back through a redirect. [`TokenEndpoint`] drives the
//! token endpoint: it authenticates the client, runs the grant named by
//! `grant_type` and renders the issued bundle as a bearer response.
//!
//! ## Errors
//!
//! Every failure is an [`OAuthError`] carrying one of the closed protocol
//! [`ErrorKind`]s. The authorize flow distinguishes failures before and
//! after the redirect uri is trusted: the former only propagate, the latter
//! are additionally rendered as an error redirect to the client.
//!
//! [rfc6749]: https://tools.ietf.org/html/rfc6749
//! [rfc6750]: https://tools.ietf.org/html/rfc6750
#![warn(missing_docs)]

pub mod authorize;
pub mod bearer;
pub mod error;
pub mod generator;
pub mod grant;
pub mod model;
pub mod request;
pub mod response_type;
pub mod scope;
pub mod token;
mod validate;

pub use crate::authorize::{AuthorizeEndpoint, AuthorizeOptions};
pub use crate::bearer::{BearerToken, TokenResponse};
pub use crate::error::{ErrorKind, OAuthError, StorageError};
pub use crate::generator::RandomGenerator;
pub use crate::grant::GrantOptions;
pub use crate::model::{
    Authenticator, AuthorizationCode, Client, GrantKind, Storage, Token, User,
};
pub use crate::request::{Request, Response};
pub use crate::response_type::{Artifact, ResponseKind};
pub use crate::scope::Scope;
pub use crate::token::TokenEndpoint;

#[cfg(test)]
mod tests;
