//! End-to-end tests of the two endpoint flows against an in-memory
//! persistence collaborator.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use url::Url;

use crate::error::{OAuthError, StorageError};
use crate::model::{Authenticator, AuthorizationCode, Client, GrantKind, Storage, Token, User};
use crate::request::{Request, Response};
use crate::scope::Scope;


pub const CLIENT_ID: &str = "client-1";
pub const CLIENT_SECRET: &str = "s3cr3t";
pub const REDIRECT_URI: &str = "https://client.example/cb";

/// In-memory collaborator, recording every mutation for assertions.
#[derive(Default)]
pub struct MemoryStorage {
    clients: HashMap<String, (Client, Option<String>)>,
    codes: RefCell<HashMap<String, AuthorizationCode>>,
    tokens: RefCell<HashMap<String, Token>>,
    users: HashMap<String, (String, User)>,
    client_user: Option<User>,
    reject_scope: Cell<bool>,
    fail_revoke_token: Cell<bool>,
    fail_save_token: Cell<bool>,
    pub revoked_codes: RefCell<Vec<String>>,
    pub revoked_tokens: RefCell<Vec<String>>,
    pub saved_tokens: RefCell<Vec<Token>>,
}

impl MemoryStorage {
    pub fn with_client(client: Client, secret: Option<&str>) -> Self {
        let mut storage = MemoryStorage::default();
        storage.add_client(client, secret);
        storage
    }

    pub fn add_client(&mut self, client: Client, secret: Option<&str>) {
        self.clients
            .insert(client.id.clone(), (client, secret.map(str::to_owned)));
    }

    pub fn add_user(&mut self, username: &str, password: &str, user: User) {
        self.users
            .insert(username.to_owned(), (password.to_owned(), user));
    }

    pub fn set_client_user(&mut self, user: User) {
        self.client_user = Some(user);
    }

    pub fn seed_code(&self, code: AuthorizationCode) {
        self.codes.borrow_mut().insert(code.code.clone(), code);
    }

    pub fn seed_token(&self, token: Token) {
        let refresh = token.refresh_token.clone().expect("seeded token needs a refresh value");
        self.tokens.borrow_mut().insert(refresh, token);
    }

    /// Make the scope hook reject every request that carries a scope.
    pub fn reject_scopes(&self) {
        self.reject_scope.set(true);
    }

    /// Make `revoke_token` report the token as already gone.
    pub fn fail_token_revocation(&self) {
        self.fail_revoke_token.set(true);
    }

    /// Make `save_token` fail as if the backing store were down.
    pub fn fail_token_persistence(&self) {
        self.fail_save_token.set(true);
    }
}

#[async_trait(?Send)]
impl Storage for MemoryStorage {
    async fn get_client(&self, id: &str, secret: Option<&str>) -> Result<Option<Client>, StorageError> {
        Ok(self.clients.get(id).and_then(|(client, registered)| {
            match registered {
                // A confidential client requires the exact secret.
                Some(expected) if secret != Some(expected.as_str()) => None,
                _ => Some(client.clone()),
            }
        }))
    }

    async fn save_authorization_code(
        &self, code: AuthorizationCode,
    ) -> Result<AuthorizationCode, StorageError> {
        self.codes.borrow_mut().insert(code.code.clone(), code.clone());
        Ok(code)
    }

    async fn get_authorization_code(&self, code: &str) -> Result<Option<AuthorizationCode>, StorageError> {
        Ok(self.codes.borrow().get(code).cloned())
    }

    async fn revoke_authorization_code(&self, code: &AuthorizationCode) -> Result<bool, StorageError> {
        let removed = self.codes.borrow_mut().remove(&code.code).is_some();
        if removed {
            self.revoked_codes.borrow_mut().push(code.code.clone());
        }
        Ok(removed)
    }

    async fn get_refresh_token(&self, refresh_token: &str) -> Result<Option<Token>, StorageError> {
        Ok(self.tokens.borrow().get(refresh_token).cloned())
    }

    async fn revoke_token(&self, token: &Token) -> Result<bool, StorageError> {
        if self.fail_revoke_token.get() {
            return Ok(false);
        }
        let refresh = token.refresh_token.as_deref().unwrap_or_default();
        let removed = self.tokens.borrow_mut().remove(refresh).is_some();
        if removed {
            self.revoked_tokens.borrow_mut().push(refresh.to_owned());
        }
        Ok(removed)
    }

    async fn save_token(&self, token: Token) -> Result<Token, StorageError> {
        if self.fail_save_token.get() {
            return Err(StorageError::new("token store unavailable"));
        }
        if let Some(refresh) = &token.refresh_token {
            self.tokens.borrow_mut().insert(refresh.clone(), token.clone());
        }
        self.saved_tokens.borrow_mut().push(token.clone());
        Ok(token)
    }

    async fn get_user(&self, username: &str, password: &str) -> Result<Option<User>, StorageError> {
        Ok(self.users.get(username).and_then(|(expected, user)| {
            if expected == password {
                Some(user.clone())
            } else {
                None
            }
        }))
    }

    async fn get_user_from_client(&self, _client: &Client) -> Result<Option<User>, StorageError> {
        Ok(self.client_user.clone())
    }

    async fn validate_scope(
        &self, _user: &User, _client: &Client, scope: Option<&Scope>,
    ) -> Result<Option<Scope>, StorageError> {
        if self.reject_scope.get() {
            return Ok(None);
        }
        Ok(scope.cloned())
    }
}

/// Authenticator resolving every request to the same user.
pub struct Approve(pub User);

#[async_trait(?Send)]
impl Authenticator for Approve {
    async fn handle(
        &self, _request: &Request, _response: &mut Response,
    ) -> Result<Option<User>, OAuthError> {
        Ok(Some(self.0.clone()))
    }
}

/// Authenticator that resolves no user, violating its contract.
pub struct NoUser;

#[async_trait(?Send)]
impl Authenticator for NoUser {
    async fn handle(
        &self, _request: &Request, _response: &mut Response,
    ) -> Result<Option<User>, OAuthError> {
        Ok(None)
    }
}

pub fn resource_owner() -> User {
    User { id: "user-7".into() }
}

pub fn client_with_grants(grants: Vec<GrantKind>) -> Client {
    Client {
        id: CLIENT_ID.into(),
        grants,
        redirect_uris: vec![REDIRECT_URI.into()],
        access_token_lifetime: None,
        refresh_token_lifetime: None,
    }
}

pub fn get_request(query: &[(&str, &str)]) -> Request {
    Request {
        method: "GET".into(),
        query: query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ..Request::default()
    }
}

pub fn post_request(body: &[(&str, &str)]) -> Request {
    Request {
        method: "POST".into(),
        body: body
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ..Request::default()
    }
}

/// The query parameters of the response's redirect location.
pub fn location_query(response: &Response) -> HashMap<String, String> {
    let url: Url = response.location().expect("expected a redirect").parse().unwrap();
    url.query_pairs().into_owned().collect()
}

/// The fragment parameters of the response's redirect location.
pub fn location_fragment(response: &Response) -> HashMap<String, String> {
    let url: Url = response.location().expect("expected a redirect").parse().unwrap();
    let fragment = url.fragment().expect("expected a fragment");
    url::form_urlencoded::parse(fragment.as_bytes())
        .into_owned()
        .collect()
}
