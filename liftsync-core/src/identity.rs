//! Identity provider boundary and the auth session built on it.
//!
//! The coordinator only needs "current user id or none". [`AuthSession`]
//! adds the login/register/sign-out flow with a status stream, and keeps the
//! `users/{uid}` document in step with the provider's accounts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::User;
use crate::store::{DocumentPath, Record, RemoteStore, StoreError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Email and password must not be empty.")]
    EmptyCredentials,

    #[error("{0}")]
    Provider(String),

    #[error("User data not found")]
    UserNotFound,

    #[error("{0}")]
    Store(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Store(e.to_string())
    }
}

/// Black-box identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    fn current_user_id(&self) -> Option<String>;

    /// Signs in and returns the user id.
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError>;

    /// Creates an account, signs it in and returns the new user id.
    async fn create_account(&self, email: &str, password: &str) -> Result<String, AuthError>;

    async fn sign_out(&self);
}

struct Account {
    user_id: String,
    password: String,
}

/// In-process identity provider with an optional signed-in user.
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<String>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that already has `user_id` signed in.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let identity = Self::new();
        *identity.current.lock() = Some(user_id.into());
        identity
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.current.lock().clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let user_id = {
            let accounts = self.accounts.lock();
            match accounts.get(email) {
                Some(account) if account.password == password => account.user_id.clone(),
                _ => return Err(AuthError::Provider("Invalid email or password.".to_string())),
            }
        };
        *self.current.lock() = Some(user_id.clone());
        Ok(user_id)
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let user_id = {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(email) {
                return Err(AuthError::Provider(
                    "The email address is already in use by another account.".to_string(),
                ));
            }
            let user_id = Uuid::new_v4().simple().to_string();
            accounts.insert(
                email.to_string(),
                Account {
                    user_id: user_id.clone(),
                    password: password.to_string(),
                },
            );
            user_id
        };
        *self.current.lock() = Some(user_id.clone());
        Ok(user_id)
    }

    async fn sign_out(&self) {
        *self.current.lock() = None;
    }
}

/// Authentication status published by [`AuthSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Unauthenticated,
    Loading,
    Authenticated(User),
    Error(String),
}

/// Login/register/sign-out flow over an [`IdentityProvider`].
pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn RemoteStore>,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn RemoteStore>) -> Self {
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        Self {
            provider,
            store,
            state,
        }
    }

    /// Status stream; the receiver sees the current state immediately.
    pub fn status(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn provider(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.provider)
    }

    /// Picks up a user the provider already has signed in.
    pub async fn restore(&self) -> AuthState {
        match self.provider.current_user_id() {
            Some(user_id) => {
                self.state.send_replace(AuthState::Loading);
                let result = self.load_user(&user_id).await;
                self.settle(result);
            }
            None => {
                self.state.send_replace(AuthState::Unauthenticated);
            }
        }
        self.state()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.check_credentials(email, password)?;
        self.state.send_replace(AuthState::Loading);

        let result = match self.provider.sign_in(email, password).await {
            Ok(user_id) => self.load_user(&user_id).await,
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    /// Creates the account and its `users/{uid}` document.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.check_credentials(email, password)?;
        self.state.send_replace(AuthState::Loading);

        let result = async {
            let user_id = self.provider.create_account(email, password).await?;
            let user = User::new(user_id.as_str(), email);
            self.store
                .set(&DocumentPath::user(&user_id), user.to_fields())
                .await?;
            info!("Registered user {}", user_id);
            self.load_user(&user_id).await
        }
        .await;
        self.settle(result)
    }

    pub async fn sign_out(&self) {
        self.provider.sign_out().await;
        self.state.send_replace(AuthState::Unauthenticated);
    }

    /// Reads the `users/{uid}` document.
    pub async fn load_user(&self, user_id: &str) -> Result<User, AuthError> {
        let doc = self
            .store
            .get_document(&DocumentPath::user(user_id))
            .await?
            .ok_or(AuthError::UserNotFound)?;
        User::from_document(&doc).map_err(|e| AuthError::Store(e.to_string()))
    }

    fn check_credentials(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if email.is_empty() || password.is_empty() {
            let err = AuthError::EmptyCredentials;
            self.state.send_replace(AuthState::Error(err.to_string()));
            return Err(err);
        }
        Ok(())
    }

    fn settle(&self, result: Result<User, AuthError>) -> Result<User, AuthError> {
        match &result {
            Ok(user) => {
                self.state.send_replace(AuthState::Authenticated(user.clone()));
            }
            Err(e) => {
                warn!("Authentication failed: {}", e);
                self.state.send_replace(AuthState::Error(e.to_string()));
            }
        }
        result
    }
}
