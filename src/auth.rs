use crate::db::models::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod client;
pub mod extract;
pub mod memory;

pub type SharedAuthenticator = Arc<dyn Authenticator>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth backend returned Unauthorized")]
    Unauthorized,
    #[error("an account already exists for {0}")]
    AlreadyRegistered(String),
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("unexpected auth backend response: {0}")]
    Unknown(String),
}

/// A signed-in user. Created on sign-in, dropped on sign-out, and handed to
/// every handler that needs to know who is acting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolves a bearer token. `None` means "not signed in".
    async fn current_user(&self, token: &str) -> Result<Option<Session>, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<Session, AuthError>;

    async fn sign_out(&self, token: &str) -> Result<(), AuthError>;
}
