use super::{AuthError, Authenticator, Session};
use crate::db::models::Role;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use uuid::Uuid;

struct Account {
    id: Uuid,
    /// Argon2id hash in PHC string form.
    password_hash: String,
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Unknown(format!("could not hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Accounts and sessions held in process memory, for tests and local runs
/// without a hosted backend. Tokens are random and die with the process.
#[derive(Default)]
pub struct MemoryAuthenticator {
    accounts: Mutex<HashMap<String, Account>>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemoryAuthenticator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn open_session(&self, user_id: Uuid, email: &str) -> Session {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(40)
            .map(char::from)
            .collect();
        let session = Session {
            user_id,
            email: email.to_owned(),
            access_token: token.clone(),
        };
        self.sessions.lock().insert(token, session.clone());
        session
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl Authenticator for MemoryAuthenticator {
    async fn current_user(&self, token: &str) -> Result<Option<Session>, AuthError> {
        Ok(self.sessions.lock().get(token).cloned())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize(email);
        let (user_id, password_hash) = match self.accounts.lock().get(&email) {
            Some(account) => (account.id, account.password_hash.clone()),
            None => return Err(AuthError::Unauthorized),
        };
        if !verify_password(password, &password_hash) {
            return Err(AuthError::Unauthorized);
        }
        Ok(self.open_session(user_id, &email))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _name: &str,
        role: Role,
    ) -> Result<Session, AuthError> {
        let email = normalize(email);
        if self.accounts.lock().contains_key(&email) {
            return Err(AuthError::AlreadyRegistered(email));
        }
        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4();
        match self.accounts.lock().entry(email.clone()) {
            Entry::Occupied(_) => return Err(AuthError::AlreadyRegistered(email)),
            Entry::Vacant(slot) => {
                slot.insert(Account { id, password_hash });
            }
        }
        debug!("Registered {} as {}", email, role);
        Ok(self.open_session(id, &email))
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        match self.sessions.lock().remove(token) {
            Some(_) => Ok(()),
            None => Err(AuthError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_lifecycle() {
        let auth = MemoryAuthenticator::new();
        let signed_up = auth
            .sign_up("Op@Example.com", "hunter22", "Olga", Role::Operator)
            .await
            .unwrap();
        assert_eq!(signed_up.email, "op@example.com");

        let session = auth.sign_in("op@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user_id, signed_up.user_id);
        assert_ne!(session.access_token, signed_up.access_token);
        assert_eq!(
            auth.current_user(&session.access_token).await.unwrap(),
            Some(session.clone())
        );

        auth.sign_out(&session.access_token).await.unwrap();
        assert_eq!(auth.current_user(&session.access_token).await.unwrap(), None);
        assert!(matches!(
            auth.sign_out(&session.access_token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_duplicates_are_refused() {
        let auth = MemoryAuthenticator::new();
        auth.sign_up("a@example.com", "hunter22", "A", Role::Admin)
            .await
            .unwrap();
        assert!(matches!(
            auth.sign_in("a@example.com", "nope").await,
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(
            auth.sign_up("a@example.com", "other1", "A", Role::Admin).await,
            Err(AuthError::AlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn passwords_are_stored_as_argon2_hashes() {
        let auth = MemoryAuthenticator::new();
        auth.sign_up("h@example.com", "hunter22", "H", Role::Operator)
            .await
            .unwrap();

        let stored = auth.accounts.lock()["h@example.com"].password_hash.clone();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("hunter22"));
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
        assert!(!verify_password("hunter22", "not a phc string"));
    }
}
