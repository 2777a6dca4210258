// src/session.rs
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::shift_store::{PublicUser, Role, ShiftStore, StoreError};

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    // Covers unknown email, wrong password, and role mismatch alike; login
    // failures are not broken down for the caller.
    #[error("Invalid email, password, or role")]
    InvalidCredentials,
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Session is invalid or has expired")]
    InvalidSession,
    #[error("Administrator access required")]
    AdminRequired,
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    expires_at: DateTime<Utc>,
}

// --- Session Service ---

/// Issues opaque bearer tokens and resolves them back to users. Held on the
/// application state and passed to every handler explicitly; the aggregation
/// core never sees ambient auth state.
#[derive(Clone)]
pub struct SessionService {
    store: ShiftStore,
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(store: ShiftStore, ttl_hours: i64) -> Self {
        Self {
            store,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Creates the account and logs it straight in.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<(String, PublicUser), StoreError> {
        let user = self
            .store
            .register_user(name, email, role, &hash_password(password))?;
        let token = self.issue_token(&user.id);
        Ok((token, user.public()))
    }

    /// Verifies the credential triple and issues a session token. The
    /// requested role must match the stored one; an admin cannot log in
    /// through the user flow or vice versa.
    pub fn login(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<(String, PublicUser), AuthError> {
        let user = self.store.user_by_email(email).ok_or_else(|| {
            warn!("Login failed, unknown email: {}", email);
            AuthError::InvalidCredentials
        })?;

        if user.password_hash != hash_password(password) {
            warn!("Login failed, bad password for {}", email);
            return Err(AuthError::InvalidCredentials);
        }
        if user.role != role {
            warn!(
                "Login failed, role mismatch for {}: requested {:?}, stored {:?}",
                email, role, user.role
            );
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token(&user.id);
        info!("Issued session for {} ({:?})", user.id, user.role);
        Ok((token, user.public()))
    }

    fn issue_token(&self, user_id: &str) -> String {
        let token: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect();
        self.sessions.lock().unwrap().insert(
            token.clone(),
            Session {
                user_id: user_id.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        token
    }

    /// Resolves a bearer token to the authenticated user. Expired sessions
    /// are dropped on the spot.
    pub fn resolve(&self, token: &str) -> Result<PublicUser, AuthError> {
        let user_id = {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions.get(token).ok_or(AuthError::InvalidSession)?;
            if session.expires_at <= Utc::now() {
                sessions.remove(token);
                warn!("Rejected expired session token");
                return Err(AuthError::InvalidSession);
            }
            session.user_id.clone()
        };

        self.store
            .user(&user_id)
            .map(|u| u.public())
            .ok_or(AuthError::InvalidSession)
    }

    /// Like `resolve`, but the session must belong to an administrator.
    pub fn resolve_admin(&self, token: &str) -> Result<PublicUser, AuthError> {
        let user = self.resolve(token)?;
        if user.role != Role::Admin {
            warn!("Non-admin {} attempted an admin operation", user.id);
            return Err(AuthError::AdminRequired);
        }
        Ok(user)
    }
}
