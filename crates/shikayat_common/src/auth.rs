//! Pluggable admin authentication.
//!
//! Credentials are checked against the admin_users table; passwords are
//! stored as SHA-256 hashes, never in source or config.

use crate::error::AuthError;
use crate::store::ComplaintStore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// An authenticated admin identity.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: String,
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError>;
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Authenticator backed by the complaint store's admin_users table.
pub struct StoreAuthenticator {
    store: Arc<ComplaintStore>,
}

impl StoreAuthenticator {
    pub fn new(store: Arc<ComplaintStore>) -> Self {
        Self { store }
    }
}

impl Authenticator for StoreAuthenticator {
    fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let admin = self
            .store
            .find_admin(&credentials.username)
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let admin = match admin {
            Some(admin) if admin.is_active => admin,
            Some(_) => {
                warn!("Login attempt for deactivated admin '{}'", credentials.username);
                return Err(AuthError::InvalidCredentials);
            }
            None => return Err(AuthError::InvalidCredentials),
        };

        if admin.password_hash != hash_password(&credentials.password) {
            return Err(AuthError::InvalidCredentials);
        }

        if let Err(e) = self.store.touch_last_login(admin.id) {
            warn!("Could not update last_login for '{}': {}", admin.username, e);
        }
        info!("Admin '{}' logged in", admin.username);

        Ok(Principal {
            id: admin.id,
            username: admin.username,
            full_name: admin.full_name,
            role: admin.role,
        })
    }
}
