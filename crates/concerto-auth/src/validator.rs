//! Credential validators.
//!
//! The gateway only depends on the [`CredentialValidator`] contract; which
//! backend answers it is chosen at startup.

use crate::{AuthError, Identity, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Decides whether a username/password pair is acceptable.
#[async_trait]
pub trait CredentialValidator: Send + Sync + std::fmt::Debug {
    /// Validates the pair, returning the identity to attach to the request.
    ///
    /// Rejections return [`AuthError::InvalidCredentials`]; backend failures
    /// return [`AuthError::Backend`]. Callers must not reveal which.
    async fn validate(&self, username: &str, password: &str) -> Result<Identity>;
}

/// Placeholder policy: accepts a login iff the username equals the password.
///
/// Not a real credential check. Useful only for development deployments
/// where an upstream proxy already authenticated the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct EqualityValidator;

#[async_trait]
impl CredentialValidator for EqualityValidator {
    async fn validate(&self, username: &str, password: &str) -> Result<Identity> {
        if constant_time_eq(username.as_bytes(), password.as_bytes()) {
            Ok(Identity::new(username))
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Validates against a fixed username → password table.
#[derive(Default, Clone)]
pub struct StaticValidator {
    users: HashMap<String, String>,
}

impl StaticValidator {
    /// Creates a validator from a table of users.
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    /// Adds a user.
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    /// Number of known users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if no users are configured.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl std::fmt::Debug for StaticValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticValidator")
            .field("users", &self.users.len())
            .finish()
    }
}

#[async_trait]
impl CredentialValidator for StaticValidator {
    async fn validate(&self, username: &str, password: &str) -> Result<Identity> {
        match self.users.get(username) {
            Some(expected) if constant_time_eq(expected.as_bytes(), password.as_bytes()) => {
                Ok(Identity::new(username))
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
