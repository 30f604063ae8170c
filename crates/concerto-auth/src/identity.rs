//! Authenticated caller identity.

use std::fmt;

/// The caller a request was authenticated as.
///
/// Lives only as long as the request it is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Authenticated username.
    pub username: String,
}

impl Identity {
    /// Creates an identity for a username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}
