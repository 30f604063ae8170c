//! Error types for the auth crate.

use thiserror::Error;

/// Errors that can occur while authenticating a caller.
///
/// The gateway collapses all of these into one indistinguishable challenge;
/// the variants exist for logging.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header was sent.
    #[error("missing authorization header")]
    MissingHeader,

    /// The header is not `<scheme> <credentials>`.
    #[error("malformed authorization header")]
    MalformedHeader,

    /// The scheme is not `Basic`.
    #[error("unsupported authorization scheme: {0}")]
    UnsupportedScheme(String),

    /// The credentials are not valid base64.
    #[error("credentials are not valid base64")]
    InvalidEncoding,

    /// The decoded credentials have no `:` separator.
    #[error("credentials have no ':' separator")]
    MissingSeparator,

    /// The validator rejected the username/password pair.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The validator could not reach a verdict.
    #[error("credential backend error: {0}")]
    Backend(String),
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
