//! Authentication for the Concerto Git gateway.
//!
//! This crate provides:
//! - **Basic credentials**: parsing of `Authorization: Basic ...` headers
//! - **Identities**: the authenticated caller attached to a request
//! - **Credential validators**: the pluggable verdict behind every login
//!
//! # Example
//!
//! ```
//! use concerto_auth::{BasicCredentials, CredentialValidator, EqualityValidator};
//!
//! # #[tokio::main]
//! # async fn main() {
//! // "alice:alice"
//! let creds = BasicCredentials::from_header("Basic YWxpY2U6YWxpY2U=").unwrap();
//! assert_eq!(creds.username, "alice");
//!
//! let identity = EqualityValidator
//!     .validate(&creds.username, creds.password.expose())
//!     .await
//!     .unwrap();
//! assert_eq!(identity.username, "alice");
//! # }
//! ```

mod basic;
mod error;
mod identity;
mod validator;

pub use basic::{BasicCredentials, Password};
pub use error::{AuthError, Result};
pub use identity::Identity;
pub use validator::{CredentialValidator, EqualityValidator, StaticValidator};
