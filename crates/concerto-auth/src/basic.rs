//! HTTP Basic credentials.

use crate::{AuthError, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use std::fmt;

/// Standard alphabet, padding optional on decode.
const BASIC_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A password that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Wraps a password.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Exposes the password value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Username and password carried by an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Username (everything before the first `:`).
    pub username: String,
    /// Password (everything after the first `:`, may contain `:`).
    pub password: Password,
}

impl BasicCredentials {
    /// Parses an `Authorization` header value.
    ///
    /// The value must be exactly two space-separated tokens, the scheme must
    /// be `Basic` (case-sensitive) and the decoded payload must contain `:`.
    pub fn from_header(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split(' ').collect();
        let [scheme, encoded] = parts.as_slice() else {
            return Err(AuthError::MalformedHeader);
        };

        if *scheme != "Basic" {
            return Err(AuthError::UnsupportedScheme((*scheme).to_string()));
        }

        let decoded = BASIC_ENGINE
            .decode(encoded)
            .map_err(|_| AuthError::InvalidEncoding)?;
        let decoded = String::from_utf8_lossy(&decoded);

        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MissingSeparator)?;

        Ok(Self {
            username: username.to_string(),
            password: Password::new(password),
        })
    }

    /// Encodes the credentials as an `Authorization` header value.
    pub fn to_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password.expose());
        format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn header(raw: &str) -> String {
        format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
    }

    #[test]
    fn test_parse_valid() {
        let creds = BasicCredentials::from_header(&header("alice:secret")).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password.expose(), "secret");
    }

    #[test]
    fn test_password_may_contain_colons() {
        let creds = BasicCredentials::from_header(&header("bob:a:b:c")).unwrap();
        assert_eq!(creds.username, "bob");
        assert_eq!(creds.password.expose(), "a:b:c");
    }

    #[test]
    fn test_empty_username_and_password() {
        let creds = BasicCredentials::from_header(&header(":")).unwrap();
        assert_eq!(creds.username, "");
        assert_eq!(creds.password.expose(), "");
    }

    #[test]
    fn test_unpadded_payload() {
        // "alice:alice" without the trailing '='
        let creds = BasicCredentials::from_header("Basic YWxpY2U6YWxpY2U").unwrap();
        assert_eq!(creds.username, "alice");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            BasicCredentials::from_header(""),
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(
            BasicCredentials::from_header("Basic"),
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(
            BasicCredentials::from_header("Basic  YWxpY2U6YWxpY2U="),
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(
            BasicCredentials::from_header(&header("a:b").replace("Basic", "basic")),
            Err(AuthError::UnsupportedScheme("basic".to_string()))
        );
        assert_eq!(
            BasicCredentials::from_header("Bearer abc"),
            Err(AuthError::UnsupportedScheme("Bearer".to_string()))
        );
        assert_eq!(
            BasicCredentials::from_header("Basic !!!not-base64!!!"),
            Err(AuthError::InvalidEncoding)
        );
        assert_eq!(
            BasicCredentials::from_header(&header("no-separator")),
            Err(AuthError::MissingSeparator)
        );
    }

    #[test]
    fn test_header_roundtrip_and_redaction() {
        let creds = BasicCredentials {
            username: "carol".to_string(),
            password: Password::new("hunter2"),
        };
        assert_eq!(BasicCredentials::from_header(&creds.to_header()).unwrap(), creds);
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    proptest! {
        #[test]
        fn prop_no_separator_is_rejected(raw in "[^:]{0,64}") {
            prop_assert_eq!(
                BasicCredentials::from_header(&header(&raw)),
                Err(AuthError::MissingSeparator)
            );
        }

        #[test]
        fn prop_split_at_first_colon(user in "[^:]{0,32}", pass in ".{0,32}") {
            let creds = BasicCredentials::from_header(&header(&format!("{user}:{pass}"))).unwrap();
            prop_assert_eq!(creds.username, user);
            prop_assert_eq!(creds.password.expose(), pass.as_str());
        }
    }
}
