//! Auth gate: Basic authentication in front of every Git endpoint.

use crate::error::GatewayError;
use crate::reply::Reply;
use axum::{
    extract::Request,
    http::{header, header::InvalidHeaderValue, HeaderMap, HeaderValue, StatusCode},
};
use concerto_auth::{AuthError, BasicCredentials, CredentialValidator, Identity};
use std::sync::Arc;

/// The 401 response sent for every authentication failure.
///
/// Built once at startup; identical regardless of why authentication failed.
#[derive(Debug, Clone)]
pub struct Challenge {
    www_authenticate: HeaderValue,
    lines: Vec<String>,
}

impl Challenge {
    /// Builds the challenge for a realm.
    pub fn new(
        realm: &str,
        login_hint: &str,
        docs_url: Option<&str>,
    ) -> Result<Self, InvalidHeaderValue> {
        let www_authenticate = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))?;

        let mut lines = vec![
            "WARNING:".to_string(),
            "Do not authenticate with username and password using git.".to_string(),
            format!("Run `{login_hint}` to update your credentials, then retry the git command."),
        ];
        if let Some(url) = docs_url {
            lines.push(format!("See documentation for details: {url}"));
        }

        Ok(Self {
            www_authenticate,
            lines,
        })
    }

    /// Renders the challenge response.
    pub fn reply(&self) -> Reply {
        Reply::new(StatusCode::UNAUTHORIZED, self.lines.iter().cloned())
            .header(header::WWW_AUTHENTICATE, self.www_authenticate.clone())
    }
}

/// Authenticates requests against a [`CredentialValidator`].
#[derive(Debug, Clone)]
pub struct AuthGate {
    validator: Arc<dyn CredentialValidator>,
    challenge: Arc<Challenge>,
}

impl AuthGate {
    /// Creates a gate.
    pub fn new(validator: Arc<dyn CredentialValidator>, challenge: Challenge) -> Self {
        Self {
            validator,
            challenge: Arc::new(challenge),
        }
    }

    /// Authenticates a request, attaching the [`Identity`] to its extensions.
    ///
    /// A request that already carries an identity passes straight through.
    pub async fn authenticate(&self, request: &mut Request) -> Result<Identity, GatewayError> {
        if let Some(identity) = request.extensions().get::<Identity>() {
            return Ok(identity.clone());
        }

        match self.verify(request.headers()).await {
            Ok(identity) => {
                tracing::debug!(user = %identity, "authenticated");
                request.extensions_mut().insert(identity.clone());
                Ok(identity)
            }
            Err(reason) => {
                tracing::debug!(%reason, "authentication rejected");
                Err(GatewayError::Unauthorized(self.challenge.clone()))
            }
        }
    }

    async fn verify(&self, headers: &HeaderMap) -> concerto_auth::Result<Identity> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader)?;

        let credentials = BasicCredentials::from_header(value)?;
        self.validator
            .validate(&credentials.username, credentials.password.expose())
            .await
    }
}
