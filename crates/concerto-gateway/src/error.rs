//! Gateway error taxonomy.
//!
//! Every error is rendered where it is detected; nothing is retried.

use crate::auth::Challenge;
use crate::reply::{reply, Reply, TEXT_PLAIN};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use concerto_git::CodecError;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced while serving a request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or rejected credentials.
    #[error("authentication required")]
    Unauthorized(Arc<Challenge>),

    /// `info/refs` without a `service` parameter (dumb HTTP).
    #[error("dumb HTTP is not supported")]
    MissingService,

    /// `info/refs` for a service other than upload-pack or receive-pack.
    #[error("unsupported service: {0}")]
    UnsupportedService(String),

    /// No repository backs the application.
    #[error("no such app: {0}")]
    AppNotFound(String),

    /// The path is not a Git endpoint.
    #[error("invalid path")]
    InvalidPath {
        /// Public domain used in the syntax hint.
        domain: String,
    },

    /// The endpoint exists but not for this method.
    #[error("method not allowed")]
    MethodNotAllowed {
        /// Value of the `Allow` header.
        allow: &'static str,
    },

    /// The Git codec could not interpret the request.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The Git subprocess could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The Git subprocess failed.
    #[error("subprocess error: {0}")]
    Subprocess(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::MissingService => StatusCode::FORBIDDEN,
            GatewayError::UnsupportedService(_) => StatusCode::BAD_REQUEST,
            GatewayError::AppNotFound(_) | GatewayError::InvalidPath { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Codec(_)
            | GatewayError::Spawn { .. }
            | GatewayError::Subprocess(_)
            | GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            GatewayError::Unauthorized(challenge) => challenge.reply().into_response(),
            GatewayError::MissingService => reply(
                status,
                [
                    "Please upgrade your git client.",
                    "Concerto does not support git over dumb-http.",
                ],
            ),
            GatewayError::UnsupportedService(_) => reply(
                status,
                ["You can only access Concerto Git repo push and pull commands."],
            ),
            GatewayError::AppNotFound(app) => reply(status, [format!("No such app as {app}.")]),
            GatewayError::InvalidPath { domain } => reply(
                status,
                [
                    "Invalid path.".to_string(),
                    format!("Syntax is: {domain}/<app>.git where <app> is your app's name."),
                ],
            ),
            GatewayError::MethodNotAllowed { allow } => Reply::new(status, ["Method Not Allowed"])
                .header(header::ALLOW, HeaderValue::from_static(allow))
                .into_response(),
            err => {
                tracing::error!(error = %err, "request failed");
                (
                    status,
                    [(header::CONTENT_TYPE, TEXT_PLAIN)],
                    status.canonical_reason().unwrap_or("Internal Server Error"),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_string(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_client_errors() {
        let response = GatewayError::MissingService.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_string(response).await,
            "\n!\tPlease upgrade your git client.\n!\tConcerto does not support git over dumb-http.\n"
        );

        let response = GatewayError::UnsupportedService("git-archive".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = GatewayError::InvalidPath {
            domain: "git.example.com".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_string(response).await,
            "\n!\tInvalid path.\n!\tSyntax is: git.example.com/<app>.git where <app> is your app's name.\n"
        );
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let response = GatewayError::MethodNotAllowed { allow: "HEAD, GET" }.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "HEAD, GET");
        assert_eq!(body_string(response).await, "\n!\tMethod Not Allowed\n");
    }

    #[tokio::test]
    async fn test_server_errors_are_generic() {
        let response = GatewayError::Codec(CodecError::MissingService).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal Server Error");

        let response = GatewayError::Subprocess("exit status: 128".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal Server Error");
    }
}
