//! Codec error types.

use thiserror::Error;

/// Errors raised while interpreting a smart HTTP request.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The request path is not a smart HTTP endpoint.
    #[error("unrecognized smart HTTP path: {0}")]
    UnrecognizedPath(String),

    /// `info/refs` was requested without a `service` parameter.
    #[error("missing service parameter")]
    MissingService,

    /// The requested service is not one we can run.
    #[error("unsupported service: {0}")]
    UnsupportedService(String),

    /// Invalid pkt-line framing.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),
}
