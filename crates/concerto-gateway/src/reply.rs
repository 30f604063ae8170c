//! Plain-text envelope for gateway-authored responses.
//!
//! Git prints any text/plain error body it receives, so every line is
//! prefixed with `!\t` to stand out in the client's terminal.

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Content type of every gateway-authored body.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Renders lines as `"\n!\t<line>\n!\t<line>\n"`.
pub fn format_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let body: Vec<String> = lines
        .iter()
        .map(|line| format!("!\t{}", line.as_ref()))
        .collect();
    format!("\n{}\n", body.join("\n"))
}

/// A gateway response: status, optional extra headers and message lines.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    lines: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    pub fn new<I, S>(status: StatusCode, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status,
            headers: HeaderMap::new(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a response header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The rendered body.
    pub fn body(&self) -> String {
        format_lines(&self.lines)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let body = self.body();
        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN))],
            body,
        )
            .into_response();
        response.headers_mut().extend(self.headers);
        response
    }
}

/// Shorthand for `Reply::new(status, lines).into_response()`.
pub fn reply<I, S>(status: StatusCode, lines: I) -> Response
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Reply::new(status, lines).into_response()
}
