//! Request ID generation and propagation.

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied request ID that is reused.
const MAX_REQUEST_ID_LEN: usize = 128;

type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

type MiddlewareFn = fn(Request, Next) -> MiddlewareFuture;

/// Layer returned by [`request_id_layer`].
pub type RequestIdLayer = axum::middleware::FromFnLayer<MiddlewareFn, (), (Request,)>;

/// Request ID extension type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Create a request ID layer.
pub fn request_id_layer() -> RequestIdLayer {
    axum::middleware::from_fn(request_id_middleware_fn)
}

fn request_id_middleware_fn(request: Request, next: Next) -> MiddlewareFuture {
    Box::pin(request_id_middleware(request, next))
}

/// Reuses the client's `x-request-id` when it is short and printable,
/// otherwise generates a UUID.
async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(request).await;

        tracing::debug!(
            status = response.status().as_u16(),
            duration_ms = %format!("{:.2}", start.elapsed().as_secs_f64() * 1000.0),
            "Request completed"
        );

        if let Ok(header_value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value);
        }
        response
    }
    .instrument(span)
    .await
}
