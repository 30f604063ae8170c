//! # Observability
//!
//! - **Structured logging**: pretty or JSON output, filtered per target
//! - **Request IDs**: every request runs inside a span carrying its ID, and
//!   the ID is echoed in the `x-request-id` response header
//!
//! ```rust,ignore
//! use concerto_gateway::observability::{init_logging, request_id_layer, LogFormat};
//!
//! init_logging("info", LogFormat::Json);
//! let app: axum::Router<()> = axum::Router::new().layer(request_id_layer());
//! ```

mod logging;
pub mod middleware;

pub use logging::{init_logging, LogFormat};
pub use middleware::{request_id_layer, RequestId, RequestIdLayer, REQUEST_ID_HEADER};
