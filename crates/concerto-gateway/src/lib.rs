//! # Concerto Gateway
//!
//! Serves Git smart HTTP (`info/refs`, `git-upload-pack`, `git-receive-pack`)
//! by authenticating the caller, resolving the application's repository and
//! piping the exchange through a Git subprocess.
//!
//! ```text
//! request ─▶ routes ─▶ auth ─▶ resolver ─▶ bridge ─▶ git-<service>-pack
//!                 │         │          │         │
//!                 └─────────┴──────────┴─────────┴─▶ reply (text/plain)
//! ```
//!
//! ## Modules
//!
//! - [`routes`]: rule table, dispatcher and router assembly
//! - [`auth`]: Basic authentication gate and the 401 challenge
//! - [`resolver`]: application name to repository directory
//! - [`bridge`]: subprocess spawning and stream piping
//! - [`reply`]: plain-text envelope for gateway-authored responses
//! - [`config`]: startup configuration

pub mod auth;
pub mod bridge;
pub mod config;
pub mod error;
pub mod gunzip;
pub mod hardening;
pub mod observability;
pub mod reply;
pub mod resolver;
pub mod routes;
pub mod server;

pub use crate::auth::{AuthGate, Challenge};
pub use crate::bridge::ProtocolBridge;
pub use crate::config::{ConfigError, GatewayConfig};
pub use crate::error::GatewayError;
pub use crate::reply::{reply, Reply};
pub use crate::resolver::{RepositoryHandle, RepositoryResolver};
pub use crate::routes::{create_router, AppState};
