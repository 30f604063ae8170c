//! Git smart HTTP codec for Concerto.
//!
//! This crate knows how a smart HTTP request maps onto a Git service
//! subprocess: which program to run, with which arguments, what content type
//! the response carries, and how the byte streams on either side of the
//! subprocess must be framed. It never touches packfile contents.
//!
//! ```
//! use concerto_git::{negotiate, Action, Service};
//!
//! let descriptor = negotiate("/demo.git/info/refs", Some("git-upload-pack")).unwrap();
//! assert_eq!(descriptor.service, Service::UploadPack);
//! assert_eq!(descriptor.action, Action::Advertise);
//! assert_eq!(descriptor.content_type, "application/x-git-upload-pack-advertisement");
//! ```

mod error;
mod inspect;
mod pktline;
mod service;

pub use error::CodecError;
pub use inspect::{Inspection, RefUpdate, RefUpdateKind, RequestInspector};
pub use pktline::{Packet, PktLineDecoder, MAX_PKT_LEN};
pub use service::{negotiate, Action, Service, ServiceDescriptor};

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
