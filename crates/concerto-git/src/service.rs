//! Service negotiation.
//!
//! See: https://git-scm.com/docs/http-protocol

use crate::inspect::RequestInspector;
use crate::pktline::Packet;
use crate::{CodecError, Result};
use bytes::{Bytes, BytesMut};
use std::fmt;

/// A Git service that can be run behind the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// `git-upload-pack`: fetch and clone.
    UploadPack,
    /// `git-receive-pack`: push.
    ReceivePack,
}

impl Service {
    /// All supported services.
    pub const ALL: [Service; 2] = [Service::UploadPack, Service::ReceivePack];

    /// Parses a wire service name such as `git-upload-pack`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "git-upload-pack" => Some(Service::UploadPack),
            "git-receive-pack" => Some(Service::ReceivePack),
            _ => None,
        }
    }

    /// The wire name, e.g. `git-upload-pack`.
    pub fn name(self) -> &'static str {
        match self {
            Service::UploadPack => "git-upload-pack",
            Service::ReceivePack => "git-receive-pack",
        }
    }

    /// The `git` subcommand name, e.g. `upload-pack`.
    pub fn subcommand(self) -> &'static str {
        match self {
            Service::UploadPack => "upload-pack",
            Service::ReceivePack => "receive-pack",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the client asked the service to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `GET info/refs`: reference advertisement.
    Advertise,
    /// `POST git-*-pack`: stateless RPC exchange.
    Rpc,
}

/// Everything needed to run one smart HTTP exchange as a subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Negotiated service.
    pub service: Service,
    /// Advertisement or RPC.
    pub action: Action,
    /// Response content type.
    pub content_type: String,
    /// Program to spawn.
    pub program: String,
    /// Arguments, not including the repository path.
    pub args: Vec<String>,
}

impl ServiceDescriptor {
    /// Builds the descriptor for a service and action.
    pub fn new(service: Service, action: Action) -> Self {
        let (content_type, args) = match action {
            Action::Advertise => (
                format!("application/x-{}-advertisement", service.name()),
                vec!["--stateless-rpc".to_string(), "--advertise-refs".to_string()],
            ),
            Action::Rpc => (
                format!("application/x-{}-result", service.name()),
                vec!["--stateless-rpc".to_string()],
            ),
        };

        Self {
            service,
            action,
            content_type,
            program: service.name().to_string(),
            args,
        }
    }

    /// Runs the service through a `git` wrapper binary instead of the
    /// dashed `git-<service>` program.
    ///
    /// `options` go before the subcommand, e.g. `["-c", "uploadpack.allowFilter=true"]`.
    pub fn with_git_program(mut self, program: impl Into<String>, options: &[String]) -> Self {
        self.program = program.into();
        let mut args = options.to_vec();
        args.push(self.service.subcommand().to_string());
        args.append(&mut self.args);
        self.args = args;
        self
    }

    /// Bytes the response-side transform emits before the subprocess output.
    ///
    /// Advertisements start with a `# service=` pkt-line and a flush packet;
    /// RPC responses are passed through untouched.
    pub fn response_prefix(&self) -> Option<Bytes> {
        match self.action {
            Action::Advertise => {
                let mut prefix = BytesMut::new();
                Packet::line(format!("# service={}\n", self.service)).write_to(&mut prefix);
                Packet::Flush.write_to(&mut prefix);
                Some(prefix.freeze())
            }
            Action::Rpc => None,
        }
    }

    /// Creates the request-side transform for this exchange.
    pub fn request_inspector(&self) -> RequestInspector {
        RequestInspector::new(self.service, self.action)
    }
}

/// Determines the Git service from a request path and, for `info/refs`, the
/// already-decoded `service` query parameter.
pub fn negotiate(path: &str, service: Option<&str>) -> Result<ServiceDescriptor> {
    if path.ends_with("/info/refs") {
        let name = service
            .filter(|name| !name.is_empty())
            .ok_or(CodecError::MissingService)?;
        let service =
            Service::from_name(name).ok_or_else(|| CodecError::UnsupportedService(name.into()))?;
        return Ok(ServiceDescriptor::new(service, Action::Advertise));
    }

    Service::ALL
        .into_iter()
        .find(|service| {
            path.strip_suffix(service.name())
                .is_some_and(|rest| rest.ends_with('/'))
        })
        .map(|service| ServiceDescriptor::new(service, Action::Rpc))
        .ok_or_else(|| CodecError::UnrecognizedPath(path.to_string()))
}
