//! Request-side stream transform.
//!
//! The inspector sees every request chunk on its way to the subprocess. It
//! never alters the bytes; it only decodes the leading pkt-lines so the
//! gateway can report what a push or fetch is about to do.

use crate::pktline::{Packet, PktLineDecoder};
use crate::service::{Action, Service};

/// Upper bound on bytes buffered while looking for the command section.
const MAX_INSPECT_BYTES: usize = 64 * 1024;

const ZERO_ID: &str = "0000000000000000000000000000000000000000";

/// Kind of reference update requested by a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdateKind {
    /// The reference is created.
    Create,
    /// The reference is deleted.
    Delete,
    /// The reference is moved.
    Update,
}

/// One `<old> <new> <ref>` command from a receive-pack request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    /// Previous object ID.
    pub old: String,
    /// New object ID.
    pub new: String,
    /// Reference name.
    pub name: String,
}

impl RefUpdate {
    fn parse(line: &str) -> Option<Self> {
        // The first command carries capabilities after a NUL.
        let line = line.split('\0').next()?;
        let mut parts = line.splitn(3, ' ');
        let old = parts.next()?;
        let new = parts.next()?;
        let name = parts.next()?;
        if old.len() < 40 || new.len() < 40 || name.is_empty() {
            return None;
        }
        Some(Self {
            old: old.to_string(),
            new: new.to_string(),
            name: name.to_string(),
        })
    }

    /// Classifies the update.
    pub fn kind(&self) -> RefUpdateKind {
        if self.old.bytes().all(|b| b == b'0') && self.old.len() == ZERO_ID.len() {
            RefUpdateKind::Create
        } else if self.new.bytes().all(|b| b == b'0') && self.new.len() == ZERO_ID.len() {
            RefUpdateKind::Delete
        } else {
            RefUpdateKind::Update
        }
    }
}

/// What the inspector learned about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    /// Reference advertisement; the request body is not inspected.
    Advertise,
    /// A push and its reference updates.
    Push(Vec<RefUpdate>),
    /// A fetch: number of `want` lines and, for protocol v2, the command.
    Fetch {
        /// Objects requested.
        wants: usize,
        /// Protocol v2 `command=` value.
        command: Option<String>,
    },
    /// The command section could not be decoded.
    Unparsed,
}

/// Pass-through transform that decodes the command section of a request.
#[derive(Debug)]
pub struct RequestInspector {
    service: Service,
    action: Action,
    decoder: PktLineDecoder,
    updates: Vec<RefUpdate>,
    wants: usize,
    command: Option<String>,
    done: bool,
    failed: bool,
}

impl RequestInspector {
    /// Creates an inspector for one exchange.
    pub fn new(service: Service, action: Action) -> Self {
        Self {
            service,
            action,
            decoder: PktLineDecoder::new(),
            updates: Vec::new(),
            wants: 0,
            command: None,
            done: action == Action::Advertise,
            failed: false,
        }
    }

    /// Observes one chunk of the request body.
    pub fn observe(&mut self, chunk: &[u8]) {
        if self.done {
            return;
        }

        self.decoder.push(chunk);
        loop {
            match self.decoder.next_packet() {
                Ok(Some(Packet::Flush)) => {
                    self.done = true;
                    break;
                }
                Ok(Some(pkt)) => self.record(&pkt),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, service = %self.service, "request inspection stopped");
                    self.fail();
                    return;
                }
            }
        }

        if !self.done && self.decoder.buffered() > MAX_INSPECT_BYTES {
            self.fail();
        }
        if self.done {
            // Release whatever pack data was buffered behind the flush.
            self.decoder = PktLineDecoder::new();
        }
    }

    fn fail(&mut self) {
        self.done = true;
        self.failed = true;
        self.decoder = PktLineDecoder::new();
    }

    fn record(&mut self, pkt: &Packet) {
        let Some(line) = pkt.text() else {
            return;
        };

        match self.service {
            Service::ReceivePack => {
                if let Some(update) = RefUpdate::parse(line) {
                    self.updates.push(update);
                }
            }
            Service::UploadPack => {
                if line.starts_with("want ") {
                    self.wants += 1;
                } else if let Some(command) = line.strip_prefix("command=") {
                    self.command = Some(command.to_string());
                }
            }
        }
    }

    /// Summarises what was observed.
    pub fn finish(self) -> Inspection {
        if self.action == Action::Advertise {
            return Inspection::Advertise;
        }
        if self.failed {
            return Inspection::Unparsed;
        }
        match self.service {
            Service::ReceivePack => Inspection::Push(self.updates),
            Service::UploadPack => Inspection::Fetch {
                wants: self.wants,
                command: self.command,
            },
        }
    }
}
