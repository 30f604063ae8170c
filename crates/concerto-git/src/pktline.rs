//! Git pkt-line framing.
//!
//! Each line is prefixed with a 4-character hex length that includes the
//! prefix itself. `0000`, `0001` and `0002` are the flush, delimiter and
//! response-end packets.

use crate::{CodecError, Result};
use bytes::{Buf, Bytes, BytesMut};

/// Largest pkt-line Git will emit, prefix included.
pub const MAX_PKT_LEN: usize = 65520;

/// One framed unit of the pkt-line stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Payload-carrying line; the payload excludes the length prefix.
    Line(Bytes),
    /// `0000`: end of a message section.
    Flush,
    /// `0001`: protocol v2 section separator.
    Delim,
    /// `0002`: protocol v2 end of response.
    ResponseEnd,
}

impl Packet {
    /// A line carrying `payload`.
    pub fn line(payload: impl AsRef<[u8]>) -> Self {
        Self::Line(Bytes::copy_from_slice(payload.as_ref()))
    }

    /// Appends the framed packet to `out`.
    pub fn write_to(&self, out: &mut BytesMut) {
        match self {
            Self::Line(payload) => {
                out.extend_from_slice(format!("{:04x}", payload.len() + 4).as_bytes());
                out.extend_from_slice(payload);
            }
            Self::Flush => out.extend_from_slice(b"0000"),
            Self::Delim => out.extend_from_slice(b"0001"),
            Self::ResponseEnd => out.extend_from_slice(b"0002"),
        }
    }

    /// The framed packet as a standalone buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::new();
        self.write_to(&mut out);
        out.freeze()
    }

    /// Line payload as UTF-8 without its trailing LF.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Line(payload) => std::str::from_utf8(payload)
                .ok()
                .map(|s| s.strip_suffix('\n').unwrap_or(s)),
            _ => None,
        }
    }
}

/// Incremental pkt-line decoder.
///
/// Bytes arrive in arbitrary chunks from the network; `push` appends them and
/// `next_packet` yields complete packets as soon as they are buffered.
#[derive(Debug, Default)]
pub struct PktLineDecoder {
    buf: BytesMut,
}

impl PktLineDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Number of bytes buffered but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decodes the next complete packet, or `None` if more bytes are needed.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        if self.buf.len() < 4 {
            return Ok(None);
        }

        let len_str = std::str::from_utf8(&self.buf[..4])
            .map_err(|_| CodecError::InvalidPktLine("invalid length prefix".to_string()))?;
        let len = usize::from_str_radix(len_str, 16)
            .map_err(|_| CodecError::InvalidPktLine(format!("invalid length {len_str:?}")))?;

        let special = match len {
            0 => Some(Packet::Flush),
            1 => Some(Packet::Delim),
            2 => Some(Packet::ResponseEnd),
            3 => return Err(CodecError::InvalidPktLine("length too small".to_string())),
            _ => None,
        };
        if let Some(pkt) = special {
            self.buf.advance(4);
            return Ok(Some(pkt));
        }

        if len > MAX_PKT_LEN {
            return Err(CodecError::InvalidPktLine(format!("length {len} too large")));
        }
        if self.buf.len() < len {
            return Ok(None);
        }

        self.buf.advance(4);
        Ok(Some(Packet::Line(self.buf.split_to(len - 4).freeze())))
    }
}
