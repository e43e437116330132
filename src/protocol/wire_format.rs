//! Netlink header encoding and decoding.
//!
//! Implements the 16-byte `nlmsghdr` layout:
//! ```text
//! ┌──────────┬────────┬────────┬──────────┬───────────┐
//! │ Length   │ Type   │ Flags  │ Sequence │ Origin ID │
//! │ 4 bytes  │ 2 bytes│ 2 bytes│ 4 bytes  │ 4 bytes   │
//! └──────────┴────────┴────────┴──────────┴───────────┘
//! ```
//!
//! All integers are in native byte order, as netlink requires.

use bytes::{Buf, BufMut};

use crate::error::{IpqError, Result};

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// Netlink message alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Message type tags used by the queue protocol.
pub mod message_type {
    /// Generic netlink error notification (`NLMSG_ERROR`).
    pub const ERROR: u16 = 2;
    /// First type reserved for `ip_queue` (`IPQM_BASE`).
    pub const IPQM_BASE: u16 = 0x10;
    /// Mode negotiation, agent to kernel.
    pub const MODE: u16 = IPQM_BASE + 1;
    /// Verdict, agent to kernel.
    pub const VERDICT: u16 = IPQM_BASE + 2;
    /// Queued packet, kernel to agent.
    pub const PACKET: u16 = IPQM_BASE + 3;
}

/// Header flag constants.
pub mod flags {
    /// The message is a request (`NLM_F_REQUEST`).
    pub const REQUEST: u16 = 0x0001;
}

/// Round `len` up to the netlink alignment.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Symbolic view of a header's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Mode,
    Packet,
    Verdict,
    Error,
    Other(u16),
}

impl From<u16> for MessageType {
    fn from(tag: u16) -> Self {
        match tag {
            message_type::MODE => MessageType::Mode,
            message_type::PACKET => MessageType::Packet,
            message_type::VERDICT => MessageType::Verdict,
            message_type::ERROR => MessageType::Error,
            other => MessageType::Other(other),
        }
    }
}

/// Decoded netlink header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total message size, header included.
    pub length: u32,
    /// Type tag (see [`message_type`]).
    pub message_type: u16,
    /// Flag bits (see [`flags`]).
    pub flags: u16,
    /// Per-process message counter.
    pub sequence: u32,
    /// Netlink port of the sending process.
    pub origin_id: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(message_type: u16, length: u32, flags: u16, sequence: u32, origin_id: u32) -> Self {
        Self {
            length,
            message_type,
            flags,
            sequence,
            origin_id,
        }
    }

    /// Symbolic type tag.
    #[inline]
    pub fn kind(&self) -> MessageType {
        MessageType::from(self.message_type)
    }

    /// Encode header to bytes (native order).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf[..]);
        buf
    }

    /// Append the encoded header to `buf`.
    pub fn encode_into<B: BufMut>(&self, mut buf: B) {
        buf.put_u32_ne(self.length);
        buf.put_u16_ne(self.message_type);
        buf.put_u16_ne(self.flags);
        buf.put_u32_ne(self.sequence);
        buf.put_u32_ne(self.origin_id);
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        let mut cursor = &buf[..HEADER_SIZE];
        Some(Self {
            length: cursor.get_u32_ne(),
            message_type: cursor.get_u16_ne(),
            flags: cursor.get_u16_ne(),
            sequence: cursor.get_u32_ne(),
            origin_id: cursor.get_u32_ne(),
        })
    }

    /// Check the declared length against the datagram it came in.
    pub fn validate(&self, datagram_len: usize) -> Result<()> {
        let length = self.length as usize;
        if length < HEADER_SIZE {
            return Err(IpqError::decode(format!(
                "header length {} is below the {} byte header",
                length, HEADER_SIZE
            )));
        }
        if length > datagram_len {
            return Err(IpqError::decode(format!(
                "truncated message: header claims {} bytes, datagram has {}",
                length, datagram_len
            )));
        }
        Ok(())
    }

    /// Payload size implied by `length`.
    #[inline]
    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_SIZE)
    }

    #[inline]
    pub fn is_request(&self) -> bool {
        self.flags & flags::REQUEST != 0
    }
}

/// Decode and validate the header at the start of a datagram.
pub fn decode_header(buf: &[u8]) -> Result<Header> {
    let header = Header::decode(buf).ok_or_else(|| {
        IpqError::decode(format!(
            "datagram of {} bytes is shorter than the {} byte header",
            buf.len(),
            HEADER_SIZE
        ))
    })?;
    header.validate(buf.len())?;
    Ok(header)
}
