//! Frame struct: a decoded header plus its payload.
//!
//! Uses `bytes::Bytes` so the payload shares the receive buffer.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::layout::PEER_MSG_SIZE;
use super::wire_format::{decode_header, flags, nlmsg_align, Header, MessageType, HEADER_SIZE};
use crate::error::{IpqError, Result};

/// A complete netlink message.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: Header,
    /// Payload bytes, exactly `header.length - HEADER_SIZE` long.
    pub payload: Bytes,
}

impl Frame {
    /// Split a datagram into the header and payload of its first message.
    ///
    /// Bytes past `header.length` are ignored; use [`Frame::parse_all`] for
    /// datagrams that may carry several messages.
    pub fn parse(datagram: Bytes) -> Result<Self> {
        let header = decode_header(&datagram)?;
        let payload = datagram.slice(HEADER_SIZE..header.length as usize);
        Ok(Self { header, payload })
    }

    /// Split a datagram into every message it carries, in order.
    ///
    /// Each message starts at the aligned end of the previous one. A tail
    /// shorter than a header must be zero padding.
    pub fn parse_all(datagram: Bytes) -> Result<Vec<Self>> {
        let mut frames = Vec::new();
        let mut rest = datagram;

        while rest.len() >= HEADER_SIZE {
            let frame = Self::parse(rest.clone())?;
            let next = nlmsg_align(frame.header.length as usize).min(rest.len());
            frames.push(frame);
            rest.advance(next);
        }

        if rest.iter().any(|&b| b != 0) {
            return Err(IpqError::decode(format!(
                "{} trailing bytes after the last message",
                rest.len()
            )));
        }
        if frames.is_empty() {
            return Err(IpqError::decode("datagram carries no message"));
        }
        Ok(frames)
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[inline]
    pub fn kind(&self) -> MessageType {
        self.header.kind()
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }
}

/// Payload size after applying the kernel's minimum and netlink alignment.
#[inline]
pub fn padded_payload_len(natural: usize) -> usize {
    nlmsg_align(natural.max(PEER_MSG_SIZE))
}

/// Build an outbound request with a zero-padded payload.
///
/// `write_payload` receives a zeroed slice of the padded size and fills in
/// whatever fields it needs; the header length always covers the padding.
pub fn build_request<F>(
    message_type: u16,
    natural_len: usize,
    sequence: u32,
    origin_id: u32,
    write_payload: F,
) -> Bytes
where
    F: FnOnce(&mut [u8]),
{
    let payload_len = padded_payload_len(natural_len);
    let length = HEADER_SIZE + payload_len;
    let header = Header::new(
        message_type,
        length as u32,
        flags::REQUEST,
        sequence,
        origin_id,
    );

    let mut buf = BytesMut::with_capacity(length);
    header.encode_into(&mut buf);
    buf.put_bytes(0, payload_len);
    write_payload(&mut buf[HEADER_SIZE..]);
    buf.freeze()
}
