//! Codec module - typed encoding/decoding of queue messages.
//!
//! - [`encode_mode_config`] / [`encode_verdict`] build complete, padded
//!   outbound messages
//! - [`decode_frame`] splits a datagram into header and payload;
//!   [`decode_frames`] does the same for every message a datagram carries
//! - [`decode_packet_event`] / [`decode_error`] read inbound payloads once
//!   the header's type tag is known
//!
//! # Example
//!
//! ```
//! use ipq_agent::codec::{decode_frame, decode_verdict, encode_verdict};
//! use ipq_agent::protocol::{Decision, Verdict, PEER_MSG_SIZE};
//!
//! let bytes = encode_verdict(&Verdict::new(42, Decision::Accept), 1, 1000);
//! let frame = decode_frame(bytes).unwrap();
//! assert!(frame.payload().len() >= PEER_MSG_SIZE);
//! assert_eq!(decode_verdict(frame.payload()).unwrap().packet_id, 42);
//! ```

mod ipq;

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::Frame;

pub use crate::protocol::decode_header;
pub use ipq::{
    decode_error, decode_mode_config, decode_packet_event, decode_verdict, encode_mode_config,
    encode_verdict, receive_capacity, MAX_COPY_RANGE,
};

/// Decode a received datagram into a frame.
#[inline]
pub fn decode_frame(datagram: Bytes) -> Result<Frame> {
    Frame::parse(datagram)
}

/// Decode every message in a received datagram, in order.
#[inline]
pub fn decode_frames(datagram: Bytes) -> Result<Vec<Frame>> {
    Frame::parse_all(datagram)
}
