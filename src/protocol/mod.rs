//! Protocol module - wire format, payload layouts, and frame types.
//!
//! This module implements the `ip_queue` subset of netlink:
//! - 16-byte `nlmsghdr` encoding/decoding
//! - C ABI layout of the mode, verdict, packet and error payloads
//! - Frame struct and padded request building

pub mod layout;
mod frame;
mod message;
mod wire_format;

pub use frame::{build_request, padded_payload_len, Frame};
pub use layout::PEER_MSG_SIZE;
pub use message::{CopyMode, Decision, ErrorNotification, ModeConfig, PacketEvent, Verdict};
pub use wire_format::{
    decode_header, flags, message_type, nlmsg_align, Header, MessageType, HEADER_SIZE,
    NLMSG_ALIGNTO,
};
