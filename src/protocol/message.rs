//! Typed payloads exchanged with the kernel queue.

use std::io;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::wire_format::Header;

/// How much of each queued packet the kernel copies to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Deliver nothing (`IPQ_COPY_NONE`).
    None,
    /// Metadata only (`IPQ_COPY_META`).
    #[default]
    Meta,
    /// Metadata plus packet bytes (`IPQ_COPY_PACKET`).
    Packet,
}

impl CopyMode {
    /// Wire value of the mode.
    pub fn as_wire(self) -> u8 {
        match self {
            CopyMode::None => 0,
            CopyMode::Meta => 1,
            CopyMode::Packet => 2,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(CopyMode::None),
            1 => Some(CopyMode::Meta),
            2 => Some(CopyMode::Packet),
            _ => None,
        }
    }
}

/// Packet disposition returned to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// `NF_DROP`
    Drop,
    /// `NF_ACCEPT`
    #[default]
    Accept,
}

impl Decision {
    /// Netfilter verdict value.
    pub fn as_wire(self) -> u32 {
        match self {
            Decision::Drop => 0,
            Decision::Accept => 1,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Decision::Drop),
            1 => Some(Decision::Accept),
            _ => None,
        }
    }
}

/// Mode negotiation payload, sent once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeConfig {
    pub mode: CopyMode,
    /// Copy range in bytes; 0 means the whole packet in [`CopyMode::Packet`].
    pub range: usize,
}

impl ModeConfig {
    pub fn new(mode: CopyMode, range: usize) -> Self {
        Self { mode, range }
    }
}

/// Verdict payload disposing of one queued packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Id of the packet event being answered.
    pub packet_id: u64,
    pub decision: Decision,
}

impl Verdict {
    pub fn new(packet_id: u64, decision: Decision) -> Self {
        Self {
            packet_id,
            decision,
        }
    }
}

/// A packet queued by the kernel and waiting for a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PacketEvent {
    /// Kernel handle the verdict must echo.
    pub packet_id: u64,
    /// Netfilter mark.
    pub mark: u64,
    pub timestamp_sec: i64,
    pub timestamp_usec: i64,
    /// Netfilter hook the packet was queued from.
    pub hook: u32,
    pub indev_name: String,
    pub outdev_name: String,
    /// Link-layer protocol, host order.
    pub hw_protocol: u16,
    pub hw_type: u16,
    pub hw_addr: Bytes,
    /// Packet length as reported by the kernel.
    pub data_len: usize,
    /// Copied packet bytes; empty unless the mode is [`CopyMode::Packet`].
    pub payload: Bytes,
}

/// Error notification (`NLMSG_ERROR`) sent by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorNotification {
    /// Negated errno, or 0 for an acknowledgment.
    pub code: i32,
    /// Header of the request that failed, when the kernel echoed it.
    pub offending: Option<Header>,
}

impl ErrorNotification {
    /// The errno behind `code`, if any.
    pub fn os_error(&self) -> Option<io::Error> {
        match self.code {
            0 => None,
            code => Some(io::Error::from_raw_os_error(code.saturating_neg())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_mode_wire_values() {
        assert_eq!(CopyMode::None.as_wire(), 0);
        assert_eq!(CopyMode::Meta.as_wire(), 1);
        assert_eq!(CopyMode::Packet.as_wire(), 2);
        assert_eq!(CopyMode::from_wire(2), Some(CopyMode::Packet));
        assert_eq!(CopyMode::from_wire(3), None);
        assert_eq!(CopyMode::default(), CopyMode::Meta);
    }

    #[test]
    fn test_decision_wire_values() {
        assert_eq!(Decision::Drop.as_wire(), 0);
        assert_eq!(Decision::Accept.as_wire(), 1);
        assert_eq!(Decision::from_wire(1), Some(Decision::Accept));
        assert_eq!(Decision::from_wire(4), None);
        assert_eq!(Decision::default(), Decision::Accept);
    }

    #[test]
    fn test_error_notification_os_error() {
        let notification = ErrorNotification {
            code: -1,
            offending: None,
        };
        let err = notification.os_error().unwrap();
        assert_eq!(err.raw_os_error(), Some(1));

        let ack = ErrorNotification {
            code: 0,
            offending: None,
        };
        assert!(ack.os_error().is_none());
    }
}
