//! `NETLINK_FIREWALL` socket talking to the kernel's `ip_queue`.
//!
//! # Example
//!
//! ```no_run
//! use ipq_agent::transport::{Channel, NetlinkChannel};
//!
//! let mut channel = NetlinkChannel::open(std::process::id())?;
//! let datagram = channel.receive(8192)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::{Error, ErrorKind};

use bytes::{Bytes, BytesMut};
use netlink_sys::{protocols::NETLINK_FIREWALL, Socket, SocketAddr};

use super::Channel;
use crate::error::{IpqError, Result};

/// Netlink port of the kernel.
const KERNEL_PORT: u32 = 0;

/// Datagram endpoint addressed to the kernel queue, no multicast groups.
pub struct NetlinkChannel {
    socket: Socket,
    kernel: SocketAddr,
    local_port: u32,
}

impl NetlinkChannel {
    /// Create the socket and bind it to `local_port`.
    ///
    /// The local port is the origin id the kernel routes packet events to,
    /// so it should match the one written into outbound headers.
    pub fn open(local_port: u32) -> Result<Self> {
        let mut socket = Socket::new(NETLINK_FIREWALL).map_err(IpqError::ChannelCreation)?;
        socket
            .bind(&SocketAddr::new(local_port, 0))
            .map_err(IpqError::ChannelCreation)?;

        tracing::debug!("Opened NETLINK_FIREWALL channel on port {}", local_port);

        Ok(Self {
            socket,
            kernel: SocketAddr::new(KERNEL_PORT, 0),
            local_port,
        })
    }

    pub fn local_port(&self) -> u32 {
        self.local_port
    }
}

impl Channel for NetlinkChannel {
    fn send(&mut self, message: &[u8]) -> std::io::Result<()> {
        let sent = self.socket.send_to(message, &self.kernel, 0)?;
        if sent != message.len() {
            return Err(Error::new(
                ErrorKind::WriteZero,
                format!("short netlink send: {} of {} bytes", sent, message.len()),
            ));
        }
        Ok(())
    }

    fn receive(&mut self, capacity: usize) -> std::io::Result<Bytes> {
        let mut buf = BytesMut::with_capacity(capacity);
        let (_, sender) = self.socket.recv_from(&mut buf, 0)?;

        // Only the kernel may queue packets to us.
        if sender.port_number() != KERNEL_PORT {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("message from non-kernel netlink port {}", sender.port_number()),
            ));
        }
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failure_is_channel_creation() {
        // ip_queue is gone from most kernels and needs CAP_NET_ADMIN anyway;
        // either outcome is fine as long as failures are classified.
        match NetlinkChannel::open(0) {
            Ok(channel) => assert_eq!(channel.local_port(), 0),
            Err(err) => {
                assert!(matches!(err, IpqError::ChannelCreation(_)));
                assert_eq!(err.exit_code(), crate::error::exit_code::CHANNEL_CREATION);
            }
        }
    }
}
