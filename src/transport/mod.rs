//! Transport module - the datagram channel to the kernel queue.
//!
//! Provides:
//! - [`Channel`] - blocking send/receive of raw netlink messages
//! - [`NetlinkChannel`] - `NETLINK_FIREWALL` socket addressed to the kernel

mod netlink;

use std::io;

use bytes::Bytes;

pub use netlink::NetlinkChannel;

/// A blocking, message-oriented endpoint.
///
/// Each call moves exactly one datagram. Implementations never retry.
pub trait Channel {
    /// Send one complete message.
    fn send(&mut self, message: &[u8]) -> io::Result<()>;

    /// Block until one message arrives, reading at most `capacity` bytes.
    fn receive(&mut self, capacity: usize) -> io::Result<Bytes>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send(&mut self, message: &[u8]) -> io::Result<()> {
        (**self).send(message)
    }

    fn receive(&mut self, capacity: usize) -> io::Result<Bytes> {
        (**self).receive(capacity)
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn send(&mut self, message: &[u8]) -> io::Result<()> {
        (**self).send(message)
    }

    fn receive(&mut self, capacity: usize) -> io::Result<Bytes> {
        (**self).receive(capacity)
    }
}
