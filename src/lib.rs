//! # ipq-agent
//!
//! Userspace verdict agent for the Linux `ip_queue` packet queue.
//!
//! Packets matched by an iptables `QUEUE` target are diverted to this
//! process over a `NETLINK_FIREWALL` socket. The agent negotiates a copy
//! mode once, then answers every queued packet with an accept/drop verdict.
//!
//! ## Architecture
//!
//! - **Transport**: [`transport::Channel`], one blocking datagram per call
//! - **Codec**: padded netlink framing of the mode, verdict, packet and error
//!   payloads ([`codec`], [`protocol`])
//! - **Driver**: [`Client`], an explicit state machine owning the channel
//!   and the sequence counter
//!
//! ## Example
//!
//! ```no_run
//! use ipq_agent::protocol::{Decision, PacketEvent};
//! use ipq_agent::transport::NetlinkChannel;
//! use ipq_agent::Client;
//!
//! let origin_id = std::process::id();
//! let mut client = Client::builder()
//!     .origin_id(origin_id)
//!     .policy(|packet: &PacketEvent| {
//!         if packet.indev_name == "eth1" { Decision::Drop } else { Decision::Accept }
//!     })
//!     .build(NetlinkChannel::open(origin_id)?);
//!
//! let err = client.run().unwrap_err();
//! eprintln!("{err}");
//! # Ok::<(), ipq_agent::IpqError>(())
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;

mod client;

pub use client::{Client, ClientBuilder, State};
pub use error::{IpqError, Result};
pub use handler::{PacketPolicy, StaticPolicy};
