//! Client builder and the protocol driver.
//!
//! The [`ClientBuilder`] configures the copy mode, origin id and policy.
//! The [`Client`] then runs the queue protocol as an explicit state machine:
//! 1. Send the mode negotiation message (once)
//! 2. Block for the next datagram from the kernel
//! 3. Dispatch every message it carries on its type tag
//! 4. Ask the policy and send one verdict per queued packet, then go back to 2
//!
//! Any error halts the driver in a terminal state and is returned to the
//! caller; the driver never exits the process itself.
//!
//! # Example
//!
//! ```no_run
//! use ipq_agent::transport::NetlinkChannel;
//! use ipq_agent::Client;
//!
//! let origin_id = std::process::id();
//! let channel = NetlinkChannel::open(origin_id)?;
//! let mut client = Client::builder().origin_id(origin_id).build(channel);
//!
//! // Runs until the first fatal error.
//! let err = client.run().unwrap_err();
//! std::process::exit(err.exit_code().into());
//! # Ok::<(), ipq_agent::IpqError>(())
//! ```

use std::collections::VecDeque;

use crate::codec::{
    decode_error, decode_frames, decode_packet_event, encode_mode_config, encode_verdict,
    receive_capacity,
};
use crate::error::{IpqError, Result};
use crate::handler::{PacketPolicy, StaticPolicy};
use crate::protocol::{CopyMode, Frame, MessageType, ModeConfig, PacketEvent, Verdict};
use crate::transport::Channel;

/// Driver states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing sent yet.
    Init,
    /// Mode negotiation sent; no reply is expected.
    ModeSent,
    /// Blocked waiting for the next kernel message.
    AwaitingPacket,
    /// Packet events are queued and their verdicts are due.
    SendingVerdict,
    /// The kernel sent an error notification.
    KernelError,
    /// A message with an unknown type tag arrived.
    UnexpectedType,
    /// Opening, sending or receiving failed.
    ChannelFailure,
    /// An inbound message did not match its layout.
    MalformedMessage,
}

impl State {
    /// True for states the driver can never leave.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            State::KernelError
                | State::UnexpectedType
                | State::ChannelFailure
                | State::MalformedMessage
        )
    }
}

/// Builder for configuring and creating a [`Client`].
pub struct ClientBuilder<P = StaticPolicy> {
    mode: ModeConfig,
    origin_id: u32,
    initial_sequence: u32,
    policy: P,
}

impl ClientBuilder<StaticPolicy> {
    /// Create a builder with metadata-only copying and the accept-all policy.
    pub fn new() -> Self {
        Self {
            mode: ModeConfig::new(CopyMode::Meta, 0),
            origin_id: std::process::id(),
            initial_sequence: 0,
            policy: StaticPolicy::accept_all(),
        }
    }
}

impl Default for ClientBuilder<StaticPolicy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PacketPolicy> ClientBuilder<P> {
    /// Set how much of each packet the kernel copies.
    ///
    /// Default: `CopyMode::Meta`
    pub fn copy_mode(mut self, mode: CopyMode) -> Self {
        self.mode.mode = mode;
        self
    }

    /// Set the copy range. 0 copies whole packets in `CopyMode::Packet`.
    ///
    /// Default: 0
    pub fn range(mut self, range: usize) -> Self {
        self.mode.range = range;
        self
    }

    /// Set the origin id written into every header.
    ///
    /// Default: the process id
    pub fn origin_id(mut self, origin_id: u32) -> Self {
        self.origin_id = origin_id;
        self
    }

    /// Set the sequence number of the first message.
    ///
    /// Default: 0
    pub fn initial_sequence(mut self, sequence: u32) -> Self {
        self.initial_sequence = sequence;
        self
    }

    /// Replace the decision policy.
    pub fn policy<Q: PacketPolicy>(self, policy: Q) -> ClientBuilder<Q> {
        ClientBuilder {
            mode: self.mode,
            origin_id: self.origin_id,
            initial_sequence: self.initial_sequence,
            policy,
        }
    }

    /// Build the driver around an open channel. Nothing is sent yet.
    pub fn build<C: Channel>(self, channel: C) -> Client<C, P> {
        Client {
            channel,
            policy: self.policy,
            mode: self.mode,
            receive_capacity: receive_capacity(&self.mode),
            origin_id: self.origin_id,
            sequence: self.initial_sequence,
            state: State::Init,
            pending: VecDeque::new(),
        }
    }
}

/// The protocol driver.
///
/// Owns the channel and the sequence counter. Packet events from one
/// datagram are queued and verdicts leave in the order events arrived.
pub struct Client<C, P = StaticPolicy> {
    channel: C,
    policy: P,
    mode: ModeConfig,
    receive_capacity: usize,
    origin_id: u32,
    /// Sequence number of the next outbound message.
    sequence: u32,
    state: State,
    pending: VecDeque<PacketEvent>,
}

impl Client<(), StaticPolicy> {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<C: Channel, P: PacketPolicy> Client<C, P> {
    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Sequence number the next outbound message will carry.
    pub fn next_sequence(&self) -> u32 {
        self.sequence
    }

    pub fn origin_id(&self) -> u32 {
        self.origin_id
    }

    pub fn mode(&self) -> ModeConfig {
        self.mode
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Run until the first fatal error and return it.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.step()?;
        }
    }

    /// Perform exactly one state transition and return the new state.
    ///
    /// On error the driver moves to the matching terminal state; stepping
    /// it again yields [`IpqError::Halted`].
    pub fn step(&mut self) -> Result<State> {
        match self.transition() {
            Ok(next) => {
                self.state = next;
                Ok(next)
            }
            Err(err) => {
                self.state = err.terminal_state();
                self.pending.clear();
                Err(err)
            }
        }
    }

    fn transition(&mut self) -> Result<State> {
        match self.state {
            State::Init => {
                self.negotiate_mode()?;
                Ok(State::ModeSent)
            }
            State::ModeSent => Ok(State::AwaitingPacket),
            State::AwaitingPacket => self.receive_and_dispatch(),
            State::SendingVerdict => self.send_verdict(),
            state => Err(IpqError::Halted { state }),
        }
    }

    fn negotiate_mode(&mut self) -> Result<()> {
        let sequence = self.take_sequence();
        let message = encode_mode_config(&self.mode, sequence, self.origin_id);
        self.channel.send(&message).map_err(IpqError::Send)?;

        tracing::info!(
            "Sent mode {:?} (range {}) as origin {}",
            self.mode.mode,
            self.mode.range,
            self.origin_id
        );
        Ok(())
    }

    fn receive_and_dispatch(&mut self) -> Result<State> {
        let datagram = self
            .channel
            .receive(self.receive_capacity)
            .map_err(IpqError::Receive)?;

        for frame in decode_frames(datagram)? {
            self.dispatch(frame)?;
        }

        if self.pending.is_empty() {
            Ok(State::AwaitingPacket)
        } else {
            Ok(State::SendingVerdict)
        }
    }

    fn dispatch(&mut self, frame: Frame) -> Result<()> {
        match frame.kind() {
            MessageType::Packet => {
                let packet = decode_packet_event(&frame.payload)?;
                tracing::debug!(
                    packet_id = packet.packet_id,
                    hook = packet.hook,
                    indev = %packet.indev_name,
                    "Received packet event"
                );
                self.pending.push_back(packet);
                Ok(())
            }
            MessageType::Error => {
                let notification = decode_error(frame.payload())?;
                if let Some(offending) = notification.offending {
                    tracing::error!(
                        request_sequence = offending.sequence,
                        request_type = offending.message_type,
                        "Kernel rejected request"
                    );
                }
                match notification.os_error() {
                    Some(os_error) => tracing::error!(
                        code = notification.code,
                        error = %os_error,
                        "Received error {}",
                        notification.code
                    ),
                    None => tracing::error!("Received error {}", notification.code),
                }
                Err(IpqError::KernelError {
                    code: notification.code,
                })
            }
            _ => {
                let tag = frame.header.message_type;
                tracing::error!("Received unexpected packet type {}", tag);
                Err(IpqError::UnexpectedMessageType { tag })
            }
        }
    }

    fn send_verdict(&mut self) -> Result<State> {
        let Some(packet) = self.pending.pop_front() else {
            return Err(IpqError::Halted { state: self.state });
        };

        let decision = self.policy.decide(&packet);
        let verdict = Verdict::new(packet.packet_id, decision);
        let sequence = self.take_sequence();
        let message = encode_verdict(&verdict, sequence, self.origin_id);
        self.channel.send(&message).map_err(IpqError::Send)?;

        tracing::debug!(
            packet_id = verdict.packet_id,
            sequence,
            "Sent verdict {:?}",
            decision
        );

        if self.pending.is_empty() {
            Ok(State::AwaitingPacket)
        } else {
            Ok(State::SendingVerdict)
        }
    }

    /// Hand out the current sequence number and advance the counter.
    ///
    /// The counter wraps at `u32::MAX`, so numbers are strictly increasing
    /// only within the first 2^32 messages of a session.
    fn take_sequence(&mut self) -> u32 {
        let sequence = self.sequence;
        self.sequence = sequence.wrapping_add(1);
        sequence
    }
}
