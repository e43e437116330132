//! Error types for ipq-agent.

use thiserror::Error;

use crate::client::State;
use crate::config::ConfigError;

/// Process exit codes, one per failure kind.
pub mod exit_code {
    /// The kernel answered with an `NLMSG_ERROR` notification.
    pub const KERNEL_ERROR: u8 = 1;
    /// A message with an unrecognized type tag arrived.
    pub const UNEXPECTED_TYPE: u8 = 2;
    /// The netlink socket could not be created or bound.
    pub const CHANNEL_CREATION: u8 = 3;
    /// Sending a mode or verdict message failed.
    pub const SEND: u8 = 4;
    /// Receiving from the socket failed.
    pub const RECEIVE: u8 = 5;
    /// An inbound message was shorter than its declared layout.
    pub const MALFORMED: u8 = 6;
    /// Configuration could not be loaded.
    pub const CONFIG: u8 = 7;
    /// The driver was stepped after it had already halted.
    pub const HALTED: u8 = 8;
}

/// Main error type for all agent operations.
///
/// Every variant is fatal: the driver stops at the first error and the
/// binary terminates with [`IpqError::exit_code`].
#[derive(Debug, Error)]
pub enum IpqError {
    /// The netlink endpoint could not be opened.
    #[error("unable to open netlink channel: {0}")]
    ChannelCreation(#[source] std::io::Error),

    /// An outbound message could not be sent.
    #[error("unable to send message: {0}")]
    Send(#[source] std::io::Error),

    /// Receiving the next message failed.
    #[error("unable to receive message: {0}")]
    Receive(#[source] std::io::Error),

    /// The kernel sent an error notification.
    #[error("received kernel error {code}")]
    KernelError {
        /// Kernel-supplied code (a negated errno).
        code: i32,
    },

    /// A message type the protocol does not expect.
    #[error("received unexpected message type {tag}")]
    UnexpectedMessageType {
        /// Raw type tag from the header.
        tag: u16,
    },

    /// Inbound bytes did not match the expected layout.
    #[error("malformed message: {reason}")]
    Decode {
        /// What was wrong with the message.
        reason: String,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The driver already reached a terminal state.
    #[error("protocol driver halted in state {state:?}")]
    Halted {
        /// Terminal state the driver is stuck in.
        state: State,
    },
}

impl IpqError {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        IpqError::Decode {
            reason: reason.into(),
        }
    }

    /// Exit code the process terminates with for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            IpqError::KernelError { .. } => exit_code::KERNEL_ERROR,
            IpqError::UnexpectedMessageType { .. } => exit_code::UNEXPECTED_TYPE,
            IpqError::ChannelCreation(_) => exit_code::CHANNEL_CREATION,
            IpqError::Send(_) => exit_code::SEND,
            IpqError::Receive(_) => exit_code::RECEIVE,
            IpqError::Decode { .. } => exit_code::MALFORMED,
            IpqError::Config(_) => exit_code::CONFIG,
            IpqError::Halted { .. } => exit_code::HALTED,
        }
    }

    /// Terminal driver state this error leads to.
    pub fn terminal_state(&self) -> State {
        match self {
            IpqError::KernelError { .. } => State::KernelError,
            IpqError::UnexpectedMessageType { .. } => State::UnexpectedType,
            IpqError::Decode { .. } => State::MalformedMessage,
            IpqError::Halted { state } => *state,
            IpqError::ChannelCreation(_)
            | IpqError::Send(_)
            | IpqError::Receive(_)
            | IpqError::Config(_) => State::ChannelFailure,
        }
    }
}

/// Result type alias using IpqError.
pub type Result<T> = std::result::Result<T, IpqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let io = || std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        let errors = [
            IpqError::KernelError { code: -1 },
            IpqError::UnexpectedMessageType { tag: 99 },
            IpqError::ChannelCreation(io()),
            IpqError::Send(io()),
            IpqError::Receive(io()),
            IpqError::decode("short"),
            IpqError::Config(ConfigError::NoConfigFile("x.toml".into())),
            IpqError::Halted {
                state: State::KernelError,
            },
        ];

        let mut codes: Vec<u8> = errors.iter().map(IpqError::exit_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_kernel_error_and_unexpected_type_codes() {
        assert_eq!(IpqError::KernelError { code: 7 }.exit_code(), 1);
        assert_eq!(IpqError::UnexpectedMessageType { tag: 99 }.exit_code(), 2);
    }

    #[test]
    fn test_display_carries_detail() {
        assert!(IpqError::KernelError { code: 7 }.to_string().contains('7'));
        assert!(IpqError::UnexpectedMessageType { tag: 99 }
            .to_string()
            .contains("99"));
    }

    #[test]
    fn test_terminal_states() {
        let io = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert_eq!(IpqError::Receive(io).terminal_state(), State::ChannelFailure);
        assert_eq!(
            IpqError::KernelError { code: -22 }.terminal_state(),
            State::KernelError
        );
        assert_eq!(
            IpqError::UnexpectedMessageType { tag: 3 }.terminal_state(),
            State::UnexpectedType
        );
        assert_eq!(
            IpqError::decode("x").terminal_state(),
            State::MalformedMessage
        );
    }
}
