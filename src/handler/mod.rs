//! Handler module - the packet decision policy.
//!
//! The driver asks a [`PacketPolicy`] for a [`Decision`] on every queued
//! packet. Closures work directly:
//!
//! ```
//! use ipq_agent::handler::PacketPolicy;
//! use ipq_agent::protocol::{Decision, PacketEvent};
//!
//! let mut drop_marked = |packet: &PacketEvent| {
//!     if packet.mark == 0 { Decision::Accept } else { Decision::Drop }
//! };
//! assert_eq!(drop_marked.decide(&PacketEvent::default()), Decision::Accept);
//! ```

use crate::protocol::{Decision, PacketEvent};

/// Decides the fate of each queued packet.
///
/// Called exactly once per packet event, in arrival order, on the driver's
/// thread. A slow policy stalls the queue in the kernel, not here.
pub trait PacketPolicy {
    fn decide(&mut self, packet: &PacketEvent) -> Decision;
}

impl<F> PacketPolicy for F
where
    F: FnMut(&PacketEvent) -> Decision,
{
    fn decide(&mut self, packet: &PacketEvent) -> Decision {
        self(packet)
    }
}

/// Returns the same decision for every packet.
///
/// The default accepts everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticPolicy {
    decision: Decision,
}

impl StaticPolicy {
    pub fn new(decision: Decision) -> Self {
        Self { decision }
    }

    pub fn accept_all() -> Self {
        Self::new(Decision::Accept)
    }

    pub fn drop_all() -> Self {
        Self::new(Decision::Drop)
    }
}

impl PacketPolicy for StaticPolicy {
    fn decide(&mut self, _packet: &PacketEvent) -> Decision {
        self.decision
    }
}
