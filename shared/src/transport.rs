//! Transport seam between the coordination core and the connection layer.
//!
//! The core never opens sockets; the connection layer (an external
//! collaborator) implements [`Transport`] and feeds inbound messages into
//! the node's `receive_*` methods. Reliable sends must be delivered at
//! least once per target; best-effort sends may be dropped or reordered
//! freely, which is why they are infallible at this seam.

use thiserror::Error;

use crate::{
    message::{ObjectState, ReliableMessage, Snapshot},
    types::ParticipantId,
};

/// Errors that can occur delivering a reliable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The target participant is no longer connected.
    #[error("participant {0:?} is disconnected")]
    Disconnected(ParticipantId),

    /// The connection layer refused or failed the send for its own reasons.
    #[error("reliable send failed: {reason}")]
    SendFailed { reason: String },
}

pub trait Transport {
    /// Deliver `message` to `target`, at least once.
    fn send_reliable(
        &mut self,
        target: ParticipantId,
        message: ReliableMessage,
    ) -> Result<(), TransportError>;

    /// Deliver `message` to every other participant, at least once each.
    fn broadcast_reliable(&mut self, message: ReliableMessage) -> Result<(), TransportError>;

    /// Best-effort session-state broadcast to every other participant.
    fn broadcast_snapshot(&mut self, snapshot: Snapshot);

    /// Best-effort held-object pose broadcast to every other participant.
    fn broadcast_state(&mut self, state: ObjectState);
}
