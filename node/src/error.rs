use thiserror::Error;

use handoff_shared::{CustodyError, ObjectId, TransportError};

/// Errors surfaced by Node operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The operation is reserved for the coordinator role.
    #[error("operation requires the coordinator role")]
    NotCoordinator,

    /// Custody bookkeeping rejected the operation.
    #[error("custody error: {0}")]
    Custody(#[from] CustodyError),

    /// The transport could not deliver a reliable message.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A custody request is already outstanding for this object.
    #[error("custody request already pending for {0}")]
    RequestPending(ObjectId),

    /// The local participant already holds custody of this object.
    #[error("{0} is already held locally")]
    AlreadyHeld(ObjectId),
}
