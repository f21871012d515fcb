//! # Handoff Shared
//! Common functionality shared between handoff nodes: protocol messages,
//! the custody table, the replicated session state, and the transport seam.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod custody;
mod message;
mod sequence;
mod session;
mod transport;
mod types;

pub use custody::{CustodyError, CustodyTable, ObjectEntry};
pub use message::{ObjectState, Outcome, Phase, Pose, ReliableMessage, Snapshot};
pub use sequence::{sequence_greater_than, sequence_less_than};
pub use session::{SessionState, SnapshotMerge};
pub use transport::{Transport, TransportError};
pub use types::{ObjectId, ParticipantId, Role, Tick};
