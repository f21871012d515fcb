//! # Handoff Node
//! The per-participant runtime for a handoff session: custody protocol
//! endpoints, the coordinator-owned session state machine, and placement
//! evaluation, all driven by a cooperative tick loop over a pluggable
//! transport.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use handoff_shared::{
        sequence_greater_than, sequence_less_than, CustodyError, CustodyTable, ObjectEntry,
        ObjectId, ObjectState, Outcome, ParticipantId, Phase, Pose, ReliableMessage, Role,
        SessionState, Snapshot, SnapshotMerge, Tick, Transport, TransportError,
    };
}

mod config;
mod error;
mod events;
mod node;
mod placement;
mod spawn;

pub use config::NodeConfig;
pub use error::NodeError;
pub use events::{
    CustodyEvent, CustodyOutcome, DespawnEvent, ErrorEvent, Event, Events, PhaseChangeEvent,
    SpawnEvent,
};
pub use node::Node;
pub use placement::Zone;
pub use spawn::{RandomSpawner, Spawner};
