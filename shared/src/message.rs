//! Protocol messages exchanged between participants.
//!
//! Two independent inbound streams exist per participant:
//! * [`ReliableMessage`] — point-to-point or broadcast, delivered at least
//!   once; every receiver handles duplicates as no-ops.
//! * [`Snapshot`] / [`ObjectState`] — periodic best-effort broadcasts that
//!   may be dropped or reordered; receivers keep latest-by-tick only.
//!
//! No bit-level wire format is defined here; the transport owns encoding.

use crate::types::{ObjectId, ParticipantId, Tick};

/// How a session concluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
}

/// Session lifecycle phase. The ordering is total and monotonic within a
/// session: `WaitingForParticipants < Playing < Ended`, never backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    WaitingForParticipants,
    Playing,
    Ended,
}

/// Position of a held object, driven by the custodian's input collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Reliable one-shot event messages.
#[derive(Clone, Debug, PartialEq)]
pub enum ReliableMessage {
    /// A participant finished local setup; sent once to the coordinator.
    Ready { participant: ParticipantId },
    /// Coordinator broadcast: the session begins.
    StartSession { duration: f32, total_tasks: u32 },
    /// Coordinator broadcast: the session is over.
    EndSession { outcome: Outcome },
    /// Directed at the current custodian of `object`.
    CustodyRequest {
        object: ObjectId,
        requester: ParticipantId,
    },
    /// Broadcast by the granting custodian so every table converges.
    CustodyGrant {
        object: ObjectId,
        new_custodian: ParticipantId,
    },
    /// Directed at a requester whose request lost the race or was refused.
    /// Carries the denier's view of the custodian so a requester with a
    /// stale table learns where to retry; `None` means the object is gone.
    CustodyDeny {
        object: ObjectId,
        custodian: Option<ParticipantId>,
    },
    /// Coordinator-directed forced release; may not be denied.
    CustodyRevoke { object: ObjectId },
    /// Coordinator broadcast: a new shared object exists.
    ObjectSpawned { object: ObjectId, category: String },
    /// Coordinator broadcast: the object is gone; drop all local state for it.
    ObjectDestroyed { object: ObjectId },
}

/// Periodic best-effort replication of the coordinator's session state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    pub tick: Tick,
    pub phase: Phase,
    pub remaining_time: f32,
    pub timer_active: bool,
    pub completed_tasks: u32,
    pub total_tasks: u32,
}

/// Periodic best-effort broadcast of a held object's pose from its custodian.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectState {
    pub object: ObjectId,
    pub custodian: ParticipantId,
    pub pose: Pose,
    pub tick: Tick,
}
