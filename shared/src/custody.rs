//! Per-object custody bookkeeping.
//!
//! Every participant keeps its own [`CustodyTable`]; there is no
//! transactional store behind it. Tables converge by message: a grant is
//! broadcast by the granting custodian, and each table is updated the
//! instant its owner learns of the transfer. Transient disagreement during
//! a request round-trip is expected and harmless.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    message::{ObjectState, Pose},
    sequence::sequence_greater_than,
    types::{ObjectId, ParticipantId, Tick},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    /// The object is not (or no longer) known to this table.
    #[error("{0} is not registered in the custody table")]
    UnknownObject(ObjectId),

    /// An object id was registered twice.
    #[error("{0} is already registered in the custody table")]
    DuplicateObject(ObjectId),
}

/// One participant's local view of a shared object.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    category: String,
    /// `None` means coordinator-default custody: nobody is manipulating the
    /// object and requests are routed to the coordinator.
    custodian: Option<ParticipantId>,
    pose: Pose,
    /// Tick of the newest [`ObjectState`] applied so far; stale broadcasts
    /// are discarded against this.
    last_state_tick: Option<Tick>,
}

impl ObjectEntry {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn custodian(&self) -> Option<ParticipantId> {
        self.custodian
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }
}

#[derive(Debug, Default)]
pub struct CustodyTable {
    objects: HashMap<ObjectId, ObjectEntry>,
}

impl CustodyTable {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
        }
    }

    pub fn register(&mut self, object: ObjectId, category: String) -> Result<(), CustodyError> {
        if self.objects.contains_key(&object) {
            return Err(CustodyError::DuplicateObject(object));
        }
        self.objects.insert(
            object,
            ObjectEntry {
                category,
                custodian: None,
                pose: Pose::default(),
                last_state_tick: None,
            },
        );
        Ok(())
    }

    pub fn deregister(&mut self, object: ObjectId) -> Option<ObjectEntry> {
        self.objects.remove(&object)
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains_key(&object)
    }

    pub fn entry(&self, object: ObjectId) -> Result<&ObjectEntry, CustodyError> {
        self.objects
            .get(&object)
            .ok_or(CustodyError::UnknownObject(object))
    }

    pub fn custodian(&self, object: ObjectId) -> Result<Option<ParticipantId>, CustodyError> {
        Ok(self.entry(object)?.custodian)
    }

    pub fn set_custodian(
        &mut self,
        object: ObjectId,
        custodian: Option<ParticipantId>,
    ) -> Result<(), CustodyError> {
        let entry = self
            .objects
            .get_mut(&object)
            .ok_or(CustodyError::UnknownObject(object))?;
        if entry.custodian != custodian {
            // State ticks are the custodian's own counter; a transfer
            // starts a new broadcast stream.
            entry.last_state_tick = None;
        }
        entry.custodian = custodian;
        Ok(())
    }

    pub fn is_held_by(&self, object: ObjectId, participant: ParticipantId) -> bool {
        matches!(
            self.objects.get(&object),
            Some(entry) if entry.custodian == Some(participant)
        )
    }

    /// Revert every object held by `participant` to coordinator-default
    /// custody. Used when a participant departs. Returns the released ids.
    pub fn release_all_held_by(&mut self, participant: ParticipantId) -> Vec<ObjectId> {
        let mut released = Vec::new();
        for (id, entry) in self.objects.iter_mut() {
            if entry.custodian == Some(participant) {
                entry.custodian = None;
                released.push(*id);
            }
        }
        released
    }

    /// Apply a best-effort pose broadcast, latest-by-tick. Returns `true`
    /// when the state was applied, `false` when it was stale or the object
    /// is unknown (already destroyed locally — not an error).
    pub fn apply_object_state(&mut self, state: &ObjectState) -> bool {
        let Some(entry) = self.objects.get_mut(&state.object) else {
            return false;
        };
        // Ticks only order broadcasts within one custodian's stream; a
        // state naming a different custodian is a new stream and always
        // applies. The current custodian broadcasts every tick, so a
        // reordered leftover from the previous custodian is overwritten by
        // the very next genuine broadcast.
        if entry.custodian == Some(state.custodian) {
            if let Some(last) = entry.last_state_tick {
                if !sequence_greater_than(state.tick, last) {
                    return false;
                }
            }
        }
        entry.last_state_tick = Some(state.tick);
        entry.pose = state.pose;
        // Pose broadcasts double as custody convergence for participants
        // that missed the grant broadcast.
        entry.custodian = Some(state.custodian);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectEntry)> {
        self.objects.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
