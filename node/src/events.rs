use std::{mem, vec::IntoIter};

use handoff_shared::{ObjectId, Outcome, Phase};

use crate::error::NodeError;

/// Resolution of a custody negotiation, consumed by the input/physics
/// collaborator to toggle local simulation of the object on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustodyOutcome {
    /// This participant now holds the object: freeze it to local control.
    Granted,
    /// The request was refused; nothing changed locally.
    Denied,
    /// This participant no longer holds the object: hand it back to physics.
    /// `Revoked` is coordinator-forced, `Released` is a local voluntary drop.
    Revoked,
    Released,
    /// The transfer could not complete; any speculative local custody was
    /// cleared and the object fell back to coordinator-default custody.
    Failed,
}

/// Buffer of outbound notifications drained by collaborators once per tick.
pub struct Events {
    custody: Vec<(ObjectId, CustodyOutcome)>,
    phase_changes: Vec<(Phase, Option<Outcome>)>,
    spawns: Vec<(ObjectId, String)>,
    despawns: Vec<ObjectId>,
    errors: Vec<NodeError>,
    empty: bool,
}

impl Events {
    pub(crate) fn new() -> Self {
        Self {
            custody: Vec::new(),
            phase_changes: Vec::new(),
            spawns: Vec::new(),
            despawns: Vec::new(),
            errors: Vec::new(),
            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: Event>(&mut self) -> V::Iter {
        return V::iter(self);
    }

    pub fn has<V: Event>(&self) -> bool {
        return V::has(self);
    }

    // Crate-public

    pub(crate) fn push_custody(&mut self, object: ObjectId, outcome: CustodyOutcome) {
        self.custody.push((object, outcome));
        self.empty = false;
    }

    pub(crate) fn push_phase_change(&mut self, phase: Phase, outcome: Option<Outcome>) {
        self.phase_changes.push((phase, outcome));
        self.empty = false;
    }

    pub(crate) fn push_spawn(&mut self, object: ObjectId, category: String) {
        self.spawns.push((object, category));
        self.empty = false;
    }

    pub(crate) fn push_despawn(&mut self, object: ObjectId) {
        self.despawns.push(object);
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: NodeError) {
        self.errors.push(error);
        self.empty = false;
    }
}

// Event Trait
pub trait Event {
    type Iter;

    fn iter(events: &mut Events) -> Self::Iter;

    fn has(events: &Events) -> bool;
}

// CustodyEvent
pub struct CustodyEvent;
impl Event for CustodyEvent {
    type Iter = IntoIter<(ObjectId, CustodyOutcome)>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.custody);
        return IntoIterator::into_iter(list);
    }

    fn has(events: &Events) -> bool {
        !events.custody.is_empty()
    }
}

// PhaseChangeEvent
pub struct PhaseChangeEvent;
impl Event for PhaseChangeEvent {
    type Iter = IntoIter<(Phase, Option<Outcome>)>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.phase_changes);
        return IntoIterator::into_iter(list);
    }

    fn has(events: &Events) -> bool {
        !events.phase_changes.is_empty()
    }
}

// SpawnEvent
pub struct SpawnEvent;
impl Event for SpawnEvent {
    type Iter = IntoIter<(ObjectId, String)>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.spawns);
        return IntoIterator::into_iter(list);
    }

    fn has(events: &Events) -> bool {
        !events.spawns.is_empty()
    }
}

// DespawnEvent
pub struct DespawnEvent;
impl Event for DespawnEvent {
    type Iter = IntoIter<ObjectId>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.despawns);
        return IntoIterator::into_iter(list);
    }

    fn has(events: &Events) -> bool {
        !events.despawns.is_empty()
    }
}

// ErrorEvent
pub struct ErrorEvent;
impl Event for ErrorEvent {
    type Iter = IntoIter<NodeError>;

    fn iter(events: &mut Events) -> Self::Iter {
        let list = mem::take(&mut events.errors);
        return IntoIterator::into_iter(list);
    }

    fn has(events: &Events) -> bool {
        !events.errors.is_empty()
    }
}
