use std::fmt;

/// Discrete step counter for the cooperative tick loop. Wraps at `u16::MAX`;
/// always compare with the wrap-safe helpers in [`crate::sequence`].
pub type Tick = u16;

/// Opaque identity of a session participant, assigned by the connection layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub u16);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "participant-{}", self.0)
    }
}

/// Identity of a shared interactive object, assigned by the coordinator at
/// spawn time and unique for the lifetime of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "object-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Coordinator,
    Member,
}

impl Role {
    pub fn is_coordinator(self) -> bool {
        self == Role::Coordinator
    }
}
