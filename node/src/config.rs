use std::default::Default;

/// Contains Config properties which will be used by a Node
#[derive(Clone)]
pub struct NodeConfig {
    /// Seconds on the session countdown when the coordinator starts play.
    pub countdown_duration: f32,
    /// Participants that must report ready before the session can start.
    pub required_participants: u32,
    /// Ticks between best-effort session snapshot broadcasts.
    pub snapshot_interval: u16,
    /// Ticks an outstanding custody request may wait before it is failed
    /// locally and custody falls back to the coordinator.
    pub custody_timeout: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            countdown_duration: 120.0,
            required_participants: 2,
            snapshot_interval: 10,
            custody_timeout: 60,
        }
    }
}
