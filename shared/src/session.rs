//! Replicated session state.
//!
//! The coordinator owns the only mutable copy; every other participant
//! holds a read-only replica converged through two inbound streams: the
//! reliable transition messages (`StartSession` / `EndSession`) and the
//! periodic best-effort [`Snapshot`] broadcast. [`SessionState`] is the
//! single reconciliation point for both streams, so loss or reordering on
//! either one can be exercised in isolation by feeding it synthetic
//! sequences.

use log::{info, warn};

use crate::{
    message::{Outcome, Phase, Snapshot},
    sequence::sequence_greater_than,
    types::Tick,
};

/// Result of merging one inbound snapshot into the local replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMerge {
    /// Older than a snapshot already applied; discarded.
    Stale,
    /// Applied without a phase transition.
    Applied,
    /// The snapshot reported `Ended` while the local phase was not; the
    /// reliable `EndSession` was missed and the end was forced locally,
    /// with the outcome inferred from the task counters.
    ForcedEnd(Outcome),
}

#[derive(Debug, Clone)]
pub struct SessionState {
    phase: Phase,
    required_participants: u32,
    total_tasks: u32,
    completed_tasks: u32,
    remaining_time: f32,
    timer_active: bool,
    last_snapshot_tick: Option<Tick>,
}

impl SessionState {
    pub fn new(required_participants: u32) -> Self {
        Self {
            phase: Phase::WaitingForParticipants,
            required_participants,
            total_tasks: 0,
            completed_tasks: 0,
            remaining_time: 0.0,
            timer_active: false,
            last_snapshot_tick: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn required_participants(&self) -> u32 {
        self.required_participants
    }

    pub fn total_tasks(&self) -> u32 {
        self.total_tasks
    }

    pub fn completed_tasks(&self) -> u32 {
        self.completed_tasks
    }

    pub fn remaining_time(&self) -> f32 {
        self.remaining_time
    }

    pub fn timer_active(&self) -> bool {
        self.timer_active
    }

    /// Coordinator-side: register the task total before the session starts.
    pub fn set_total_tasks(&mut self, total: u32) {
        if self.phase == Phase::WaitingForParticipants {
            self.total_tasks = total;
            self.completed_tasks = 0;
        }
    }

    /// Outcome a receiver infers when it learns of the end only through a
    /// snapshot and never sees the reliable `EndSession`.
    pub fn infer_outcome(&self) -> Outcome {
        if self.total_tasks > 0 && self.completed_tasks >= self.total_tasks {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }

    /// Apply a `StartSession` transition. Duplicates and post-end restarts
    /// are ignored; returns whether the transition took effect.
    pub fn apply_start(&mut self, duration: f32, total_tasks: u32) -> bool {
        match self.phase {
            Phase::Ended => {
                warn!("StartSession received after session end, ignoring");
                false
            }
            Phase::Playing => {
                warn!("StartSession received while already playing, ignoring duplicate");
                false
            }
            Phase::WaitingForParticipants => {
                info!(
                    "session starting: duration={duration}s, total_tasks={total_tasks}"
                );
                self.phase = Phase::Playing;
                self.remaining_time = duration;
                self.timer_active = true;
                self.total_tasks = total_tasks;
                self.completed_tasks = 0;
                true
            }
        }
    }

    /// Apply an `EndSession` transition. A no-op when already ended;
    /// returns whether the transition took effect.
    pub fn apply_end(&mut self, outcome: Outcome) -> bool {
        if self.phase == Phase::Ended {
            warn!("EndSession({outcome:?}) received while already ended, ignoring duplicate");
            return false;
        }
        info!("session ended: {outcome:?}");
        self.phase = Phase::Ended;
        self.timer_active = false;
        true
    }

    /// Coordinator-side: count one completed task. Accepted only while
    /// playing with the timer running, and clamped to `total_tasks`.
    /// Returns the updated count when accepted.
    pub fn record_completion(&mut self) -> Option<u32> {
        if self.phase != Phase::Playing || !self.timer_active {
            return None;
        }
        if self.completed_tasks >= self.total_tasks {
            return None;
        }
        self.completed_tasks += 1;
        info!(
            "task completed: {}/{}",
            self.completed_tasks, self.total_tasks
        );
        Some(self.completed_tasks)
    }

    /// Coordinator-side: advance the countdown by `delta` seconds. Returns
    /// `true` exactly when this call drove the timer to zero.
    pub fn tick_timer(&mut self, delta: f32) -> bool {
        if self.phase != Phase::Playing || !self.timer_active {
            return false;
        }
        self.remaining_time -= delta;
        if self.remaining_time <= 0.0 {
            self.remaining_time = 0.0;
            return true;
        }
        false
    }

    /// Coordinator-side: produce the periodic best-effort broadcast.
    pub fn snapshot(&self, tick: Tick) -> Snapshot {
        Snapshot {
            tick,
            phase: self.phase,
            remaining_time: self.remaining_time,
            timer_active: self.timer_active,
            completed_tasks: self.completed_tasks,
            total_tasks: self.total_tasks,
        }
    }

    /// Forget the snapshot ordering watermark. Snapshot ticks are the
    /// sending coordinator's own counter, so a change of authority starts a
    /// new stream whose ticks are unrelated to the previous one's.
    pub fn reset_snapshot_ordering(&mut self) {
        self.last_snapshot_tick = None;
    }

    /// Merge one inbound snapshot, latest-by-tick. Phase never regresses:
    /// a snapshot older in phase than the local replica updates counters
    /// and time only. A snapshot reporting `Ended` while the local phase is
    /// not forces the end locally (the reliable message was missed).
    pub fn merge_snapshot(&mut self, snapshot: &Snapshot) -> SnapshotMerge {
        if let Some(last) = self.last_snapshot_tick {
            if !sequence_greater_than(snapshot.tick, last) {
                return SnapshotMerge::Stale;
            }
        }
        self.last_snapshot_tick = Some(snapshot.tick);

        self.remaining_time = snapshot.remaining_time;
        self.completed_tasks = snapshot.completed_tasks;
        self.total_tasks = snapshot.total_tasks;

        if snapshot.phase == Phase::Ended && self.phase != Phase::Ended {
            warn!("snapshot reports session end, forcing local end state");
            self.phase = Phase::Ended;
            self.timer_active = false;
            return SnapshotMerge::ForcedEnd(self.infer_outcome());
        }

        if snapshot.phase > self.phase {
            self.phase = snapshot.phase;
        }
        if self.phase != Phase::Ended {
            self.timer_active = snapshot.timer_active;
        }
        SnapshotMerge::Applied
    }
}
