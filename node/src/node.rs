use std::collections::{HashMap, HashSet};

use log::{info, warn};

use handoff_shared::{
    CustodyError, CustodyTable, ObjectId, ObjectState, Outcome, ParticipantId, Phase, Pose,
    ReliableMessage, Role, SessionState, Snapshot, SnapshotMerge, Tick, Transport,
};

use crate::{
    config::NodeConfig,
    error::NodeError,
    events::{CustodyOutcome, Events},
    placement::Zone,
    spawn::Spawner,
};

/// An outstanding custody request, waiting on the custodian's reply.
struct PendingRequest {
    sent_to: ParticipantId,
    age: Tick,
}

/// One participant's runtime for a handoff session.
///
/// Driven by the local control loop: call [`Node::tick`] once per discrete
/// step, feed inbound traffic through the `receive_*` methods, and drain
/// [`Node::events`] for the collaborator layers. No method blocks; custody
/// requests resolve asynchronously.
pub struct Node {
    id: ParticipantId,
    role: Role,
    coordinator: ParticipantId,
    config: NodeConfig,
    tick: Tick,
    session: SessionState,
    custody: CustodyTable,
    /// Objects under exclusive local control, with the pose the input
    /// collaborator last supplied. Membership doubles as the kinematic flag.
    held: HashMap<ObjectId, Pose>,
    pending: HashMap<ObjectId, PendingRequest>,
    /// Active participants, local one included. Maintained from the
    /// connection layer's join/leave notifications.
    participants: HashSet<ParticipantId>,
    /// Coordinator-local: who has reported ready. A set, so retransmitted
    /// ready notices count each participant at most once.
    ready: HashSet<ParticipantId>,
    /// Coordinator-local: next object id to assign.
    next_object_id: u32,
    ticks_since_snapshot: u16,
    events: Events,
}

impl Node {
    pub fn new(
        id: ParticipantId,
        role: Role,
        coordinator: ParticipantId,
        config: NodeConfig,
    ) -> Self {
        let required = config.required_participants;
        let mut participants = HashSet::new();
        participants.insert(id);
        Self {
            id,
            role,
            coordinator,
            config,
            tick: 0,
            session: SessionState::new(required),
            custody: CustodyTable::new(),
            held: HashMap::new(),
            pending: HashMap::new(),
            participants,
            ready: HashSet::new(),
            next_object_id: 0,
            ticks_since_snapshot: 0,
            events: Events::new(),
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn custody(&self) -> &CustodyTable {
        &self.custody
    }

    pub fn is_holding(&self, object: ObjectId) -> bool {
        self.held.contains_key(&object)
    }

    pub fn has_pending_request(&self, object: ObjectId) -> bool {
        self.pending.contains_key(&object)
    }

    /// Outbound notifications for the collaborator layers; drain once per tick.
    pub fn events(&mut self) -> &mut Events {
        &mut self.events
    }

    // Local control loop

    /// One cooperative step. Coordinator nodes advance the authoritative
    /// timer and evaluate phase transitions here; every node ages its
    /// outstanding custody requests and broadcasts poses for held objects.
    pub fn tick<T: Transport>(&mut self, transport: &mut T, delta: f32) {
        self.tick = self.tick.wrapping_add(1);

        self.age_pending_requests();
        self.broadcast_held_states(transport);

        if !self.role.is_coordinator() {
            // Members only display the last-replicated timer value.
            return;
        }

        self.check_start_condition(transport);

        if self.session.tick_timer(delta) {
            info!("countdown expired, ending session as a loss");
            self.end_session(Outcome::Loss, transport);
        }

        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.config.snapshot_interval {
            self.ticks_since_snapshot = 0;
            transport.broadcast_snapshot(self.session.snapshot(self.tick));
        }
    }

    fn age_pending_requests(&mut self) {
        let timeout = self.config.custody_timeout;
        let mut expired = Vec::new();
        for (object, request) in self.pending.iter_mut() {
            request.age = request.age.wrapping_add(1);
            if request.age >= timeout {
                expired.push(*object);
            }
        }
        for object in expired {
            warn!("custody request for {object} timed out");
            self.pending.remove(&object);
            self.fail_request(object);
        }
    }

    fn broadcast_held_states<T: Transport>(&mut self, transport: &mut T) {
        for (object, pose) in self.held.iter() {
            transport.broadcast_state(ObjectState {
                object: *object,
                custodian: self.id,
                pose: *pose,
                tick: self.tick,
            });
        }
    }

    fn check_start_condition<T: Transport>(&mut self, transport: &mut T) {
        if self.session.phase() != Phase::WaitingForParticipants {
            return;
        }
        let enough_ready = self.ready.len() as u32 >= self.session.required_participants();
        if !enough_ready || self.session.total_tasks() == 0 {
            return;
        }

        let duration = self.config.countdown_duration;
        let total_tasks = self.session.total_tasks();
        if self.session.apply_start(duration, total_tasks) {
            self.events.push_phase_change(Phase::Playing, None);
            if let Err(error) = transport.broadcast_reliable(ReliableMessage::StartSession {
                duration,
                total_tasks,
            }) {
                self.events.push_error(NodeError::Transport(error));
            }
        }
    }

    fn end_session<T: Transport>(&mut self, outcome: Outcome, transport: &mut T) {
        if self.session.apply_end(outcome) {
            self.events.push_phase_change(Phase::Ended, Some(outcome));
            if let Err(error) =
                transport.broadcast_reliable(ReliableMessage::EndSession { outcome })
            {
                self.events.push_error(NodeError::Transport(error));
            }
        }
    }

    // Membership (driven by the connection layer)

    pub fn participant_joined<T: Transport>(&mut self, participant: ParticipantId, transport: &mut T) {
        if !self.participants.insert(participant) {
            return;
        }
        info!("{participant} joined ({} present)", self.participants.len());

        // Late joiners learn the object table reliably; the periodic
        // snapshot catches their session replica up.
        if self.role.is_coordinator() {
            for (object, entry) in self.custody.iter() {
                let message = ReliableMessage::ObjectSpawned {
                    object,
                    category: entry.category().to_string(),
                };
                if let Err(error) = transport.send_reliable(participant, message) {
                    self.events.push_error(NodeError::Transport(error));
                }
            }
        }
    }

    pub fn participant_left<T: Transport>(&mut self, participant: ParticipantId, transport: &mut T) {
        if !self.participants.remove(&participant) {
            return;
        }
        info!("{participant} left ({} remain)", self.participants.len());
        self.ready.remove(&participant);

        // Everything the departed participant held falls back to
        // coordinator-default custody on every remaining node.
        self.custody.release_all_held_by(participant);

        // Requests in flight to the departed custodian will never resolve.
        let orphaned: Vec<ObjectId> = self
            .pending
            .iter()
            .filter(|(_, request)| request.sent_to == participant)
            .map(|(object, _)| *object)
            .collect();
        for object in orphaned {
            self.pending.remove(&object);
            self.fail_request(object);
        }

        if self.role.is_coordinator() && self.session.phase() == Phase::Playing {
            warn!("{participant} left mid-session, ending as a loss");
            self.end_session(Outcome::Loss, transport);
        }
    }

    /// Collaborator-layer hand-over after the previous coordinator departed.
    /// Authority resumes from this node's best local knowledge; members
    /// re-converge from its first broadcasts.
    pub fn assume_coordinator(&mut self) {
        info!("{} assuming the coordinator role", self.id);
        self.role = Role::Coordinator;
        self.coordinator = self.id;
        self.session.reset_snapshot_ordering();
    }

    pub fn set_coordinator(&mut self, coordinator: ParticipantId) {
        if coordinator == self.coordinator {
            return;
        }
        self.coordinator = coordinator;
        // The successor's snapshot ticks restart from its own counter.
        self.session.reset_snapshot_ordering();
    }

    // Local intents (driven by the input collaborator)

    /// Report local setup finished. Sent reliably to the coordinator; the
    /// coordinator counts each participant at most once.
    pub fn mark_ready<T: Transport>(&mut self, transport: &mut T) -> Result<(), NodeError> {
        if self.role.is_coordinator() {
            self.accept_ready(self.id);
            return Ok(());
        }
        transport.send_reliable(
            self.coordinator,
            ReliableMessage::Ready {
                participant: self.id,
            },
        )?;
        Ok(())
    }

    /// Ask the current custodian for custody of `object`. Fire-and-forget;
    /// the outcome arrives later as a [`CustodyOutcome`] event.
    pub fn request_custody<T: Transport>(
        &mut self,
        object: ObjectId,
        transport: &mut T,
    ) -> Result<(), NodeError> {
        if self.held.contains_key(&object) {
            return Err(NodeError::AlreadyHeld(object));
        }
        if self.pending.contains_key(&object) {
            return Err(NodeError::RequestPending(object));
        }

        // Unset custodian means the coordinator is the default custodian.
        let custodian = self.custody.custodian(object)?;
        let target = custodian.unwrap_or(self.coordinator);

        if target == self.id {
            // We already are the custodian (or the default one): a local
            // hand-off, announced so every table converges. Announce first;
            // if the broadcast fails nothing changed, custody of record
            // included.
            transport.broadcast_reliable(ReliableMessage::CustodyGrant {
                object,
                new_custodian: self.id,
            })?;
            self.take_custody(object);
            return Ok(());
        }

        transport.send_reliable(
            target,
            ReliableMessage::CustodyRequest {
                object,
                requester: self.id,
            },
        )?;
        self.pending.insert(
            object,
            PendingRequest {
                sent_to: target,
                age: 0,
            },
        );
        Ok(())
    }

    /// Voluntarily stop manipulating a held object. Custody of record stays
    /// with this participant until someone else requests it.
    pub fn release_custody(&mut self, object: ObjectId) {
        if self.held.remove(&object).is_some() {
            self.events.push_custody(object, CustodyOutcome::Released);
        }
    }

    /// Update the desired pose of a held object; broadcast on the next tick.
    pub fn set_held_pose(&mut self, object: ObjectId, pose: Pose) {
        if let Some(held_pose) = self.held.get_mut(&object) {
            *held_pose = pose;
        }
    }

    // Coordinator operations

    /// Seed the session: register the task total and spawn the first
    /// object. Coordinator only.
    pub fn seed_session<T: Transport, S: Spawner>(
        &mut self,
        total_tasks: u32,
        spawner: &mut S,
        transport: &mut T,
    ) -> Result<(), NodeError> {
        if !self.role.is_coordinator() {
            return Err(NodeError::NotCoordinator);
        }
        self.session.set_total_tasks(total_tasks);
        self.spawn_object(spawner, transport)?;
        Ok(())
    }

    /// Placement evaluation: a shared object overlaps a zone. Coordinator
    /// only; a category mismatch or an already-ended session is a no-op.
    ///
    /// Effect order matters: custody is reclaimed before the object is
    /// destroyed, so no participant is left holding a destroyed object.
    pub fn object_entered_zone<T: Transport, S: Spawner>(
        &mut self,
        object: ObjectId,
        zone: &Zone,
        spawner: &mut S,
        transport: &mut T,
    ) -> Result<(), NodeError> {
        if !self.role.is_coordinator() {
            return Err(NodeError::NotCoordinator);
        }
        let entry = self.custody.entry(object)?;
        if !zone.accepts(entry) {
            return Ok(());
        }
        if self.session.phase() != Phase::Playing || !self.session.timer_active() {
            warn!("placement of {object} ignored outside active play");
            return Ok(());
        }
        info!("{object} placed in matching zone '{}'", zone.category());

        // 1. Reclaim custody from whoever is manipulating the object.
        match entry.custodian() {
            Some(custodian) if custodian == self.id => {
                self.release_custody(object);
            }
            Some(custodian) => {
                transport.send_reliable(custodian, ReliableMessage::CustodyRevoke { object })?;
            }
            None => {}
        }
        self.custody.set_custodian(object, None)?;

        // 2. Count the completed task; this may conclude the session.
        if self.session.record_completion().is_some()
            && self.session.completed_tasks() >= self.session.total_tasks()
        {
            self.end_session(Outcome::Win, transport);
        }

        // 3. Replacement object, unless the session just concluded.
        if self.session.phase() == Phase::Playing {
            self.spawn_object(spawner, transport)?;
        }

        // 4. Destroy the placed object everywhere.
        self.destroy_object(object, transport)
    }

    /// Coordinator-privileged destruction, regardless of current custody.
    pub fn destroy_object<T: Transport>(
        &mut self,
        object: ObjectId,
        transport: &mut T,
    ) -> Result<(), NodeError> {
        if !self.role.is_coordinator() {
            return Err(NodeError::NotCoordinator);
        }
        if self.custody.deregister(object).is_none() {
            return Err(NodeError::Custody(CustodyError::UnknownObject(object)));
        }
        self.held.remove(&object);
        self.events.push_despawn(object);
        transport.broadcast_reliable(ReliableMessage::ObjectDestroyed { object })?;
        Ok(())
    }

    fn spawn_object<T: Transport, S: Spawner>(
        &mut self,
        spawner: &mut S,
        transport: &mut T,
    ) -> Result<(), NodeError> {
        let object = ObjectId(self.next_object_id);
        self.next_object_id += 1;
        let category = spawner.next_category();
        self.custody.register(object, category.clone())?;
        info!("spawned {object} with category '{category}'");
        self.events.push_spawn(object, category.clone());
        transport.broadcast_reliable(ReliableMessage::ObjectSpawned { object, category })?;
        Ok(())
    }

    // Inbound reliable stream

    pub fn receive<T: Transport>(
        &mut self,
        _from: ParticipantId,
        message: ReliableMessage,
        transport: &mut T,
    ) {
        match message {
            ReliableMessage::Ready { participant } => self.on_ready(participant),
            ReliableMessage::StartSession {
                duration,
                total_tasks,
            } => {
                if self.session.apply_start(duration, total_tasks) {
                    self.events.push_phase_change(Phase::Playing, None);
                }
            }
            ReliableMessage::EndSession { outcome } => {
                if self.session.apply_end(outcome) {
                    self.events.push_phase_change(Phase::Ended, Some(outcome));
                }
            }
            ReliableMessage::CustodyRequest { object, requester } => {
                self.on_custody_request(object, requester, transport);
            }
            ReliableMessage::CustodyGrant {
                object,
                new_custodian,
            } => self.on_custody_grant(object, new_custodian),
            ReliableMessage::CustodyDeny { object, custodian } => {
                // The denier's view re-points a stale table so a retry
                // reaches the real custodian.
                if let Some(actual) = custodian {
                    let _ = self.custody.set_custodian(object, Some(actual));
                }
                if self.pending.remove(&object).is_some() {
                    self.events.push_custody(object, CustodyOutcome::Denied);
                }
            }
            ReliableMessage::CustodyRevoke { object } => self.on_custody_revoke(object),
            ReliableMessage::ObjectSpawned { object, category } => {
                // Duplicate delivery of a spawn is a no-op.
                if self.custody.register(object, category.clone()).is_ok() {
                    self.events.push_spawn(object, category);
                }
            }
            ReliableMessage::ObjectDestroyed { object } => self.on_object_destroyed(object),
        }
    }

    fn on_ready(&mut self, participant: ParticipantId) {
        if !self.role.is_coordinator() {
            warn!("ready notice from {participant} received by a non-coordinator, ignoring");
            return;
        }
        self.accept_ready(participant);
    }

    fn accept_ready(&mut self, participant: ParticipantId) {
        if self.session.phase() != Phase::WaitingForParticipants {
            return;
        }
        if self.ready.insert(participant) {
            info!(
                "{participant} is ready ({}/{})",
                self.ready.len(),
                self.session.required_participants()
            );
        }
    }

    fn on_custody_request<T: Transport>(
        &mut self,
        object: ObjectId,
        requester: ParticipantId,
        transport: &mut T,
    ) {
        let custodian = match self.custody.custodian(object) {
            Ok(custodian) => custodian,
            Err(_) => {
                // Object already destroyed locally; refuse so the requester
                // clears its speculative state.
                self.deny(object, None, requester, transport);
                return;
            }
        };

        let we_are_custodian = custodian == Some(self.id)
            || (custodian.is_none() && self.role.is_coordinator());
        if !we_are_custodian {
            // Lost race or stale table at the requester: first processed
            // request won, this one is refused.
            self.deny(object, custodian, requester, transport);
            return;
        }

        // Default policy: a custodian not actively needing the object
        // always grants, like a physical hand-off.
        let was_held = self.held.remove(&object);
        if let Err(error) = self.custody.set_custodian(object, Some(requester)) {
            self.events.push_error(NodeError::Custody(error));
            return;
        }

        if let Err(error) = transport.broadcast_reliable(ReliableMessage::CustodyGrant {
            object,
            new_custodian: requester,
        }) {
            // The grant never left; roll back to holding.
            warn!("custody grant for {object} failed to send, keeping custody");
            if let Some(pose) = was_held {
                self.held.insert(object, pose);
            }
            let rollback = self.custody.set_custodian(object, custodian);
            if let Err(error) = rollback {
                self.events.push_error(NodeError::Custody(error));
            }
            self.events.push_error(NodeError::Transport(error));
            return;
        }

        info!("granted custody of {object} to {requester}");
        if was_held.is_some() {
            self.events.push_custody(object, CustodyOutcome::Released);
        }
    }

    fn deny<T: Transport>(
        &mut self,
        object: ObjectId,
        custodian: Option<ParticipantId>,
        requester: ParticipantId,
        transport: &mut T,
    ) {
        if let Err(error) =
            transport.send_reliable(requester, ReliableMessage::CustodyDeny { object, custodian })
        {
            self.events.push_error(NodeError::Transport(error));
        }
    }

    fn on_custody_grant(&mut self, object: ObjectId, new_custodian: ParticipantId) {
        if self.custody.set_custodian(object, Some(new_custodian)).is_err() {
            // Grant for an object we no longer know; stale, ignore.
            return;
        }

        if new_custodian == self.id {
            self.pending.remove(&object);
            if self.take_custody(object) {
                info!("custody of {object} granted to local participant");
            }
        } else if self.held.remove(&object).is_some() {
            // Someone else was granted an object we believed we held; the
            // transfer raced ahead of us. Yield immediately.
            warn!("lost custody of {object} to {new_custodian}");
            self.events.push_custody(object, CustodyOutcome::Revoked);
        }
    }

    /// Assume exclusive local control of `object`. Returns `false` when it
    /// was already held (duplicate grant).
    fn take_custody(&mut self, object: ObjectId) -> bool {
        let _ = self.custody.set_custodian(object, Some(self.id));
        let pose = self
            .custody
            .entry(object)
            .map(|entry| entry.pose())
            .unwrap_or_default();
        if self.held.insert(object, pose).is_none() {
            self.events.push_custody(object, CustodyOutcome::Granted);
            return true;
        }
        false
    }

    fn on_custody_revoke(&mut self, object: ObjectId) {
        // Revoking an object we don't think we hold is a harmless no-op.
        if self.held.remove(&object).is_some() {
            info!("custody of {object} revoked by the coordinator");
            self.events.push_custody(object, CustodyOutcome::Revoked);
        }
        if self.custody.contains(object) {
            let _ = self.custody.set_custodian(object, None);
        }
        self.pending.remove(&object);
    }

    fn on_object_destroyed(&mut self, object: ObjectId) {
        if self.custody.deregister(object).is_none() {
            return;
        }
        if self.held.remove(&object).is_some() {
            // The object vanished out of our hands; physics must let go.
            self.events.push_custody(object, CustodyOutcome::Revoked);
        }
        if self.pending.remove(&object).is_some() {
            // Destroyed mid-transfer; the request can never be granted.
            self.events.push_custody(object, CustodyOutcome::Failed);
        }
        self.events.push_despawn(object);
    }

    fn fail_request(&mut self, object: ObjectId) {
        if self.custody.contains(object) {
            let _ = self.custody.set_custodian(object, None);
        }
        self.events.push_custody(object, CustodyOutcome::Failed);
    }

    // Inbound best-effort stream

    pub fn receive_snapshot(&mut self, snapshot: &Snapshot) {
        if self.role.is_coordinator() {
            // Authoritative copy; a trailing snapshot from a previous
            // coordinator carries nothing for us.
            return;
        }
        let before = self.session.phase();
        match self.session.merge_snapshot(snapshot) {
            SnapshotMerge::Stale => {}
            SnapshotMerge::ForcedEnd(outcome) => {
                self.events.push_phase_change(Phase::Ended, Some(outcome));
            }
            SnapshotMerge::Applied => {
                let after = self.session.phase();
                if after != before {
                    self.events.push_phase_change(after, None);
                }
            }
        }
    }

    pub fn receive_object_state(&mut self, state: &ObjectState) {
        if !self.custody.apply_object_state(state) {
            return;
        }
        if state.custodian != self.id && self.held.remove(&state.object).is_some() {
            // An applied broadcast names another custodian: our view of
            // the transfer was behind. Converge by yielding.
            warn!(
                "yielding custody of {} to {} after state broadcast",
                state.object, state.custodian
            );
            self.events.push_custody(state.object, CustodyOutcome::Revoked);
        }
    }
}
