//! Coordinator hand-over: after the connection layer promotes a
//! successor, replicas must converge on its broadcasts even though its
//! tick counter is unrelated to the departed coordinator's.

use log::info;

use handoff_node::NodeConfig;
use handoff_shared::{ParticipantId, Phase};
use handoff_test::{Cluster, FixedSpawner, COORDINATOR};

const MEMBER: ParticipantId = ParticipantId(2);
const SUCCESSOR: ParticipantId = ParticipantId(3);

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config() -> NodeConfig {
    NodeConfig {
        countdown_duration: 120.0,
        required_participants: 2,
        snapshot_interval: 5,
        custody_timeout: 10,
    }
}

/// Three nodes, session seeded and playing.
fn playing_cluster() -> Cluster {
    let mut cluster = Cluster::new(3, config());
    let mut spawner = FixedSpawner::new("Sales");
    cluster
        .with(COORDINATOR, |node, transport| {
            node.seed_session(3, &mut spawner, transport)
        })
        .unwrap();
    cluster.deliver_all();
    for id in [COORDINATOR, MEMBER] {
        cluster
            .with(id, |node, transport| node.mark_ready(transport))
            .unwrap();
    }
    cluster.deliver_all();
    cluster.step(0.0);
    cluster
}

/// The connection layer's hand-over: the old coordinator drops out and
/// the successor is promoted, everyone else re-pointed.
fn migrate(cluster: &mut Cluster) {
    cluster.disconnect(COORDINATOR);
    for id in [MEMBER, SUCCESSOR] {
        cluster.with(id, |node, transport| {
            node.participant_left(COORDINATOR, transport);
        });
    }
    cluster.with(SUCCESSOR, |node, _| node.assume_coordinator());
    cluster.with(MEMBER, |node, _| node.set_coordinator(SUCCESSOR));
}

#[test]
fn members_converge_on_the_successor_coordinator() {
    init();
    let mut cluster = playing_cluster();

    // The departing coordinator's snapshot counter had run far ahead of
    // anything the successor will ever send.
    let ahead = cluster.node(COORDINATOR).session().snapshot(30_000);
    cluster.node(MEMBER).receive_snapshot(&ahead);
    cluster.node(SUCCESSOR).receive_snapshot(&ahead);
    let frozen = cluster.node(MEMBER).session().remaining_time();

    info!("promoting {SUCCESSOR} after the coordinator dropped");
    migrate(&mut cluster);

    // The successor's snapshots restart near tick zero; the member must
    // accept them instead of discarding them as stale.
    for _ in 0..10 {
        cluster.step(1.0);
    }

    assert_eq!(cluster.node(MEMBER).session().phase(), Phase::Playing);
    let authoritative = cluster.node(SUCCESSOR).session().remaining_time();
    let replicated = cluster.node(MEMBER).session().remaining_time();
    info!("clocks after hand-over: successor {authoritative}, member {replicated}");
    assert!(replicated < frozen);
    assert!((authoritative - replicated).abs() <= config().snapshot_interval as f32);
}

#[test]
fn successor_coordinator_drives_the_session_to_its_end() {
    init();
    let mut cluster = playing_cluster();
    migrate(&mut cluster);

    // The promoted coordinator owns the timer now; its timeout ends the
    // session for everyone left.
    cluster.step(121.0);

    for id in [MEMBER, SUCCESSOR] {
        assert_eq!(cluster.node(id).session().phase(), Phase::Ended);
        assert!(!cluster.node(id).session().timer_active());
    }
}
