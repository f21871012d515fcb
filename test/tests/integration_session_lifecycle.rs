//! Session lifecycle over the wire: readiness accumulation, the start
//! broadcast, win/timeout/departure endings, and idempotence of every
//! reliable transition against duplicate delivery.

use handoff_node::{NodeConfig, PhaseChangeEvent, Zone};
use handoff_shared::{Outcome, ParticipantId, Phase, ReliableMessage};
use handoff_test::{Cluster, FixedSpawner, COORDINATOR};

const MEMBER: ParticipantId = ParticipantId(2);

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

/// Seed 3 tasks, mark both participants ready, and run until play begins.
fn started_cluster() -> (Cluster, FixedSpawner) {
    let mut cluster = Cluster::new(2, config());
    let mut spawner = FixedSpawner::new("Sales");
    cluster
        .with(COORDINATOR, |node, transport| {
            node.seed_session(3, &mut spawner, transport)
        })
        .unwrap();
    cluster.deliver_all();
    cluster
        .with(COORDINATOR, |node, transport| node.mark_ready(transport))
        .unwrap();
    cluster
        .with(MEMBER, |node, transport| node.mark_ready(transport))
        .unwrap();
    cluster.deliver_all();
    cluster.step(0.0);
    (cluster, spawner)
}

#[test]
fn two_ready_notices_start_the_session() {
    init();
    let (mut cluster, _) = started_cluster();

    for id in [COORDINATOR, MEMBER] {
        assert_eq!(cluster.node(id).session().phase(), Phase::Playing);
        assert_eq!(cluster.node(id).session().total_tasks(), 3);
        assert_eq!(cluster.node(id).session().remaining_time(), 120.0);
        assert!(cluster.node(id).session().timer_active());
    }
}

#[test]
fn session_does_not_start_below_required_readiness() {
    init();
    let mut cluster = Cluster::new(2, config());
    let mut spawner = FixedSpawner::new("Sales");
    cluster
        .with(COORDINATOR, |node, transport| {
            node.seed_session(3, &mut spawner, transport)
        })
        .unwrap();

    // One participant ready, retransmitted: readiness must count each
    // distinct participant at most once.
    for _ in 0..4 {
        cluster.with(COORDINATOR, |node, transport| {
            node.receive(
                MEMBER,
                ReliableMessage::Ready {
                    participant: MEMBER,
                },
                transport,
            );
        });
    }
    cluster.step(0.0);

    assert_eq!(
        cluster.node(COORDINATOR).session().phase(),
        Phase::WaitingForParticipants
    );
}

#[test]
fn three_placements_win_the_session() {
    init();
    let (mut cluster, mut spawner) = started_cluster();
    let zone = Zone::new("Sales");

    for _ in 0..3 {
        let object = cluster.sole_object(COORDINATOR);
        cluster
            .with(COORDINATOR, |node, transport| {
                node.object_entered_zone(object, &zone, &mut spawner, transport)
            })
            .unwrap();
        cluster.deliver_all();
    }

    for id in [COORDINATOR, MEMBER] {
        assert_eq!(cluster.node(id).session().phase(), Phase::Ended);
        assert_eq!(cluster.node(id).session().completed_tasks(), 3);
    }
    let changes: Vec<_> = cluster.node(MEMBER).events().read::<PhaseChangeEvent>().collect();
    assert_eq!(changes.last(), Some(&(Phase::Ended, Some(Outcome::Win))));

    // After the final placement no replacement is spawned.
    assert!(cluster.node(COORDINATOR).custody().is_empty());
}

#[test]
fn mismatched_category_is_not_counted() {
    init();
    let (mut cluster, mut spawner) = started_cluster();
    let wrong_zone = Zone::new("Finance");

    let object = cluster.sole_object(COORDINATOR);
    cluster
        .with(COORDINATOR, |node, transport| {
            node.object_entered_zone(object, &wrong_zone, &mut spawner, transport)
        })
        .unwrap();
    cluster.deliver_all();

    assert_eq!(cluster.node(COORDINATOR).session().completed_tasks(), 0);
    assert!(cluster.node(COORDINATOR).custody().contains(object));
}

#[test]
fn timeout_ends_the_session_as_a_loss() {
    init();
    let (mut cluster, mut spawner) = started_cluster();

    cluster.step(121.0);

    for id in [COORDINATOR, MEMBER] {
        assert_eq!(cluster.node(id).session().phase(), Phase::Ended);
        assert_eq!(cluster.node(id).session().remaining_time(), 0.0);
        assert!(!cluster.node(id).session().timer_active());
    }
    let changes: Vec<_> = cluster.node(MEMBER).events().read::<PhaseChangeEvent>().collect();
    assert_eq!(changes.last(), Some(&(Phase::Ended, Some(Outcome::Loss))));

    // Placements after the end are no longer counted.
    let object = cluster.sole_object(COORDINATOR);
    let zone = Zone::new("Sales");
    cluster
        .with(COORDINATOR, |node, transport| {
            node.object_entered_zone(object, &zone, &mut spawner, transport)
        })
        .unwrap();
    assert_eq!(cluster.node(COORDINATOR).session().completed_tasks(), 0);
}

#[test]
fn departure_mid_session_ends_as_a_loss() {
    init();
    let (mut cluster, _) = started_cluster();

    cluster.with(COORDINATOR, |node, transport| {
        node.participant_left(MEMBER, transport);
    });
    cluster.deliver_all();

    assert_eq!(cluster.node(COORDINATOR).session().phase(), Phase::Ended);
    // The departure notice raced nothing here: the member still receives
    // the reliable end and converges before actually disconnecting.
    assert_eq!(cluster.node(MEMBER).session().phase(), Phase::Ended);
}

#[test]
fn duplicate_start_is_a_no_op() {
    init();
    let (mut cluster, _) = started_cluster();

    // Burn some time, then replay the start message.
    cluster.step(30.0);
    assert!(cluster.node(COORDINATOR).session().remaining_time() < 120.0);
    let member_before = cluster.node(MEMBER).session().remaining_time();
    cluster.with(MEMBER, |node, transport| {
        node.receive(
            COORDINATOR,
            ReliableMessage::StartSession {
                duration: 120.0,
                total_tasks: 3,
            },
            transport,
        );
    });

    assert_eq!(cluster.node(MEMBER).session().phase(), Phase::Playing);
    // The member's replicated time is not reset by the duplicate.
    assert_eq!(cluster.node(MEMBER).session().remaining_time(), member_before);
}

#[test]
fn duplicate_end_is_a_no_op() {
    init();
    let (mut cluster, _) = started_cluster();

    for _ in 0..2 {
        cluster.with(MEMBER, |node, transport| {
            node.receive(
                COORDINATOR,
                ReliableMessage::EndSession {
                    outcome: Outcome::Win,
                },
                transport,
            );
        });
    }
    // A contradictory retransmission after the end changes nothing either.
    cluster.with(MEMBER, |node, transport| {
        node.receive(
            COORDINATOR,
            ReliableMessage::EndSession {
                outcome: Outcome::Loss,
            },
            transport,
        );
    });

    assert_eq!(cluster.node(MEMBER).session().phase(), Phase::Ended);
    let changes: Vec<_> = cluster.node(MEMBER).events().read::<PhaseChangeEvent>().collect();
    let endings = changes
        .iter()
        .filter(|(phase, _)| *phase == Phase::Ended)
        .count();
    assert_eq!(endings, 1);
}
