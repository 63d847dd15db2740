//! Tests that drive a queue coordinator through the protocol.

mod common;

use common::*;
use traffic_reserve::msg::i2v::{QueueI2vMessage, QueueRejectReason};
use traffic_reserve::msg::v2i::QueueV2iMessage;
use traffic_reserve::{
    Coordinator, EventKind, ProtocolConfig, ProtocolState, QueueCoordinator, QueueState,
};

type QueueHarness = Harness<QueueI2vMessage, QueueV2iMessage>;

fn setup() -> (QueueHarness, QueueCoordinator) {
    let h = QueueHarness::new(0.0, 10.0, 15.0, 10.0).with_track(Track {
        start: 50.0,
        end: 60.0,
    });
    (h, QueueCoordinator::new(ProtocolConfig::default(), 0.0).unwrap())
}

fn confirm() -> QueueI2vMessage {
    QueueI2vMessage::Confirm {
        source: manager_id(),
        destination: vehicle_id(),
    }
}

fn go() -> QueueI2vMessage {
    QueueI2vMessage::Go {
        source: manager_id(),
        destination: vehicle_id(),
    }
}

fn reject(reason: QueueRejectReason) -> QueueI2vMessage {
    QueueI2vMessage::Reject {
        source: manager_id(),
        destination: vehicle_id(),
        reason,
    }
}

#[test]
fn zero_request_gap_is_rejected() {
    let config = ProtocolConfig {
        queue_request_time_gap: 0.0,
        ..Default::default()
    };
    assert!(QueueCoordinator::new(config, 0.0).is_err());
}

#[test]
fn queue_then_go() {
    let (mut h, mut coord) = setup();
    h.vehicle
        .inner
        .set_leader(Some((traffic_reserve::VehicleId::default(), 30.0)));
    h.tick(&mut coord).unwrap();
    assert_eq!(coord.state(), QueueState::AwaitingConfirm);
    match h.mailbox.take_outbox().as_slice() {
        [QueueV2iMessage::Request {
            source,
            destination,
            preceding_vehicle,
            distance_to_zone,
        }] => {
            assert_eq!(*source, vehicle_id());
            assert_eq!(*destination, manager_id());
            assert_eq!(*preceding_vehicle, Some(Default::default()));
            assert_eq!(*distance_to_zone, 50.0);
        }
        other => panic!("expected a single request, got {:?}", other),
    }
    h.vehicle.inner.set_leader(None);

    // Both replies in one batch are handled in order
    h.mailbox.deliver(confirm());
    h.mailbox.deliver(go());
    h.advance();
    h.tick(&mut coord).unwrap();
    assert_eq!(coord.state(), QueueState::MovingToZone);

    let mut sent = vec![];
    for _ in 0..1000 {
        h.advance();
        h.tick(&mut coord).unwrap();
        sent.extend(h.mailbox.take_outbox());
        if coord.is_terminated() {
            break;
        }
    }
    assert!(coord.is_terminated());
    assert!(matches!(sent.as_slice(), [QueueV2iMessage::Done { .. }]));
    assert_eq!(h.nav.exits, 1);
    assert!(h.pilot.count("steer_through_zone") > 0);
    assert_eq!(
        &h.events.states_entered()[..],
        &[
            "PreparingRequest",
            "AwaitingConfirm",
            "AwaitingGo",
            "MovingToZone",
            "Traversing",
            "Clearing",
            "Terminal"
        ]
    );
}

#[test]
fn too_far_retries_at_the_request_rate() {
    let (mut h, mut coord) = setup();
    h.nav.dist_to_zone = Some(500.0);
    h.track = None;
    let gap = coord.config().queue_request_time_gap;
    let mut sent_at = vec![];
    for _ in 0..50 {
        h.tick(&mut coord).unwrap();
        for msg in h.mailbox.take_outbox() {
            assert!(matches!(msg, QueueV2iMessage::Request { .. }));
            sent_at.push(h.time());
            h.mailbox.deliver(reject(QueueRejectReason::TooFar));
        }
        h.advance();
    }
    assert!(sent_at.len() > 1);
    for pair in sent_at.windows(2) {
        assert!(pair[1] - pair[0] >= gap - 1e-9);
    }
    assert!(coord.next_allowed_request_time() > *sent_at.last().unwrap());
}

#[test]
fn reject_reasons() {
    let cases = [
        (QueueRejectReason::TooFar, QueueState::Planning),
        (QueueRejectReason::AlreadyInQueue, QueueState::AwaitingGo),
        (QueueRejectReason::VehicleInFrontNotInQueue, QueueState::Planning),
    ];
    for (reason, expected) in cases {
        let (mut h, mut coord) = setup();
        h.tick(&mut coord).unwrap();
        h.mailbox.deliver(reject(reason));
        h.advance();
        h.tick(&mut coord).unwrap();
        let entered = h.events.states_entered();
        assert_eq!(entered[2], expected.name());
        assert_eq!(
            h.events
                .count(|k| *k == EventKind::RequestRejected { reason: reason.name() }),
            1
        );
    }
}

#[test]
fn unexpected_messages_are_discarded() {
    let (mut h, mut coord) = setup();
    h.tick(&mut coord).unwrap();

    // Go before being queued
    h.mailbox.deliver(go());
    h.tick(&mut coord).unwrap();
    assert_eq!(coord.state(), QueueState::AwaitingConfirm);

    h.mailbox.deliver(confirm());
    h.tick(&mut coord).unwrap();
    assert_eq!(coord.state(), QueueState::AwaitingGo);

    // A second confirmation
    h.mailbox.deliver(confirm());
    h.tick(&mut coord).unwrap();
    assert_eq!(coord.state(), QueueState::AwaitingGo);

    let discarded: Vec<(&str, &str)> = h
        .events
        .events()
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::MessageDiscarded { message, state, .. } => Some((message, state)),
            _ => None,
        })
        .collect();
    assert_eq!(
        discarded,
        vec![("QGo", "AwaitingConfirm"), ("QConfirm", "AwaitingGo")]
    );
}
