// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::rc::Rc;

use junction_fabric::address::NetworkAddress;
use junction_fabric::queue::{FlowControlledQueue, QueueConfig};
use junction_fabric::test_helpers::{TestPacket, start_test};
use junction_track::Unique;
use junction_track::entity::{Entity, toplevel};
use junction_track::test_helpers::check_and_clear;
use junction_track::test_init;

fn packets(top: &Rc<Entity>, n: usize) -> Vec<TestPacket> {
    (0..n)
        .map(|_| TestPacket::new(top, NetworkAddress::new(0, 0, 0)))
        .collect()
}

#[test]
fn fifo_order() {
    let top = start_test(file!());
    let mut queue = FlowControlledQueue::new(&top, "queue", QueueConfig::new(8).unwrap()).unwrap();

    let sent = packets(&top, 8);
    for packet in &sent {
        assert!(queue.enqueue(packet.clone()).is_ok());
    }
    assert_eq!(queue.fill_level(), 8);

    let received: Vec<_> = std::iter::from_fn(|| queue.dequeue()).collect();
    assert_eq!(received, sent);
    assert!(queue.is_empty());
    assert!(queue.dequeue().is_none());
}

#[test]
fn full_queue_rejects() {
    let top = start_test(file!());
    let mut queue = FlowControlledQueue::new(&top, "queue", QueueConfig::new(2).unwrap()).unwrap();

    let mut sent = packets(&top, 3).into_iter();
    assert!(queue.enqueue(sent.next().unwrap()).is_ok());
    assert!(!queue.is_blocked());
    assert!(queue.enqueue(sent.next().unwrap()).is_ok());
    assert!(queue.is_blocked());

    let extra = sent.next().unwrap();
    let extra_id = extra.id();
    let rejected = queue.enqueue(extra).unwrap_err();
    assert_eq!(rejected.id(), extra_id);
    assert_eq!(queue.fill_level(), 2);

    assert!(queue.dequeue().is_some());
    assert!(!queue.is_blocked());
    assert!(queue.enqueue(rejected).is_ok());
}

#[test]
fn hysteresis() {
    let top = start_test(file!());
    let config = QueueConfig::new(4).unwrap().with_resume_level(1).unwrap();
    let mut queue = FlowControlledQueue::new(&top, "queue", config).unwrap();

    for packet in packets(&top, 4) {
        assert!(queue.enqueue(packet).is_ok());
    }
    assert!(queue.is_blocked());

    queue.dequeue();
    assert!(queue.is_blocked());
    queue.dequeue();
    assert!(queue.is_blocked());
    queue.dequeue();
    assert_eq!(queue.fill_level(), 1);
    assert!(!queue.is_blocked());
}

#[test]
fn tracks_packets() {
    let (test_tracker, tracker) = test_init!(1);
    let top = toplevel(&tracker, "top");
    let mut queue = FlowControlledQueue::new(&top, "queue", QueueConfig::new(1).unwrap()).unwrap();
    let packet = TestPacket::new(&top, NetworkAddress::new(1, 0, 0));
    check_and_clear(&test_tracker, &["0: created 1, top", "1: created 2, top::queue"]);

    assert!(queue.enqueue(packet).is_ok());
    assert!(queue.dequeue().is_some());
    check_and_clear(
        &test_tracker,
        &[
            "2: 3 entered",
            "2:TRACE: blocked",
            "2: 3 exited",
            "2:TRACE: unblocked",
        ],
    );
}

#[test]
fn bad_config() {
    let top = start_test(file!());
    let config = QueueConfig {
        capacity: 2,
        resume_level: Some(2),
    };
    assert!(FlowControlledQueue::<TestPacket>::new(&top, "queue", config).is_err());
}
