// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::rc::Rc;

use junction_fabric::address::{GenericAddress, NetworkAddress};
use junction_fabric::arbiter::ArbitrationPolicy;
use junction_fabric::channel::Channel;
use junction_fabric::device::{DeviceConfig, NetDevice};
use junction_fabric::queue::QueueConfig;
use junction_fabric::test_helpers::{TestPacket, start_test};
use junction_fabric::topology::TopologyConfig;
use junction_fabric::traits::Routable;
use junction_track::entity::Entity;
use junction_track::{Id, Unique};

const ORIGIN: NetworkAddress = NetworkAddress::from_raw(0);

/// A channel that records what it is sent and can be closed.
#[derive(Clone, Default)]
struct TestChannel {
    sent: Rc<RefCell<Vec<TestPacket>>>,
    closed: Rc<RefCell<bool>>,
}

impl Channel<TestPacket> for TestChannel {
    fn is_ready(&self) -> bool {
        !*self.closed.borrow()
    }

    fn send(&mut self, value: TestPacket) {
        self.sent.borrow_mut().push(value);
    }
}

fn config(capacity: usize) -> DeviceConfig {
    DeviceConfig {
        queue: QueueConfig::new(capacity).unwrap(),
        ..DeviceConfig::default()
    }
}

fn device(top: &Rc<Entity>, capacity: usize) -> NetDevice<TestPacket> {
    NetDevice::new(top, "dev", ORIGIN, &config(capacity)).unwrap()
}

fn packet(top: &Rc<Entity>, x: u8, y: u8, z: u8) -> TestPacket {
    TestPacket::new(top, NetworkAddress::new(x, y, z))
}

#[test]
fn wiring() {
    let top = start_test(file!());
    let dev = device(&top, 4);
    let n = dev.num_ports();
    assert_eq!(n, 7);
    assert_eq!(dev.local_port(), 6);

    for i in 0..n {
        let row: Vec<usize> = (0..n).map(|j| i * n + j).collect();
        let column: Vec<usize> = (0..n).map(|j| j * n + i).collect();
        assert_eq!(dev.receiver_row(i), row.as_slice());
        assert_eq!(dev.transmitter_column(i), column.as_slice());
        for j in 0..n {
            assert_eq!(dev.queue_index(i, j), i * n + j);
        }
    }
}

#[test]
fn inject_routes_to_output_queue() {
    let top = start_test(file!());
    let mut dev = device(&top, 4);

    assert!(dev.inject_packet(packet(&top, 1, 0, 0)).is_ok());
    assert!(dev.inject_packet(packet(&top, 2, 0, 0)).is_ok());
    assert!(dev.inject_packet(packet(&top, 0, 1, 2)).is_ok());

    assert_eq!(dev.queue_fill_level(6, 1), 1);
    assert_eq!(dev.queue_fill_level(6, 0), 1);
    assert_eq!(dev.queue_fill_level(6, 3), 1);
    assert_eq!(dev.pending(), 3);
}

#[test]
fn inject_rejected_while_blocked() {
    let top = start_test(file!());
    let mut dev = device(&top, 2);

    assert!(dev.inject_packet(packet(&top, 1, 0, 0)).is_ok());
    assert!(!dev.is_receiver_blocked(6));
    assert!(dev.inject_packet(packet(&top, 1, 0, 0)).is_ok());
    assert!(dev.is_queue_blocked(6, 1));
    assert!(dev.is_receiver_blocked(6));

    // Even a packet for an empty queue is refused
    let rejected = dev.inject_packet(packet(&top, 0, 1, 0)).unwrap_err();
    assert_eq!(rejected.destination(), NetworkAddress::new(0, 1, 0));
    assert_eq!(dev.pending(), 2);
    assert_eq!(dev.queue_fill_level(6, 1), 2);
    assert_eq!(dev.queue_fill_level(6, 3), 0);
}

#[test]
fn receiver_stays_blocked_until_row_drains() {
    let top = start_test(file!());
    let mut dev = device(&top, 1);

    let x_channel = TestChannel::default();
    let y_channel = TestChannel::default();
    dev.connect_tx_channel(1, Box::new(x_channel.clone())).unwrap();
    dev.connect_tx_channel(3, Box::new(y_channel.clone())).unwrap();

    assert!(dev.receive(0, packet(&top, 1, 0, 0)).is_ok());
    assert!(dev.is_receiver_blocked(0));
    assert!(dev.receive(0, packet(&top, 0, 1, 0)).is_ok());
    assert!(dev.is_queue_blocked(0, 1));
    assert!(dev.is_queue_blocked(0, 3));

    // A third packet for a full queue is handed back
    assert!(dev.receive(0, packet(&top, 1, 0, 0)).is_err());

    assert!(dev.transmit(1));
    assert_eq!(x_channel.sent.borrow().len(), 1);
    assert!(!dev.is_queue_blocked(0, 1));
    assert!(dev.is_receiver_blocked(0));

    assert!(dev.transmit(3));
    assert_eq!(y_channel.sent.borrow().len(), 1);
    assert!(!dev.is_receiver_blocked(0));
}

#[test]
fn eject_local_packets() {
    let top = start_test(file!());
    let mut dev = device(&top, 4);
    assert!(dev.eject_packet().is_none());

    let local = packet(&top, 0, 0, 0);
    let id = local.id();
    assert!(dev.inject_packet(local).is_ok());
    let arriving = packet(&top, 0, 0, 0);
    let arriving_id = arriving.id();
    assert!(dev.receive(4, arriving).is_ok());

    let mut ejected: Vec<Id> = std::iter::from_fn(|| dev.eject_packet())
        .map(|p| p.id())
        .collect();
    ejected.sort_by_key(|id| id.0);
    assert_eq!(ejected, vec![id, arriving_id]);
    assert_eq!(dev.pending(), 0);
}

#[test]
fn eject_unblocks_local_receiver() {
    let top = start_test(file!());
    let mut dev = device(&top, 1);

    assert!(dev.inject_packet(packet(&top, 0, 0, 0)).is_ok());
    assert!(dev.is_receiver_blocked(6));
    assert!(dev.inject_packet(packet(&top, 0, 0, 0)).is_err());

    assert!(dev.eject_packet().is_some());
    assert!(!dev.is_receiver_blocked(6));
    assert!(dev.inject_packet(packet(&top, 0, 0, 0)).is_ok());
}

#[test]
fn transmit_needs_ready_channel() {
    let top = start_test(file!());
    let mut dev = device(&top, 4);
    assert!(dev.inject_packet(packet(&top, 1, 0, 0)).is_ok());

    assert!(!dev.is_tx_connected(1));
    assert!(!dev.transmit(1));

    let channel = TestChannel::default();
    *channel.closed.borrow_mut() = true;
    dev.connect_tx_channel(1, Box::new(channel.clone())).unwrap();
    assert!(!dev.transmit(1));
    assert_eq!(dev.pending(), 1);

    *channel.closed.borrow_mut() = false;
    assert_eq!(dev.transmit_all(), 1);
    assert_eq!(dev.pending(), 0);
    assert_eq!(channel.sent.borrow().len(), 1);
}

#[test]
fn round_robin_serves_every_input() {
    let top = start_test(file!());
    let mut dev = device(&top, 4);
    let channel = TestChannel::default();
    dev.connect_tx_channel(1, Box::new(channel.clone())).unwrap();

    for _ in 0..3 {
        assert!(dev.receive(0, packet(&top, 1, 0, 0)).is_ok());
        assert!(dev.receive(2, packet(&top, 1, 0, 0)).is_ok());
        assert!(dev.inject_packet(packet(&top, 1, 0, 0)).is_ok());
    }

    while dev.transmit(1) {}
    assert_eq!(channel.sent.borrow().len(), 9);
    assert_eq!(dev.pending(), 0);

    // Inputs are served in turn, so packets leave in the order they were
    // created.
    let ids: Vec<u64> = channel.sent.borrow().iter().map(|p| p.id().0).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "{ids:?}");
}

#[test]
fn weighted_round_robin_device() {
    let top = start_test(file!());
    let config = DeviceConfig {
        arbitration: ArbitrationPolicy::WeightedRoundRobin,
        transit_weight: 2,
        ..config(4)
    };
    let mut dev: NetDevice<TestPacket> = NetDevice::new(&top, "dev", ORIGIN, &config).unwrap();
    let channel = TestChannel::default();
    dev.connect_tx_channel(1, Box::new(channel.clone())).unwrap();

    let mut transit = Vec::new();
    for _ in 0..4 {
        let p = packet(&top, 1, 0, 0);
        transit.push(p.id());
        assert!(dev.receive(0, p).is_ok());
    }
    for _ in 0..2 {
        assert!(dev.inject_packet(packet(&top, 1, 0, 0)).is_ok());
    }

    while dev.transmit(1) {}
    let from_transit: Vec<bool> = channel
        .sent
        .borrow()
        .iter()
        .map(|p| transit.contains(&p.id()))
        .collect();
    assert_eq!(from_transit, vec![true, true, false, true, true, false]);
}

#[test]
fn connect_checks_port() {
    let top = start_test(file!());
    let mut dev = device(&top, 4);
    assert!(dev.connect_tx_channel(6, Box::new(TestChannel::default())).is_err());
    assert!(dev.connect_tx_channel(7, Box::new(TestChannel::default())).is_err());
    assert!(dev.connect_tx_channel(5, Box::new(TestChannel::default())).is_ok());
    assert!(dev.is_tx_connected(5));
}

#[test]
#[should_panic(expected = "not a channel port")]
fn receive_on_local_port() {
    let top = start_test(file!());
    let mut dev = device(&top, 4);
    let _ = dev.receive(6, packet(&top, 0, 0, 0));
}

#[test]
#[should_panic(expected = "port 7 out of range")]
fn tx_connected_port_out_of_range() {
    let top = start_test(file!());
    let dev = device(&top, 4);
    let _ = dev.is_tx_connected(7);
}

#[test]
fn set_address() {
    let top = start_test(file!());
    let mut dev = device(&top, 4);

    let address = NetworkAddress::new(1, 0, 0);
    dev.set_address(&GenericAddress::from(address)).unwrap();
    assert_eq!(dev.address(), address);

    assert!(dev.inject_packet(packet(&top, 1, 0, 0)).is_ok());
    assert_eq!(dev.queue_fill_level(6, 6), 1);

    let foreign = GenericAddress::new(0x01, &[0; 4]).unwrap();
    assert!(dev.set_address(&foreign).is_err());
    let outside = GenericAddress::from(NetworkAddress::new(3, 0, 0));
    assert!(dev.set_address(&outside).is_err());
    assert_eq!(dev.address(), address);
}

#[test]
fn config_errors() {
    let top = start_test(file!());

    let too_few_channels = DeviceConfig {
        num_channels: 4,
        ..DeviceConfig::default()
    };
    assert!(NetDevice::<TestPacket>::new(&top, "dev", ORIGIN, &too_few_channels).is_err());

    let planar = DeviceConfig {
        num_channels: 4,
        topology: TopologyConfig::torus(4, 4, 1).unwrap(),
        ..DeviceConfig::default()
    };
    assert!(NetDevice::<TestPacket>::new(&top, "dev", ORIGIN, &planar).is_ok());

    let outside = NetworkAddress::new(0, 0, 3);
    assert!(NetDevice::<TestPacket>::new(&top, "dev", outside, &DeviceConfig::default()).is_err());
}
