// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The switching fabric of a single network node.
//!
//! A device with `C` channels has `N = C + 1` ports; the last port is the
//! local port through which the host injects and ejects packets.
//!
//! The device owns an `N x N` matrix of [FlowControlledQueue]s stored flat
//! so that queue `(i, j)` holds packets that arrived on port `i` and leave by
//! port `j`:
//!
//! ```txt
//!              tx0     tx1    ...   tx(N-1)
//!   rx0      (0,0)   (0,1)   ...   (0,N-1)
//!   rx1      (1,0)   (1,1)   ...   (1,N-1)
//!   ...
//!   rx(N-1) (N-1,0) (N-1,1)  ...  (N-1,N-1)
//! ```
//!
//! [Receiver] `i` writes to row `i` and [Transmitter] `i` reads from column
//! `i`. Whenever a transmitter removes a packet, the receiver owning the
//! packet's row re-checks whether it is still blocked.
//!
//! The device is driven synchronously: packets arrive by
//! [receive](NetDevice::receive) and
//! [inject_packet](NetDevice::inject_packet), and leave by
//! [transmit](NetDevice::transmit) and
//! [eject_packet](NetDevice::eject_packet).

use std::rc::Rc;

use junction_track::entity::{Entity, GetEntity};
use junction_track::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::address::{GenericAddress, NetworkAddress};
use crate::arbiter::{ArbitrationPolicy, build_policy};
use crate::channel::Channel;
use crate::fabric_error;
use crate::queue::{FlowControlledQueue, QueueConfig};
use crate::receiver::Receiver;
use crate::router::DimensionOrderRouter;
use crate::topology::TopologyConfig;
use crate::traits::FabricObject;
use crate::transmitter::Transmitter;
use crate::types::{FabricError, FabricResult};

/// Default number of channels of a device, enough for a 3D torus
pub const DEFAULT_NUM_CHANNELS: usize = 6;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Number of channel ports, not counting the local port
    pub num_channels: usize,

    /// Sizing of every virtual output queue
    pub queue: QueueConfig,

    /// Policy each transmitter uses to choose between its queues
    pub arbitration: ArbitrationPolicy,

    /// Weight of channel inputs relative to the local input when using
    /// [ArbitrationPolicy::WeightedRoundRobin]
    pub transit_weight: usize,

    pub topology: TopologyConfig,
}

impl DeviceConfig {
    pub fn validate(&self) -> FabricResult {
        self.topology.validate()?;
        self.queue.validate()?;
        let required = self.topology.num_channels_required();
        if self.num_channels < required {
            return fabric_error!(format!(
                "{} channels is too few for the {} topology which needs {required}",
                self.num_channels, self.topology
            ));
        }
        if self.transit_weight == 0 {
            return fabric_error!("transit weight must be at least 1");
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            num_channels: DEFAULT_NUM_CHANNELS,
            queue: QueueConfig::default(),
            arbitration: ArbitrationPolicy::default(),
            transit_weight: 1,
            topology: TopologyConfig::default(),
        }
    }
}

pub struct NetDevice<T>
where
    T: FabricObject,
{
    pub entity: Rc<Entity>,
    address: NetworkAddress,
    config: DeviceConfig,
    queues: Vec<FlowControlledQueue<T>>,
    receivers: Vec<Receiver>,
    transmitters: Vec<Transmitter<T>>,
    router: DimensionOrderRouter,
}

impl<T> NetDevice<T>
where
    T: FabricObject,
{
    pub fn new(
        parent: &Rc<Entity>,
        name: &str,
        address: NetworkAddress,
        config: &DeviceConfig,
    ) -> Result<Self, FabricError> {
        config.validate()?;
        config.topology.validate_address(address)?;

        let entity = Rc::new(Entity::new(parent, name));
        let n = config.num_channels + 1;
        let local_port = n - 1;

        let mut queues = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                queues.push(FlowControlledQueue::new(
                    &entity,
                    &format!("queue_{i}_{j}"),
                    config.queue,
                )?);
            }
        }

        let receivers = (0..n)
            .map(|i| Receiver::new(&entity, i, (0..n).map(|j| i * n + j).collect()))
            .collect();

        let mut transmitters = Vec::with_capacity(n);
        for i in 0..n {
            let policy = build_policy(config.arbitration, n, config.transit_weight)?;
            transmitters.push(Transmitter::new(
                &entity,
                i,
                (0..n).map(|j| j * n + i).collect(),
                policy,
            ));
        }

        let router = DimensionOrderRouter::new(address, &config.topology, local_port)?;
        debug!(entity ; "{} with {} ports at {}", name, n, address);

        Ok(Self {
            entity,
            address,
            config: config.clone(),
            queues,
            receivers,
            transmitters,
            router,
        })
    }

    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.config.num_channels
    }

    #[must_use]
    pub fn num_ports(&self) -> usize {
        self.config.num_channels + 1
    }

    #[must_use]
    pub fn local_port(&self) -> usize {
        self.config.num_channels
    }

    #[must_use]
    pub fn address(&self) -> NetworkAddress {
        self.address
    }

    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    #[must_use]
    pub fn router(&self) -> &DimensionOrderRouter {
        &self.router
    }

    /// Move the device to a new address taken from a generic container.
    ///
    /// Packets already queued keep the output port they were routed to.
    pub fn set_address(&mut self, address: &GenericAddress) -> FabricResult {
        let address = NetworkAddress::try_from(address)?;
        self.config.topology.validate_address(address)?;
        self.router = DimensionOrderRouter::new(address, &self.config.topology, self.local_port())?;
        debug!(self.entity ; "address set to {}", address);
        self.address = address;
        Ok(())
    }

    /// Attach the outgoing channel of a channel port.
    pub fn connect_tx_channel(&mut self, port: usize, channel: Box<dyn Channel<T>>) -> FabricResult {
        if port >= self.num_channels() {
            return fabric_error!(format!(
                "{}: cannot connect a channel to port {port}, channel ports are [0, {})",
                self.entity,
                self.num_channels()
            ));
        }
        self.transmitters[port].connect(channel);
        Ok(())
    }

    #[must_use]
    pub fn is_tx_connected(&self, port: usize) -> bool {
        self.transmitters[self.check_port(port)].is_connected()
    }

    #[must_use]
    pub fn is_receiver_blocked(&self, port: usize) -> bool {
        self.receivers[self.check_port(port)].is_blocked()
    }

    /// Accept a packet arriving on a channel port.
    ///
    /// The packet is returned if the queue it routes to is full.
    ///
    /// # Panics
    ///
    /// If `port` is not a channel port.
    pub fn receive(&mut self, port: usize, value: T) -> Result<(), T> {
        assert!(
            port < self.num_channels(),
            "{}: receive on port {port} which is not a channel port",
            self.entity
        );
        self.receivers[port].receive(value, &self.router, &mut self.queues)
    }

    /// Offer a packet from the host through the local port.
    ///
    /// The packet is returned without being queued if the local receiver is
    /// blocked or the queue it routes to is full.
    pub fn inject_packet(&mut self, value: T) -> Result<(), T> {
        let local_port = self.local_port();
        let receiver = &mut self.receivers[local_port];
        if receiver.is_blocked() {
            debug!(self.entity ; "inject {} rejected, local port blocked", value);
            return Err(value);
        }
        receiver.receive(value, &self.router, &mut self.queues)
    }

    /// Hand the host the next packet that has reached this node, if any.
    pub fn eject_packet(&mut self) -> Option<T> {
        let local_port = self.local_port();
        let (input, value) = self.transmitters[local_port].dequeue_next(&mut self.queues)?;
        self.receivers[input].check_for_unblock(&self.queues);
        trace!(self.entity ; "eject {}", value);
        Some(value)
    }

    /// Give the transmitter of `port` one chance to send a packet.
    ///
    /// Returns whether a packet was sent. The local port never sends; use
    /// [eject_packet](NetDevice::eject_packet) instead.
    pub fn transmit(&mut self, port: usize) -> bool {
        let port = self.check_port(port);
        match self.transmitters[port].transmit(&mut self.queues) {
            Some(input) => {
                self.receivers[input].check_for_unblock(&self.queues);
                true
            }
            None => false,
        }
    }

    /// Give every channel transmitter one chance to send a packet.
    ///
    /// Returns the number of packets sent.
    pub fn transmit_all(&mut self) -> usize {
        (0..self.num_channels())
            .filter(|port| self.transmit(*port))
            .count()
    }

    /// Position of queue `(input, output)` in the flat queue matrix.
    #[must_use]
    pub fn queue_index(&self, input: usize, output: usize) -> usize {
        self.check_port(input) * self.num_ports() + self.check_port(output)
    }

    #[must_use]
    pub fn queue_fill_level(&self, input: usize, output: usize) -> usize {
        self.queues[self.queue_index(input, output)].fill_level()
    }

    #[must_use]
    pub fn is_queue_blocked(&self, input: usize, output: usize) -> bool {
        self.queues[self.queue_index(input, output)].is_blocked()
    }

    /// Queue indices written by the receiver of `port`
    #[must_use]
    pub fn receiver_row(&self, port: usize) -> &[usize] {
        self.receivers[self.check_port(port)].row()
    }

    /// Queue indices read by the transmitter of `port`
    #[must_use]
    pub fn transmitter_column(&self, port: usize) -> &[usize] {
        self.transmitters[self.check_port(port)].column()
    }

    /// Number of packets held across all queues
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queues.iter().map(FlowControlledQueue::len).sum()
    }

    fn check_port(&self, port: usize) -> usize {
        assert!(
            port < self.num_ports(),
            "{}: port {port} out of range [0, {})",
            self.entity,
            self.num_ports()
        );
        port
    }
}

impl<T> GetEntity for NetDevice<T>
where
    T: FabricObject,
{
    fn entity(&self) -> &Rc<Entity> {
        &self.entity
    }
}
