// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Build every node of the topology and step them until all flits arrive.

use std::path::Path;
use std::rc::Rc;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use junction_fabric::address::NetworkAddress;
use junction_fabric::device::{DeviceConfig, NetDevice};
use junction_fabric::fabric_error;
use junction_fabric::topology::TopologyConfig;
use junction_fabric::traits::Routable;
use junction_fabric::types::FabricError;
use junction_track::entity::Entity;
use junction_track::{debug, error, info, trace};
use serde::{Deserialize, Serialize};

use crate::flit_gen::{Flit, FlitGen};
use crate::link::{LinkRx, link};

/// Prefix of environment variables that override the configuration
pub const ENV_PREFIX: &str = "JUNCTION_";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration shared by every node
    pub device: DeviceConfig,

    /// Number of flits each link can hold in flight
    pub link_capacity: usize,

    /// Number of flits each node sends
    pub flits_per_node: usize,

    /// Seed for the random destinations
    pub seed: u64,

    /// Give up after this many steps, 0 runs until completion
    pub max_steps: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            link_capacity: 2,
            flits_per_node: 16,
            seed: 0,
            max_steps: 0,
        }
    }
}

impl Config {
    #[must_use]
    pub fn topology(&self) -> &TopologyConfig {
        &self.device.topology
    }
}

/// Layer the configuration: defaults, then the TOML file, then environment
/// variables starting with [ENV_PREFIX].
///
/// Nested fields are separated by `__` in environment variable names, for
/// example `JUNCTION_DEVICE__QUEUE__CAPACITY`.
pub fn load_config(conf_file: &Path) -> Result<Config, FabricError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(conf_file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    figment
        .extract()
        .or_else(|e| fabric_error!(format!("invalid configuration: {e}")))
}

pub struct Node {
    pub device: NetDevice<Flit>,
    rx_links: Vec<Option<LinkRx<Flit>>>,
    flit_gen: FlitGen,
    waiting: Option<Flit>,
}

impl Node {
    fn inject(&mut self) -> bool {
        let Some(flit) = self.waiting.take().or_else(|| self.flit_gen.next()) else {
            return false;
        };
        match self.device.inject_packet(flit) {
            Ok(()) => true,
            Err(flit) => {
                self.waiting = Some(flit);
                false
            }
        }
    }

    /// Move at most one flit from each incoming link into the device.
    fn receive(&mut self) -> usize {
        let mut moved = 0;
        for (port, rx) in self.rx_links.iter().enumerate() {
            let Some(rx) = rx else {
                continue;
            };
            if self.device.is_receiver_blocked(port) {
                continue;
            }
            if let Some(flit) = rx.pop() {
                match self.device.receive(port, flit) {
                    Ok(()) => moved += 1,
                    Err(flit) => rx.push_front(flit),
                }
            }
        }
        moved
    }

    fn in_flight(&self) -> usize {
        let on_links: usize = self.rx_links.iter().flatten().map(LinkRx::len).sum();
        self.device.pending() + on_links + usize::from(self.waiting.is_some())
    }
}

/// Counts gathered over a run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStats {
    pub steps: usize,
    pub injected: usize,
    pub delivered: usize,
    pub misrouted: usize,
    pub total_hops: usize,
    pub total_min_hops: usize,
}

pub struct Torus {
    pub entity: Rc<Entity>,
    pub nodes: Vec<Node>,
    topology: TopologyConfig,
    num_flits: usize,
}

/// Create one node per address and connect every channel that has a
/// neighbour with a link.
pub fn build_torus(parent: &Rc<Entity>, config: &Config) -> Result<Torus, FabricError> {
    if config.link_capacity == 0 {
        return fabric_error!("link capacity must be greater than 0");
    }

    let entity = Rc::new(Entity::new(parent, "torus"));
    let topology = config.topology().clone();
    topology.validate()?;

    let mut nodes = Vec::with_capacity(topology.num_nodes());
    for address in topology.addresses() {
        let name = format!("node_{}_{}_{}", address.x(), address.y(), address.z());
        let device = NetDevice::new(&entity, &name, address, &config.device)?;
        let flit_gen = FlitGen::new(
            &device.entity,
            address,
            &topology,
            config.flits_per_node,
            config.seed,
        );
        let rx_links = (0..device.num_channels()).map(|_| None).collect();
        nodes.push(Node {
            device,
            rx_links,
            flit_gen,
            waiting: None,
        });
    }

    for i in 0..nodes.len() {
        let address = nodes[i].device.address();
        for channel in 0..config.device.num_channels {
            let Some(neighbour) = topology.neighbour(address, channel) else {
                continue;
            };
            let (tx, rx) = link(config.link_capacity);
            nodes[i].device.connect_tx_channel(channel, Box::new(tx))?;

            // Leaving on the positive channel arrives on the negative one.
            let j = node_index(&topology, neighbour);
            nodes[j].rx_links[channel ^ 1] = Some(rx);
            trace!(entity ; "link {} ch{} -> {} ch{}", address, channel, neighbour, channel ^ 1);
        }
    }

    info!(entity ; "built {} topology of {} nodes", topology, nodes.len());
    Ok(Torus {
        entity,
        num_flits: nodes.len() * config.flits_per_node,
        nodes,
        topology,
    })
}

/// Position of `address` in [TopologyConfig::addresses] order
#[must_use]
pub fn node_index(topology: &TopologyConfig, address: NetworkAddress) -> usize {
    let [x, y, _] = topology.dimensions.map(|d| d.extent);
    usize::from(address.x()) + x * (usize::from(address.y()) + y * usize::from(address.z()))
}

impl Torus {
    #[must_use]
    pub fn num_flits(&self) -> usize {
        self.num_flits
    }

    #[must_use]
    pub fn topology(&self) -> &TopologyConfig {
        &self.topology
    }

    /// Flits created but not yet ejected
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.nodes.iter().map(Node::in_flight).sum()
    }

    /// Advance every node by one step. Returns whether anything moved.
    pub fn step(&mut self, stats: &mut RunStats) -> bool {
        let mut moved = 0;
        for node in &mut self.nodes {
            if node.inject() {
                stats.injected += 1;
                moved += 1;
            }
        }
        for node in &mut self.nodes {
            moved += node.receive();
        }
        for node in &mut self.nodes {
            moved += node.device.transmit_all();
        }
        for node in &mut self.nodes {
            while let Some(flit) = node.device.eject_packet() {
                moved += 1;
                let address = node.device.address();
                if flit.destination() != address {
                    error!(node.device.entity ; "{} ejected at {}", flit, address);
                    stats.misrouted += 1;
                }
                stats.delivered += 1;
                stats.total_hops += flit.hops();
                stats.total_min_hops += self.topology.min_hops(flit.source(), flit.destination());
                trace!(node.device.entity ; "{} delivered after {} hops", flit, flit.hops());
            }
        }
        stats.steps += 1;
        moved > 0
    }

    /// Step until every flit has been delivered.
    ///
    /// Fails if a step moves nothing while flits remain or if `max_steps`
    /// (when not 0) is reached first.
    pub fn run(&mut self, max_steps: usize) -> Result<RunStats, FabricError> {
        let mut stats = RunStats::default();
        while stats.delivered < self.num_flits {
            if max_steps != 0 && stats.steps >= max_steps {
                return fabric_error!(format!(
                    "{}/{} flits delivered after {} steps",
                    stats.delivered, self.num_flits, stats.steps
                ));
            }
            if !self.step(&mut stats) {
                error!(self.entity ; "deadlock with {} flits in flight", self.in_flight());
                return fabric_error!(format!("deadlock after {} steps", stats.steps));
            }
        }
        debug!(self.entity ; "{:?}", stats);
        Ok(stats)
    }
}
