// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulate a torus of switching nodes.
//!
//! See `lib.rs` for details.

use std::path::PathBuf;

use clap::Parser;
use junction_fabric::arbiter::ArbitrationPolicy;
use junction_fabric::queue::QueueConfig;
use junction_fabric::topology::TieBreak;
use junction_fabric::types::FabricError;
use junction_track::builder::{TrackerConfig, setup_tracker};
use junction_track::entity::toplevel;
use junction_track::{error, info};
use sim_torus::torus_builder::{Config, build_torus, load_config};

/// Command-line arguments.
///
/// Any setting given here overrides the configuration file and environment.
#[derive(Parser)]
#[command(about = "Torus routing application")]
struct Cli {
    /// Enable logging to the console.
    #[arg(long, default_value = "false")]
    stdout: bool,

    /// Level of log message to display.
    #[arg(long, default_value = "Info")]
    stdout_level: log::Level,

    /// Set a regular expression for which entites should have logging level set
    /// to `--stdout-level`. Others will have level set to `Error`.
    #[arg(long, default_value = "")]
    stdout_filter_regex: String,

    /// Write the log to this file instead of the console.
    #[arg(long)]
    log_file: Option<String>,

    /// TOML configuration file.
    #[arg(long, default_value = "sim-torus.toml")]
    config: PathBuf,

    /// Number of nodes along x.
    #[arg(long)]
    x: Option<usize>,

    /// Number of nodes along y.
    #[arg(long)]
    y: Option<usize>,

    /// Number of nodes along z.
    #[arg(long)]
    z: Option<usize>,

    /// Connect the ends of every used dimension (torus) or not (mesh).
    #[arg(long)]
    wrap: Option<bool>,

    /// Direction to take when both ways round a ring are equally short.
    #[arg(long)]
    tie_break: Option<TieBreak>,

    /// Arbitration policy of every transmitter.
    #[arg(long)]
    arbitration: Option<ArbitrationPolicy>,

    /// Weight of transit traffic over local traffic for weighted round robin.
    #[arg(long)]
    transit_weight: Option<usize>,

    /// Number of flits each virtual output queue holds.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Number of flits each link holds.
    #[arg(long)]
    link_capacity: Option<usize>,

    /// Number of flits each node sends.
    #[arg(long)]
    flits_per_node: Option<usize>,

    /// Seed for the random destinations.
    #[arg(long)]
    seed: Option<u64>,

    /// Step on which to give up. Use 0 to run until completion.
    #[arg(long)]
    max_steps: Option<usize>,
}

impl Cli {
    fn merge(&self, mut config: Config) -> Result<Config, FabricError> {
        if self.x.is_some() || self.y.is_some() || self.z.is_some() || self.wrap.is_some() {
            config.device.topology = config
                .device
                .topology
                .resize([self.x, self.y, self.z], self.wrap)?;
        }
        if let Some(tie_break) = self.tie_break {
            config.device.topology.tie_break = tie_break;
        }
        if let Some(arbitration) = self.arbitration {
            config.device.arbitration = arbitration;
        }
        if let Some(transit_weight) = self.transit_weight {
            config.device.transit_weight = transit_weight;
        }
        if let Some(capacity) = self.queue_capacity {
            config.device.queue = QueueConfig::new(capacity)?;
        }
        if let Some(link_capacity) = self.link_capacity {
            config.link_capacity = link_capacity;
        }
        if let Some(flits_per_node) = self.flits_per_node {
            config.flits_per_node = flits_per_node;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(max_steps) = self.max_steps {
            config.max_steps = max_steps;
        }
        Ok(config)
    }
}

fn main() -> Result<(), FabricError> {
    let args = Cli::parse();

    let tracker_config = TrackerConfig {
        enable: args.stdout || args.log_file.is_some(),
        level: args.stdout_level,
        filter_regex: &args.stdout_filter_regex,
        file: args.log_file.as_deref(),
    };
    let tracker = setup_tracker(&tracker_config).map_err(|e| FabricError(e.to_string()))?;
    let top = toplevel(&tracker, "top");

    let config = args.merge(load_config(&args.config)?)?;
    info!(top ;
        "{} topology, {} flits per node, {:?} arbitration, queues of {}, links of {}",
        config.device.topology,
        config.flits_per_node,
        config.device.arbitration,
        config.device.queue.capacity,
        config.link_capacity
    );

    let mut torus = build_torus(&top, &config)?;
    let result = torus.run(config.max_steps);
    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            error!(top ; "{}", e);
            tracker.shutdown();
            return Err(e);
        }
    };

    info!(top ;
        "Pass: {} flits delivered in {} steps, {} hops ({} minimum)",
        stats.delivered,
        stats.steps,
        stats.total_hops,
        stats.total_min_hops
    );
    tracker.shutdown();
    Ok(())
}
