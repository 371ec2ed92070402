// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Library functions to build trackers as defined by the user.

use std::fs;
use std::io::{self, BufWriter};
use std::rc::Rc;

use crate::tracker::{EntityManager, TextTracker, TrackConfigError};
use crate::{Tracker, Writer};

/// Configuration options for a text tracker.
pub struct TrackerConfig<'a> {
    /// Enable this tracker. A disabled tracker suppresses everything.
    pub enable: bool,

    /// Set the level at which this tracker should be enabled.
    pub level: log::Level,

    /// A regular expression to match which entities should have this level
    /// applied. All other entities only emit errors.
    pub filter_regex: &'a str,

    /// The file to write to. Writes to stdout when `None` or `"-"`.
    pub file: Option<&'a str>,
}

impl Default for TrackerConfig<'_> {
    fn default() -> Self {
        Self {
            enable: true,
            level: log::Level::Warn,
            filter_regex: "",
            file: None,
        }
    }
}

fn build_writer(file: Option<&str>) -> Result<Writer, TrackConfigError> {
    match file {
        None | Some("-") => Ok(Box::new(BufWriter::new(io::stdout()))),
        Some(path) => match fs::File::create(path) {
            Ok(f) => Ok(Box::new(BufWriter::new(f))),
            Err(e) => Err(TrackConfigError(format!(
                "Failed to create log file {path}: {e}"
            ))),
        },
    }
}

/// Set up a text tracker according to the user configuration.
///
/// The user can pass a filter regular expression which will set the level only
/// for matching entities and set all other entities to only emit errors.
pub fn setup_tracker(config: &TrackerConfig) -> Result<Tracker, TrackConfigError> {
    if !config.enable {
        return Ok(crate::tracker::dev_null_tracker());
    }

    let default_level = if config.filter_regex.is_empty() {
        config.level
    } else {
        log::Level::Error
    };

    let mut entity_manager = EntityManager::new(default_level);
    if !config.filter_regex.is_empty() {
        entity_manager.add_entity_level_filter(config.filter_regex, config.level)?;
    }

    let writer = build_writer(config.file)?;
    Ok(Rc::new(TextTracker::new(entity_manager, writer)))
}
