// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A bounded FIFO with a blocked flag.
//!
//! The queue becomes _blocked_ when an enqueue fills it to capacity and only
//! becomes unblocked again once dequeues have drained it down to the
//! `resume_level`. With the default `resume_level` of `capacity - 1` the
//! queue unblocks as soon as a single slot is free.
//!
//! A full queue refuses new entries and hands them back to the caller.

use std::collections::VecDeque;
use std::rc::Rc;

use junction_track::entity::{Entity, GetEntity};
use junction_track::{enter, exit, trace};
use serde::{Deserialize, Serialize};

use crate::fabric_error;
use crate::traits::FabricObject;
use crate::types::{FabricError, FabricResult};

/// Default number of packets a queue can hold
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Sizing of a [FlowControlledQueue]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of packets held
    pub capacity: usize,

    /// Fill level at or below which a blocked queue unblocks, `capacity - 1`
    /// when not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_level: Option<usize>,
}

impl QueueConfig {
    pub fn new(capacity: usize) -> Result<Self, FabricError> {
        let config = Self {
            capacity,
            resume_level: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_resume_level(mut self, resume_level: usize) -> Result<Self, FabricError> {
        self.resume_level = Some(resume_level);
        self.validate()?;
        Ok(self)
    }

    #[must_use]
    pub fn resume_level(&self) -> usize {
        self.resume_level
            .unwrap_or_else(|| self.capacity.saturating_sub(1))
    }

    pub fn validate(&self) -> FabricResult {
        if self.capacity == 0 {
            return fabric_error!("queue capacity must be greater than 0");
        }
        if self.resume_level() >= self.capacity {
            return fabric_error!(format!(
                "queue resume level {} must be less than capacity {}",
                self.resume_level(),
                self.capacity
            ));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            resume_level: None,
        }
    }
}

pub struct FlowControlledQueue<T>
where
    T: FabricObject,
{
    pub entity: Rc<Entity>,
    config: QueueConfig,
    data: VecDeque<T>,
    blocked: bool,
}

impl<T> FlowControlledQueue<T>
where
    T: FabricObject,
{
    pub fn new(parent: &Rc<Entity>, name: &str, config: QueueConfig) -> Result<Self, FabricError> {
        config.validate()?;
        Ok(Self {
            entity: Rc::new(Entity::new(parent, name)),
            config,
            data: VecDeque::with_capacity(config.capacity),
            blocked: false,
        })
    }

    /// Append a packet to the tail of the queue.
    ///
    /// A full queue returns the packet unchanged.
    pub fn enqueue(&mut self, value: T) -> Result<(), T> {
        if self.data.len() >= self.config.capacity {
            trace!(self.entity ; "full, reject {}", value);
            return Err(value);
        }

        enter!(self.entity ; value.id());
        self.data.push_back(value);
        if self.data.len() == self.config.capacity && !self.blocked {
            trace!(self.entity ; "blocked");
            self.blocked = true;
        }
        Ok(())
    }

    /// Remove the packet at the head of the queue.
    pub fn dequeue(&mut self) -> Option<T> {
        let value = self.data.pop_front()?;
        exit!(self.entity ; value.id());
        if self.blocked && self.data.len() <= self.config.resume_level() {
            trace!(self.entity ; "unblocked");
            self.blocked = false;
        }
        Some(value)
    }

    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.data.front()
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    #[must_use]
    pub fn fill_level(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

impl<T> GetEntity for FlowControlledQueue<T>
where
    T: FabricObject,
{
    fn entity(&self) -> &Rc<Entity> {
        &self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_resumes_one_below_capacity() {
        let config = QueueConfig::default();
        assert_eq!(config.capacity, 4);
        assert_eq!(config.resume_level(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn resume_level_follows_capacity() {
        let config = QueueConfig {
            capacity: 2,
            ..QueueConfig::default()
        };
        assert_eq!(config.resume_level(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_configs() {
        assert!(QueueConfig::new(0).is_err());
        assert!(QueueConfig::new(2).unwrap().with_resume_level(2).is_err());
        assert!(QueueConfig::new(2).unwrap().with_resume_level(0).is_ok());
    }
}
