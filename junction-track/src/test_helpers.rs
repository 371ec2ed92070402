// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! This module provides helper functions for testing tracking output
//!
//! The aim of this module is to provide commonly-used functions that enable
//! the testing of the output that should appear from the tracking macros.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::rc::Rc;

use regex::Regex;

use crate::tracker::{EntityManager, TextTracker};
use crate::{Id, Track, Tracker, Writer};

/// A tracker that keeps all track events in memory.
pub struct TestTracker {
    events: RefCell<Vec<String>>,
    unique_id: Cell<u64>,
}

impl TestTracker {
    /// Create a new [`Tracker`] for the tests.
    ///
    /// This keeps the track events in memory for checking later.
    #[must_use]
    pub fn new(initial_id: u64) -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            unique_id: Cell::new(initial_id),
        }
    }

    fn add_event(&self, event: String) {
        println!("{event}");
        self.events.borrow_mut().push(event);
    }

    /// Return a copy of the events seen so far.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl Track for TestTracker {
    fn unique_id(&self) -> Id {
        let id = self.unique_id.get();
        self.unique_id.set(id + 1);
        Id(id)
    }

    fn is_entity_enabled(&self, _id: Id, _level: log::Level) -> bool {
        true
    }

    fn add_entity(&self, _id: Id, _entity_name: &str) {}

    fn enter(&self, id: Id, item: Id) {
        self.add_event(format!("{id}: {item} entered"));
    }

    fn exit(&self, id: Id, item: Id) {
        self.add_event(format!("{id}: {item} exited"));
    }

    fn create(&self, created_by: Id, id: Id, name: &str) {
        self.add_event(format!("{created_by}: created {id}, {name}"));
    }

    fn destroy(&self, destroyed_by: Id, id: Id) {
        self.add_event(format!("{destroyed_by}: destroyed {id}"));
    }

    fn log(&self, id: Id, level: log::Level, msg: std::fmt::Arguments) {
        self.add_event(format!("{id}:{level}: {msg}"));
    }

    fn shutdown(&self) {}
}

/// Create a [`TestTracker`] and the same tracker as a [`Tracker`].
///
/// # Examples
///
/// ```
/// use junction_track::test_helpers;
///
/// let (test_tracker, tracker) = junction_track::test_init!(10);
/// let _top = junction_track::entity::toplevel(&tracker, "top");
/// test_helpers::check_and_clear(&test_tracker, &["0: created 10, top"]);
/// ```
#[macro_export]
macro_rules! test_init {
    ($start_id:expr) => {{
        let test_tracker = std::rc::Rc::new($crate::test_helpers::TestTracker::new($start_id));
        let tracker: $crate::Tracker = test_tracker.clone();
        (test_tracker, tracker)
    }};
}

/// Check and clear the recorded events.
///
/// Asserts that the events seen since the start (or the last call) match the
/// `expected` regular expressions one-to-one, then clears them.
pub fn check_and_clear(tracker: &TestTracker, expected: &[&str]) {
    let mut events = tracker.events.borrow_mut();

    println!("Checking {:?} matches {:?}", expected, *events);
    assert_eq!(expected.len(), events.len());

    for (i, (log_expect, actual)) in expected.iter().zip(events.iter()).enumerate() {
        let re = Regex::new(log_expect).unwrap();
        println!("Checking {i}: {log_expect:?} matches {actual:?}");
        assert!(re.is_match(actual), "{actual:?} does not match {log_expect:?}");
    }

    events.clear();
}

/// Create a text tracker that writes everything to `traces/<test-file>.log`.
///
/// Pass `file!()` as `full_filepath`.
#[must_use]
pub fn create_tracker(full_filepath: &str) -> Tracker {
    // Place all trace files in one folder
    const FOLDER: &str = "traces";

    fs::create_dir_all(FOLDER).unwrap();

    let filename_only = Path::new(full_filepath)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap();

    let writer: Writer = Box::new(BufWriter::new(
        fs::File::create(format!("{FOLDER}/{filename_only}.log")).unwrap(),
    ));

    let entity_manager = EntityManager::new(log::Level::Trace);
    let tracker: Tracker = Rc::new(TextTracker::new(entity_manager, writer));
    tracker
}
