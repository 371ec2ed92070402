// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use junction_track::builder::{TrackerConfig, setup_tracker};
use junction_track::entity::{Entity, toplevel};
use junction_track::test_helpers::check_and_clear;
use junction_track::{Id, Track, debug, enter, exit, info, test_init, trace};

#[test]
fn entity_names() {
    let (test_tracker, tracker) = test_init!(10);
    let top = toplevel(&tracker, "top");
    let dev = std::rc::Rc::new(Entity::new(&top, "dev"));
    let queue = Entity::new(&dev, "queue_0_6");

    assert_eq!(queue.full_name(), "top::dev::queue_0_6");
    assert_eq!(format!("{queue}"), "top::dev::queue_0_6");
    check_and_clear(
        &test_tracker,
        &[
            "0: created 10, top",
            "10: created 11, top::dev",
            "11: created 12, top::dev::queue_0_6",
        ],
    );
}

#[test]
fn log_and_trace_events() {
    let (test_tracker, tracker) = test_init!(1);
    let top = toplevel(&tracker, "top");
    check_and_clear(&test_tracker, &["created 1, top"]);

    trace!(top ; "route {} to {}", 3, 6);
    debug!(top ; "blocked");
    info!(top ; "done");
    enter!(top ; Id(42));
    exit!(top ; Id(42));

    check_and_clear(
        &test_tracker,
        &[
            "1:TRACE: route 3 to 6",
            "1:DEBUG: blocked",
            "1:INFO: done",
            "1: 42 entered",
            "1: 42 exited",
        ],
    );
}

#[test]
fn entity_destroyed_on_drop() {
    let (test_tracker, tracker) = test_init!(5);
    let top = toplevel(&tracker, "top");
    {
        let _child = Entity::new(&top, "child");
    }
    check_and_clear(
        &test_tracker,
        &["0: created 5, top", "5: created 6, top::child", "5: destroyed 6"],
    );
}

#[test]
fn disabled_tracker_is_silent() {
    let config = TrackerConfig {
        enable: false,
        ..Default::default()
    };
    let tracker = setup_tracker(&config).unwrap();
    let top = toplevel(&tracker, "top");
    assert!(!tracker.is_entity_enabled(top.id, log::Level::Error));
}

#[test]
fn invalid_filter_regex() {
    let config = TrackerConfig {
        filter_regex: "[",
        ..Default::default()
    };
    assert!(setup_tracker(&config).is_err());
}
