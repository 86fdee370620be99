// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::{FakeAtest, record_process_events};
use atest_runner::{
    driver::{RunStatus, ScenarioRunner},
    marker::{MarkerKind, MarkerStore},
    process::AtestExit,
    reporter::{ReporterStderr, RunReporter},
    scenario::{ScenarioContext, ScenarioOutcome, ScenarioRegistry},
};
use camino_tempfile::tempdir;
use pretty_assertions::assert_eq;
use test_case::test_case;

const MASTER_CAPTURE: &str = "hw:1,0 capture unbounded assert";
const SLAVE_CAPTURE: &str = "hw:0,0 capture unbounded assert";
const MASTER_PLAYBACK: &str = "hw:1,0 play unbounded";
const SLAVE_PLAYBACK: &str = "hw:0,0 play unbounded";

const MASTER_PLAYBACK_BURSTS: &[&str] = &[
    "start hw:0,0 capture",
    "start hw:1,0 capture",
    "start hw:1,0 playback",
    "start hw:1,0 playback",
    "start hw:1,0 playback",
    "start hw:1,0 playback",
    "interrupt hw:0,0 capture",
    "interrupt hw:1,0 capture",
];
const SLAVE_PLAYBACK_BURSTS: &[&str] = &[
    "start hw:0,0 capture",
    "start hw:1,0 capture",
    "start hw:0,0 playback",
    "start hw:0,0 playback",
    "start hw:0,0 playback",
    "start hw:0,0 playback",
    "interrupt hw:0,0 capture",
    "interrupt hw:1,0 capture",
];
const MASTER_CAPTURE_BURSTS: &[&str] = &[
    "start hw:0,0 playback",
    "start hw:1,0 playback",
    "start hw:1,0 capture",
    "start hw:1,0 capture",
    "start hw:1,0 capture",
    "start hw:1,0 capture",
    "interrupt hw:0,0 playback",
    "interrupt hw:1,0 playback",
];

const MASTER_CAPTURE_BURST_INVOCATIONS: &[&str] = &[
    SLAVE_PLAYBACK,
    "hw:1,0 capture 1 assert",
    "hw:1,0 capture 1 assert",
    "hw:1,0 capture 1 assert",
    "hw:1,0 capture 1 assert",
    MASTER_PLAYBACK,
];

// The listener always starts before the bounded process, and the long-lived roles start and stop
// slave first.
#[test_case(
    "slave-simple-playback",
    &["start hw:1,0 capture", "start hw:0,0 playback", "interrupt hw:1,0 capture"],
    &["hw:0,0 play 1", MASTER_CAPTURE],
    &["MASTER", "SLAVE"]

    ; "slave simple playback"
)]
#[test_case(
    "master-simple-playback",
    &["start hw:0,0 capture", "start hw:1,0 playback", "interrupt hw:0,0 capture"],
    &[SLAVE_CAPTURE, "hw:1,0 play 1"],
    &["MASTER", "SLAVE"]

    ; "master simple playback"
)]
#[test_case(
    "slave-simple-capture",
    &["start hw:1,0 playback", "start hw:0,0 capture", "interrupt hw:1,0 playback"],
    &["hw:0,0 capture 1", "hw:1,0 play unbounded assert"],
    &["MASTER", "SLAVE"]

    ; "slave simple capture"
)]
#[test_case(
    "master-simple-capture",
    &["start hw:0,0 playback", "start hw:1,0 capture", "interrupt hw:0,0 playback"],
    &["hw:0,0 play unbounded assert", "hw:1,0 capture 1"],
    &["MASTER", "SLAVE"]

    ; "master simple capture"
)]
#[test_case(
    "master-playback-after-capture",
    MASTER_PLAYBACK_BURSTS,
    &[
        SLAVE_CAPTURE,
        MASTER_CAPTURE,
        "hw:1,0 play 1",
        "hw:1,0 play 1",
        "hw:1,0 play 1",
        "hw:1,0 play 1",
    ],
    &["MASTER capture", "SLAVE capture"]

    ; "master playback bursts"
)]
#[test_case(
    "slave-playback-after-capture",
    SLAVE_PLAYBACK_BURSTS,
    &[
        SLAVE_CAPTURE,
        "hw:0,0 play 1",
        "hw:0,0 play 1",
        "hw:0,0 play 1",
        "hw:0,0 play 1",
        MASTER_CAPTURE,
    ],
    &["MASTER capture", "SLAVE capture"]

    ; "slave playback bursts"
)]
#[test_case(
    "master-capture-after-playback",
    MASTER_CAPTURE_BURSTS,
    MASTER_CAPTURE_BURST_INVOCATIONS,
    &["MASTER capture"]

    ; "master capture bursts"
)]
#[test_case(
    "slave-capture-after-playback",
    MASTER_CAPTURE_BURSTS,
    MASTER_CAPTURE_BURST_INVOCATIONS,
    &["MASTER capture"]

    ; "slave capture bursts use the master target"
)]
fn choreography(
    scenario: &str,
    expected_events: &[&str],
    expected_invocations: &[&str],
    expected_labels: &[&str],
) {
    let fake = FakeAtest::new().install();
    let registry = ScenarioRegistry::builtin();
    let scenario = registry.get(scenario).expect("scenario is registered");

    let (outcome, events) =
        record_process_events(|| scenario.run(&ScenarioContext::new(fake.config())));
    let outcome = outcome.expect("scenario completed");

    assert!(outcome.passed(), "{} passed: {outcome}", scenario.name());
    let labels: Vec<_> = outcome.checks().iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(labels, expected_labels);
    assert_eq!(events, expected_events);
    assert_eq!(fake.invocations(), expected_invocations);
}

#[test]
fn asserting_listener_failure_fails_simple_scenario() {
    let fake = FakeAtest::new().fail("hw:1,0", "capture", 3).install();
    let registry = ScenarioRegistry::builtin();

    let outcome = registry
        .get("slave-simple-playback")
        .unwrap()
        .run(&ScenarioContext::new(fake.config()))
        .unwrap();

    assert_eq!(
        outcome,
        ScenarioOutcome::new()
            .check("MASTER", AtestExit::Code(3))
            .check("SLAVE", AtestExit::Code(0))
    );
    assert!(!outcome.passed());
}

#[test]
fn playback_burst_failures_are_not_checked() {
    let fake = FakeAtest::new().fail("hw:1,0", "play", 1).install();
    let registry = ScenarioRegistry::builtin();

    let outcome = registry
        .get("master-playback-after-capture")
        .unwrap()
        .run(&ScenarioContext::new(fake.config()))
        .unwrap();

    // Only the two long-lived captures gate the verdict.
    assert!(outcome.passed(), "{outcome}");
}

#[test]
fn capture_bursts_stop_at_first_failure() {
    let fake = FakeAtest::new().fail("hw:1,0", "capture", 4).install();
    let registry = ScenarioRegistry::builtin();

    let (outcome, events) = record_process_events(|| {
        registry
            .get("master-capture-after-playback")
            .unwrap()
            .run(&ScenarioContext::new(fake.config()))
    });

    assert_eq!(
        outcome.unwrap(),
        ScenarioOutcome::new().check("MASTER capture", AtestExit::Code(4))
    );
    assert_eq!(
        events,
        [
            "start hw:0,0 playback",
            "start hw:1,0 playback",
            "start hw:1,0 capture",
            "interrupt hw:0,0 playback",
            "interrupt hw:1,0 playback",
        ],
    );
    assert_eq!(
        fake.invocations(),
        [SLAVE_PLAYBACK, "hw:1,0 capture 1 assert", MASTER_PLAYBACK],
    );
}

#[test]
fn full_run_writes_pass_markers() {
    let fake = FakeAtest::new().install();
    let registry = ScenarioRegistry::builtin();
    let pass_dir = tempdir().unwrap();
    let markers = MarkerStore::new(pass_dir.path());

    let mut runner = ScenarioRunner::new(
        &registry,
        ScenarioContext::new(fake.config()),
        markers.clone(),
    );
    runner.set_count(1);

    let mut buf = Vec::new();
    let status = runner
        .run(&mut RunReporter::new(ReporterStderr::Buffer(&mut buf)))
        .unwrap();

    assert_eq!(
        status,
        RunStatus::Completed {
            passed: registry.len(),
            skipped: 0,
        }
    );
    for name in registry.names() {
        assert!(markers.exists(name, MarkerKind::Pass), "{name} has a PASS marker");
    }
}
