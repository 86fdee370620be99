// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The built-in master/slave scenarios.
//!
//! Each choreography encodes a start-order race seen on real links: whether the listening side is
//! up before the stream starts, and whether repeated start/stop of one stream disturbs a
//! long-running stream in the other direction.

use crate::{
    errors::ScenarioError,
    process::{AtestExit, Role, Target},
    scenario::{ScenarioContext, ScenarioOutcome, ScenarioRegistry},
};
use tracing::info;

pub(crate) fn register_builtin(registry: &mut ScenarioRegistry) {
    registry
        .register(
            "slave-simple-playback",
            "master starts capturing before the slave plays back",
            |cx| simple_race(cx, (Target::Master, Role::Capture), (Target::Slave, Role::Playback)),
        )
        .register(
            "master-simple-playback",
            "slave starts capturing before the master plays back",
            |cx| simple_race(cx, (Target::Slave, Role::Capture), (Target::Master, Role::Playback)),
        )
        .register(
            "slave-simple-capture",
            "master starts playing back before the slave captures",
            |cx| simple_race(cx, (Target::Master, Role::Playback), (Target::Slave, Role::Capture)),
        )
        .register(
            "master-simple-capture",
            "slave starts playing back before the master captures",
            |cx| simple_race(cx, (Target::Slave, Role::Playback), (Target::Master, Role::Capture)),
        )
        .register(
            "master-playback-after-capture",
            "master plays back repeatedly while both sides capture continuously",
            |cx| playback_bursts(cx, Target::Master),
        )
        .register(
            "slave-playback-after-capture",
            "slave plays back repeatedly while both sides capture continuously",
            |cx| playback_bursts(cx, Target::Slave),
        )
        .register(
            "master-capture-after-playback",
            "master captures repeatedly while both sides play back continuously",
            |cx| capture_bursts(cx, Target::Master),
        )
        .register(
            "slave-capture-after-playback",
            "captures repeatedly against the master target while both sides play back continuously",
            // The burst target is the master device here too.
            |cx| capture_bursts(cx, Target::Master),
        );
}

/// Starts an asserting, unbounded listener, then a second process bounded by the configured
/// duration. Once that one has exited, the listener is stopped. Both exit statuses are checked.
fn simple_race(
    cx: &ScenarioContext<'_>,
    (listener_target, listener_role): (Target, Role),
    (bounded_target, bounded_role): (Target, Role),
) -> Result<ScenarioOutcome, ScenarioError> {
    let mut listener = cx
        .atest(listener_target, listener_role)
        .assert_on_failure()
        .start()?;
    let mut bounded = cx.atest(bounded_target, bounded_role).bounded().start()?;

    let bounded_exit = bounded.wait()?;
    let listener_exit = listener.stop()?;

    let mut exits = [(listener_target, listener_exit), (bounded_target, bounded_exit)];
    exits.sort_by_key(|(target, _)| *target);
    Ok(exits
        .into_iter()
        .fold(ScenarioOutcome::new(), |outcome, (target, exit)| {
            outcome.check(target.label(), exit)
        }))
}

/// Both sides capture (asserting) for the whole scenario while `target` plays back in bursts.
/// Only the two captures are checked.
fn playback_bursts(
    cx: &ScenarioContext<'_>,
    target: Target,
) -> Result<ScenarioOutcome, ScenarioError> {
    let mut slave_capture = cx
        .atest(Target::Slave, Role::Capture)
        .assert_on_failure()
        .start()?;
    let mut master_capture = cx
        .atest(Target::Master, Role::Capture)
        .assert_on_failure()
        .start()?;

    let count = cx.timing().burst_count();
    for burst in 1..=count {
        cx.settle();
        info!("starting {target} playback burst {burst}/{count}");
        let exit = cx.atest(target, Role::Playback).bounded().start()?.wait()?;
        info!("{target} playback burst {burst}/{count} exited: {exit}");
    }

    let slave_exit = slave_capture.stop()?;
    let master_exit = master_capture.stop()?;

    Ok(ScenarioOutcome::new()
        .check("MASTER capture", master_exit)
        .check("SLAVE capture", slave_exit))
}

/// Both sides play back (not asserting) for the whole scenario while `target` captures in
/// asserting bursts. The bursts stop at the first failure; only the last burst is checked.
fn capture_bursts(
    cx: &ScenarioContext<'_>,
    target: Target,
) -> Result<ScenarioOutcome, ScenarioError> {
    let mut slave_playback = cx.atest(Target::Slave, Role::Playback).start()?;
    let mut master_playback = cx.atest(Target::Master, Role::Playback).start()?;

    let count = cx.timing().burst_count();
    let mut last_capture: Option<AtestExit> = None;
    for burst in 1..=count {
        cx.settle();
        info!("starting {target} capture burst {burst}/{count}");
        let exit = cx
            .atest(target, Role::Capture)
            .assert_on_failure()
            .bounded()
            .start()?
            .wait()?;
        info!(
            "{target} capture burst {burst}/{count} exited: {exit} ({})",
            if exit.is_success() { "OK" } else { "BAD" }
        );
        last_capture = Some(exit);
        if !exit.is_success() {
            break;
        }
    }

    // The playback exit statuses are not part of the verdict.
    slave_playback.stop()?;
    master_playback.stop()?;

    Ok(ScenarioOutcome::new().check(format!("{} capture", target.label()), last_capture))
}
