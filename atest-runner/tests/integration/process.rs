// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::FakeAtest;
use atest_runner::process::{AtestExit, AtestInvocation, ProcessHandle, Role};
use pretty_assertions::assert_eq;
use std::{thread, time::Duration};

#[test]
fn wait_is_idempotent() {
    let fake = FakeAtest::new().install();
    let invocation = AtestInvocation::new("hw:0,0", Role::Playback).duration(1);

    let mut handle = ProcessHandle::start(fake.config().atest(), invocation.clone()).unwrap();
    assert_eq!(handle.invocation(), &invocation);
    assert!(handle.is_running());
    assert_eq!(handle.exit(), None);

    assert_eq!(handle.wait().unwrap(), AtestExit::Code(0));
    assert!(!handle.is_running());
    assert_eq!(handle.wait().unwrap(), AtestExit::Code(0));
    assert_eq!(handle.exit(), Some(AtestExit::Code(0)));

    assert_eq!(fake.invocations(), ["hw:0,0 play 1"]);
}

#[test]
fn stop_interrupts_and_is_idempotent() {
    let fake = FakeAtest::new().fail("hw:1,0", "capture", 5).install();

    let mut handle = ProcessHandle::start(
        fake.config().atest(),
        AtestInvocation::new("hw:1,0", Role::Capture).assert_on_failure(),
    )
    .unwrap();
    // Give the script time to install its SIGINT trap.
    thread::sleep(Duration::from_millis(300));

    assert_eq!(handle.stop().unwrap(), AtestExit::Code(5));
    // The process has been reaped; sending another interrupt would fail.
    assert_eq!(handle.stop().unwrap(), AtestExit::Code(5));
    assert_eq!(handle.wait().unwrap(), AtestExit::Code(5));

    assert_eq!(fake.invocations(), ["hw:1,0 capture unbounded assert"]);
}

#[test]
fn stop_after_natural_exit_returns_cached_code() {
    let fake = FakeAtest::new().fail("hw:0,0", "play", 2).install();

    let mut handle = ProcessHandle::start(
        fake.config().atest(),
        AtestInvocation::new("hw:0,0", Role::Playback).duration(1),
    )
    .unwrap();
    assert_eq!(handle.wait().unwrap(), AtestExit::Code(2));
    assert_eq!(handle.stop().unwrap(), AtestExit::Code(2));
}

#[test]
fn drop_stops_running_process() {
    let fake = FakeAtest::new().install();

    let handle = ProcessHandle::start(
        fake.config().atest(),
        AtestInvocation::new("hw:1,0", Role::Playback),
    )
    .unwrap();
    let pid = handle.pid() as libc::pid_t;
    thread::sleep(Duration::from_millis(300));
    drop(handle);

    // The child was interrupted and reaped, so the pid no longer refers to it.
    let ret = unsafe { libc::kill(pid, 0) };
    assert_eq!(ret, -1, "process {pid} should be gone");
}
