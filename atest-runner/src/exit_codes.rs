// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `atest-validate`.
///
/// A scenario failing and `--list` share exit code 1, so scripts that only check for success keep
/// working. Harness-level problems get distinct codes.
pub enum HarnessExitCode {}

impl HarnessExitCode {
    /// Every selected scenario passed, or was skipped because it had already passed.
    pub const OK: i32 = 0;

    /// A scenario repetition failed.
    pub const SCENARIO_FAILED: i32 = 1;

    /// `--list` was requested.
    pub const LISTED: i32 = 1;

    /// The harness could not be set up, or a marker file could not be updated.
    pub const SETUP_ERROR: i32 = 96;

    /// `atest` could not be launched or controlled.
    pub const LAUNCH_FAILED: i32 = 97;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
