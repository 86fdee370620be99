// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests that run real child processes against a fake `atest`.
//!
//! The fake is a shell script, so these tests only run on Unix.

#![cfg(unix)]

mod fixtures;
mod process;
mod scenarios;
