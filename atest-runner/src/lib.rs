// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for `atest-validate`.
//!
//! The harness drives the external `atest` executable across two audio devices, a master and a
//! slave. [`process`] starts and stops individual `atest` processes, [`scenario`] and the
//! built-in choreographies combine them into named scenarios, and [`driver`] repeats scenarios
//! and records PASS markers.

pub mod config;
pub mod driver;
pub mod errors;
mod exit_codes;
pub mod marker;
pub mod process;
pub mod reporter;
pub mod scenario;
mod scenarios;

pub use exit_codes::HarnessExitCode;
