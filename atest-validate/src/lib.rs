// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repeated master/slave validation runs for an audio link, driving the `atest` tool.
//!
//! The scenarios, process control and marker handling live in [`atest_runner`]; this crate is the
//! command-line front end.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::ExpectedError;
#[doc(hidden)]
pub use output::OutputWriter;
