// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the harness.
//!
//! A non-zero exit code from `atest` is *not* an error: it is an expected outcome that gets folded
//! into a [`ScenarioOutcome`](crate::scenario::ScenarioOutcome). The types here cover the cases
//! where the harness itself could not do what it was asked to do.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{fmt, io};
use thiserror::Error;

/// An error that occurred while loading the harness configuration.
#[derive(Debug, Error)]
#[error(
    "failed to load harness config{}",
    .config_file.as_ref().map_or(String::new(), |f| format!(" at `{f}`"))
)]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self { config_file, kind }
    }

    /// Returns the config file that failed to load, if one was provided.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while loading the configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the layered config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<ConfigError>),

    /// A value was out of range.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// The dotted key, e.g. `timing.burst-count`.
        key: &'static str,

        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// The `atest` executable could not be launched.
///
/// This is distinct from `atest` starting and then exiting with a non-zero code.
#[derive(Debug, Error)]
#[error("failed to launch `{program}` (arguments: {})", .args.join(" "))]
pub struct LaunchError {
    program: String,
    args: Vec<String>,
    #[source]
    error: io::Error,
}

impl LaunchError {
    pub(crate) fn new(program: impl Into<String>, args: Vec<String>, error: io::Error) -> Self {
        Self {
            program: program.into(),
            args,
            error,
        }
    }

    /// Returns the program that failed to launch.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        &self.error
    }
}

/// An interrupt request could not be delivered to a running `atest` process.
#[derive(Debug, Error)]
#[error("failed to interrupt atest process {pid}")]
pub struct InterruptError {
    pid: u32,
    #[source]
    error: io::Error,
}

impl InterruptError {
    pub(crate) fn new(pid: u32, error: io::Error) -> Self {
        Self { pid, error }
    }
}

/// Waiting for a running `atest` process failed.
#[derive(Debug, Error)]
#[error("failed to wait for atest process {pid}")]
pub struct WaitError {
    pid: u32,
    #[source]
    error: io::Error,
}

impl WaitError {
    pub(crate) fn new(pid: u32, error: io::Error) -> Self {
        Self { pid, error }
    }
}

/// An error returned by [`ProcessHandle::stop`](crate::process::ProcessHandle::stop).
#[derive(Debug, Error)]
pub enum StopError {
    /// The interrupt could not be sent.
    #[error(transparent)]
    Interrupt(#[from] InterruptError),

    /// The interrupt was sent but waiting for the exit failed.
    #[error(transparent)]
    Wait(#[from] WaitError),
}

/// An error that aborted a scenario before it could produce an outcome.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A process could not be launched.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// A process could not be stopped.
    #[error(transparent)]
    Stop(#[from] StopError),

    /// Waiting for a process failed.
    #[error(transparent)]
    Wait(#[from] WaitError),
}

/// The operation that failed on a marker file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarkerOperation {
    /// Creating the marker.
    Create,

    /// Removing a stale marker.
    Remove,
}

impl fmt::Display for MarkerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// An error that occurred while creating or removing a marker file.
#[derive(Debug, Error)]
#[error("failed to {operation} marker file `{path}`")]
pub struct MarkerError {
    operation: MarkerOperation,
    path: Utf8PathBuf,
    #[source]
    error: io::Error,
}

impl MarkerError {
    pub(crate) fn new(operation: MarkerOperation, path: Utf8PathBuf, error: io::Error) -> Self {
        Self {
            operation,
            path,
            error,
        }
    }

    /// Returns the path of the marker file.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

/// An error that aborted a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// A scenario could not complete.
    #[error("scenario `{scenario}` could not complete (repetition {repetition})")]
    Scenario {
        /// The scenario name.
        scenario: String,

        /// The 1-based repetition that was running.
        repetition: u32,

        /// The underlying error.
        #[source]
        err: ScenarioError,
    },

    /// A marker file could not be updated.
    #[error(transparent)]
    Marker(#[from] MarkerError),

    /// A status line could not be written.
    #[error("failed to write run status")]
    WriteEvent(#[source] io::Error),
}

