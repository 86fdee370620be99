// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, OutputContext};
use atest_runner::{
    HarnessExitCode,
    errors::{ConfigParseError, RunError},
};
use camino::FromPathBufError;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("pass directory is not valid UTF-8")]
    PassDirNotUtf8 {
        #[source]
        err: FromPathBufError,
    },
    #[error("run error")]
    RunError {
        #[from]
        err: RunError,
    },
    #[error("error writing output")]
    WriteOutput {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn pass_dir_not_utf8(err: FromPathBufError) -> Self {
        Self::PassDirNotUtf8 { err }
    }

    pub(crate) fn write_output(err: std::io::Error) -> Self {
        Self::WriteOutput { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. } | Self::PassDirNotUtf8 { .. } => {
                HarnessExitCode::SETUP_ERROR
            }
            Self::RunError { err } => match err {
                RunError::Scenario { .. } => HarnessExitCode::LAUNCH_FAILED,
                RunError::Marker(_) => HarnessExitCode::SETUP_ERROR,
                RunError::WriteEvent(_) => HarnessExitCode::WRITE_OUTPUT_ERROR,
            },
            Self::WriteOutput { .. } => HarnessExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, output: OutputContext) {
        let highlight = output.stderr_highlight();
        let mut next_error = match self {
            Self::ConfigParseError { err } => {
                tracing::error!("{err}");
                Some(err.kind() as &dyn Error)
            }
            Self::PassDirNotUtf8 { err } => {
                tracing::error!(
                    "pass directory `{}` is not valid UTF-8",
                    err.as_path().display().style(highlight)
                );
                None
            }
            Self::RunError { err } => match err {
                RunError::Scenario {
                    scenario,
                    repetition,
                    err,
                } => {
                    tracing::error!(
                        "scenario `{}` aborted during repetition {repetition}",
                        scenario.style(highlight)
                    );
                    Some(err as &dyn Error)
                }
                RunError::Marker(err) => {
                    tracing::error!("failed to update markers");
                    Some(err as &dyn Error)
                }
                RunError::WriteEvent(err) => {
                    tracing::error!("failed to write run status");
                    Some(err as &dyn Error)
                }
            },
            Self::WriteOutput { err } => {
                tracing::error!("failed to write output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
