// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The run loop: repeats each selected scenario and records PASS markers.

use crate::{
    errors::RunError,
    exit_codes::HarnessExitCode,
    marker::{MarkerKind, MarkerStore},
    reporter::{RunEvent, RunReporter},
    scenario::{ScenarioContext, ScenarioRegistry},
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Runs scenarios from a registry.
#[derive(Debug)]
pub struct ScenarioRunner<'a> {
    registry: &'a ScenarioRegistry,
    cx: ScenarioContext<'a>,
    markers: MarkerStore,
    count: u32,
    retest: bool,
    filter: BTreeSet<String>,
}

impl<'a> ScenarioRunner<'a> {
    /// The default number of repetitions per scenario.
    pub const DEFAULT_COUNT: u32 = 10;

    /// Creates a runner over every scenario in `registry`.
    pub fn new(
        registry: &'a ScenarioRegistry,
        cx: ScenarioContext<'a>,
        markers: MarkerStore,
    ) -> Self {
        Self {
            registry,
            cx,
            markers,
            count: Self::DEFAULT_COUNT,
            retest: false,
            filter: BTreeSet::new(),
        }
    }

    /// Sets the number of repetitions per scenario.
    pub fn set_count(&mut self, count: u32) -> &mut Self {
        self.count = count;
        self
    }

    /// Runs scenarios even if they have a PASS marker.
    pub fn set_retest(&mut self, retest: bool) -> &mut Self {
        self.retest = retest;
        self
    }

    /// Restricts the run to the named scenarios. An empty filter selects everything.
    ///
    /// Names that aren't registered are ignored with a warning.
    pub fn set_filter(&mut self, names: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.filter = names.into_iter().map(Into::into).collect();
        for name in &self.filter {
            if !self.registry.contains(name) {
                warn!("unknown scenario `{name}` (use --list to see known scenarios)");
            }
        }
        self
    }

    /// Runs the selected scenarios in lexicographic order.
    ///
    /// The run stops at the first failing repetition anywhere, without running later repetitions
    /// or scenarios.
    pub fn run(&self, reporter: &mut RunReporter<'_>) -> Result<RunStatus, RunError> {
        let mut passed = 0;
        let mut skipped = 0;

        for scenario in self.registry.iter() {
            let name = scenario.name();
            if !self.filter.is_empty() && !self.filter.contains(name) {
                continue;
            }

            if !self.retest && self.markers.exists(name, MarkerKind::Pass) {
                let marker = self.markers.path(name, MarkerKind::Pass);
                report(
                    reporter,
                    RunEvent::ScenarioSkipped {
                        scenario: name,
                        marker: &marker,
                    },
                )?;
                skipped += 1;
                continue;
            }

            self.markers.clear(name)?;

            for repetition in 1..=self.count {
                report(
                    reporter,
                    RunEvent::RepetitionStarted {
                        scenario: name,
                        repetition,
                        count: self.count,
                    },
                )?;

                let outcome = scenario.run(&self.cx).map_err(|err| RunError::Scenario {
                    scenario: name.to_owned(),
                    repetition,
                    err,
                })?;
                report(
                    reporter,
                    RunEvent::RepetitionFinished {
                        scenario: name,
                        outcome: &outcome,
                    },
                )?;

                if !outcome.passed() {
                    // No FAILED marker is written: the non-zero exit code is the record.
                    report(reporter, RunEvent::ScenarioFailed { scenario: name })?;
                    return Ok(RunStatus::Failed {
                        scenario: name.to_owned(),
                        repetition,
                    });
                }
            }

            let marker = self.markers.write(name, MarkerKind::Pass)?;
            debug!("wrote PASS marker for `{name}` at {marker}");
            report(
                reporter,
                RunEvent::ScenarioPassed {
                    scenario: name,
                    marker: &marker,
                },
            )?;
            passed += 1;
        }

        report(reporter, RunEvent::RunFinished { passed, skipped })?;
        Ok(RunStatus::Completed { passed, skipped })
    }
}

fn report(reporter: &mut RunReporter<'_>, event: RunEvent<'_>) -> Result<(), RunError> {
    reporter.report(event).map_err(RunError::WriteEvent)
}

/// How a run ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunStatus {
    /// Every selected scenario passed or was skipped.
    Completed {
        /// Scenarios that ran every repetition successfully.
        passed: usize,

        /// Scenarios skipped because of an existing PASS marker.
        skipped: usize,
    },

    /// A repetition failed.
    Failed {
        /// The failing scenario.
        scenario: String,

        /// The 1-based repetition that failed.
        repetition: u32,
    },
}

impl RunStatus {
    /// The process exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => HarnessExitCode::OK,
            Self::Failed { .. } => HarnessExitCode::SCENARIO_FAILED,
        }
    }
}
