// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status lines printed while scenarios run.

use crate::scenario::ScenarioOutcome;
use camino::Utf8Path;
use owo_colors::{OwoColorize, Style};
use std::io::{self, Write};
use swrite::{SWrite, swrite};

/// Where the reporter writes to.
pub enum ReporterStderr<'a> {
    /// Produce output on the (possibly piped) terminal.
    Terminal,

    /// Write output to a buffer.
    Buffer(&'a mut Vec<u8>),
}

/// A run event the reporter displays.
#[derive(Clone, Copy, Debug)]
pub enum RunEvent<'a> {
    /// A scenario was skipped because its PASS marker exists.
    ScenarioSkipped {
        /// The scenario name.
        scenario: &'a str,

        /// The existing PASS marker.
        marker: &'a Utf8Path,
    },

    /// A repetition is about to run.
    RepetitionStarted {
        /// The scenario name.
        scenario: &'a str,

        /// The 1-based repetition.
        repetition: u32,

        /// The total number of repetitions.
        count: u32,
    },

    /// A repetition produced an outcome.
    RepetitionFinished {
        /// The scenario name.
        scenario: &'a str,

        /// What the repetition checked.
        outcome: &'a ScenarioOutcome,
    },

    /// A repetition failed; the run ends here.
    ScenarioFailed {
        /// The scenario name.
        scenario: &'a str,
    },

    /// Every repetition passed and the PASS marker was written.
    ScenarioPassed {
        /// The scenario name.
        scenario: &'a str,

        /// The new PASS marker.
        marker: &'a Utf8Path,
    },

    /// Every selected scenario passed or was skipped.
    RunFinished {
        /// The number of scenarios that ran and passed.
        passed: usize,

        /// The number of scenarios skipped because they had already passed.
        skipped: usize,
    },
}

/// Writes [`RunEvent`]s as status lines.
pub struct RunReporter<'a> {
    stderr: ReporterStderr<'a>,
    styles: Box<Styles>,
}

impl<'a> RunReporter<'a> {
    const SEPARATOR_WIDTH: usize = 79;

    /// Creates a reporter without colors.
    pub fn new(stderr: ReporterStderr<'a>) -> Self {
        Self {
            stderr,
            styles: Box::default(),
        }
    }

    /// Enables colored output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Displays an event.
    pub fn report(&mut self, event: RunEvent<'_>) -> io::Result<()> {
        let out = self.format(event);
        match &mut self.stderr {
            ReporterStderr::Terminal => {
                let mut stderr = io::stderr().lock();
                stderr.write_all(out.as_bytes())?;
                stderr.flush()
            }
            ReporterStderr::Buffer(buf) => buf.write_all(out.as_bytes()),
        }
    }

    fn format(&self, event: RunEvent<'_>) -> String {
        let styles = &self.styles;
        let mut out = String::new();
        match event {
            RunEvent::ScenarioSkipped { scenario, marker } => {
                swrite!(
                    out,
                    "[test '{}' {} ({marker})]\n",
                    scenario.style(styles.scenario),
                    "already PASS".style(styles.skip),
                );
            }
            RunEvent::RepetitionStarted {
                scenario,
                repetition,
                count,
            } => {
                swrite!(out, "{}\n", "-".repeat(Self::SEPARATOR_WIDTH).style(styles.separator));
                swrite!(
                    out,
                    "[run test '{}' {}/{}]\n",
                    scenario.style(styles.scenario),
                    repetition.style(styles.count),
                    count.style(styles.count),
                );
            }
            RunEvent::RepetitionFinished { outcome, .. } => {
                let style = if outcome.passed() {
                    styles.pass
                } else {
                    styles.fail
                };
                swrite!(out, "{}\n", outcome.style(style));
            }
            RunEvent::ScenarioFailed { scenario } => {
                swrite!(
                    out,
                    "[test '{}' {}]\n",
                    scenario.style(styles.scenario),
                    "FAILED".style(styles.fail),
                );
            }
            RunEvent::ScenarioPassed { scenario, marker } => {
                swrite!(
                    out,
                    "[test '{}' {} ({marker})]\n",
                    scenario.style(styles.scenario),
                    "PASS".style(styles.pass),
                );
            }
            RunEvent::RunFinished { passed, skipped } => {
                swrite!(out, "[{} passed", passed.style(styles.count));
                if skipped > 0 {
                    swrite!(out, ", {} already passed", skipped.style(styles.count));
                }
                out.push_str("]\n");
            }
        }
        out
    }
}

#[derive(Debug, Default)]
struct Styles {
    scenario: Style,
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    separator: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.scenario = Style::new().bold();
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.separator = Style::new().dimmed();
    }
}
