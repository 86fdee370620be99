// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scenarios and the registry that names them.
//!
//! A scenario is a fixed choreography of `atest` processes across the master and slave devices.
//! It produces a [`ScenarioOutcome`] listing the exit statuses it inspected; the scenario passes
//! iff every inspected status is a zero exit code.

use crate::{
    config::{HarnessConfig, TimingConfig},
    errors::{LaunchError, ScenarioError},
    process::{AtestExit, AtestInvocation, ProcessHandle, Role, Target},
};
use std::{collections::BTreeMap, fmt};
use tracing::debug;

/// What a scenario needs to start processes.
#[derive(Clone, Copy, Debug)]
pub struct ScenarioContext<'cfg> {
    config: &'cfg HarnessConfig,
}

impl<'cfg> ScenarioContext<'cfg> {
    /// Creates a new context.
    pub fn new(config: &'cfg HarnessConfig) -> Self {
        Self { config }
    }

    /// The choreography timing values.
    pub fn timing(&self) -> &'cfg TimingConfig {
        self.config.timing()
    }

    /// Prepares an `atest` process for `role` on the device behind `target`.
    pub fn atest(&self, target: Target, role: Role) -> AtestBuilder<'cfg> {
        AtestBuilder {
            config: self.config,
            invocation: AtestInvocation::new(self.config.devices().get(target), role),
        }
    }

    /// Sleeps for the configured burst interval.
    pub fn settle(&self) {
        let interval = self.timing().burst_interval();
        debug!("settling for {}", humantime::format_duration(interval));
        std::thread::sleep(interval);
    }
}

/// A process that is about to be started. Created by [`ScenarioContext::atest`].
#[derive(Clone, Debug)]
#[must_use]
pub struct AtestBuilder<'cfg> {
    config: &'cfg HarnessConfig,
    invocation: AtestInvocation,
}

impl AtestBuilder<'_> {
    /// Bounds the process to the configured bounded duration.
    pub fn bounded(mut self) -> Self {
        self.invocation = self
            .invocation
            .duration(self.config.timing().bounded_duration());
        self
    }

    /// Makes the process exit early on a stream anomaly.
    pub fn assert_on_failure(mut self) -> Self {
        self.invocation = self.invocation.assert_on_failure();
        self
    }

    /// Starts the process.
    pub fn start(self) -> Result<ProcessHandle, LaunchError> {
        ProcessHandle::start(self.config.atest(), self.invocation)
    }
}

/// The exit statuses a scenario inspected, in the order it reports them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[must_use]
pub struct ScenarioOutcome {
    checks: Vec<(String, Option<AtestExit>)>,
}

impl ScenarioOutcome {
    /// Creates an outcome with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an inspected exit status.
    ///
    /// `None` stands for a process that was expected but never ran, and fails the scenario.
    pub fn check(mut self, label: impl Into<String>, exit: impl Into<Option<AtestExit>>) -> Self {
        self.checks.push((label.into(), exit.into()));
        self
    }

    /// The recorded checks.
    pub fn checks(&self) -> &[(String, Option<AtestExit>)] {
        &self.checks
    }

    /// Returns true if at least one status was checked and every checked status is a zero exit
    /// code.
    pub fn passed(&self) -> bool {
        !self.checks.is_empty()
            && self
                .checks
                .iter()
                .all(|(_, exit)| exit.is_some_and(AtestExit::is_success))
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, exit)) in self.checks.iter().enumerate() {
            if i > 0 {
                write!(f, "  ")?;
            }
            match exit {
                Some(exit) => write!(f, "{label}: {exit}")?,
                None => write!(f, "{label}: not run")?,
            }
        }
        Ok(())
    }
}

type ScenarioFn =
    dyn Fn(&ScenarioContext<'_>) -> Result<ScenarioOutcome, ScenarioError> + Send + Sync;

/// A named scenario.
pub struct Scenario {
    name: String,
    description: &'static str,
    run: Box<ScenarioFn>,
}

impl Scenario {
    /// The scenario name, as used on the command line and in marker files.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A one-line description.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Runs one repetition of the scenario.
    pub fn run(&self, cx: &ScenarioContext<'_>) -> Result<ScenarioOutcome, ScenarioError> {
        (self.run)(cx)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// An ordered mapping from scenario name to scenario, iterated in lexicographic order.
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry containing the built-in master/slave scenarios.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::scenarios::register_builtin(&mut registry);
        registry
    }

    /// Adds a scenario, replacing any existing scenario with the same name.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        description: &'static str,
        run: F,
    ) -> &mut Self
    where
        F: Fn(&ScenarioContext<'_>) -> Result<ScenarioOutcome, ScenarioError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let scenario = Scenario {
            name: name.clone(),
            description,
            run: Box::new(run),
        };
        self.scenarios.insert(name, scenario);
        self
    }

    /// Looks up a scenario by name.
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.get(name)
    }

    /// Returns true if a scenario with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.scenarios.contains_key(name)
    }

    /// Iterates over scenario names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.scenarios.keys().map(String::as_str)
    }

    /// Iterates over scenarios in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> + '_ {
        self.scenarios.values()
    }

    /// The number of registered scenarios.
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Returns true if no scenarios are registered.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
