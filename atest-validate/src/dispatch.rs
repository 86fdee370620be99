// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, OutputWriter},
};
use atest_runner::{
    HarnessExitCode,
    config::{ConfigOverrides, HarnessConfig},
    driver::ScenarioRunner,
    marker::MarkerStore,
    reporter::RunReporter,
    scenario::{ScenarioContext, ScenarioRegistry},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser};
use swrite::{SWrite, swrite};
use tracing::debug;

/// Repeatedly runs master/slave audio link scenarios through `atest`.
///
/// Each scenario starts `atest` playback and capture processes on the two ends of the link in a
/// fixed order, and passes if every checked process exits successfully. Scenarios that pass every
/// repetition get a PASS marker and are skipped on later runs.
#[derive(Debug, Parser)]
#[command(version)]
pub struct AtestValidateApp {
    /// Number of repetitions per scenario
    #[arg(
        long,
        default_value_t = ScenarioRunner::DEFAULT_COUNT,
        value_parser = clap::value_parser!(u32).range(1..),
        value_name = "N"
    )]
    count: u32,

    /// List the scenarios and exit
    #[arg(short, long)]
    list: bool,

    /// Directory for PASS markers [default: the system temp directory]
    ///
    /// Stale `<scenario>.FAILED` markers are removed from here before a scenario runs, but
    /// failures are never recorded as markers: a failing run exits with a non-zero status instead.
    #[arg(long, value_name = "DIR")]
    pass_dir: Option<Utf8PathBuf>,

    /// Run scenarios even if they already have a PASS marker
    #[arg(short, long)]
    retest: bool,

    #[command(flatten)]
    config_opts: ConfigOpts,

    /// Scenarios to run [default: all]
    #[arg(value_name = "TESTS")]
    tests: Vec<String>,

    #[command(flatten)]
    output: OutputOpts,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Harness config file, layered over the built-in defaults
    #[arg(long, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// The atest executable [default: atest]
    #[arg(long, value_name = "PATH")]
    atest: Option<String>,

    /// Master device [default: hw:1,0]
    #[arg(long, value_name = "DEVICE")]
    master: Option<String>,

    /// Slave device [default: hw:0,0]
    #[arg(long, value_name = "DEVICE")]
    slave: Option<String>,
}

impl ConfigOpts {
    fn make_config(&self) -> Result<HarnessConfig> {
        let overrides = ConfigOverrides {
            program: self.atest.clone(),
            master: self.master.clone(),
            slave: self.slave.clone(),
        };
        Ok(HarnessConfig::from_sources(self.config.as_deref(), &overrides)?)
    }
}

impl AtestValidateApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let registry = ScenarioRegistry::builtin();

        if self.list {
            output_writer
                .write_stdout(&format_list(&registry))
                .map_err(ExpectedError::write_output)?;
            return Ok(HarnessExitCode::LISTED);
        }

        let config = self.config_opts.make_config()?;
        let pass_dir = match self.pass_dir {
            Some(pass_dir) => pass_dir,
            None => Utf8PathBuf::try_from(std::env::temp_dir())
                .map_err(ExpectedError::pass_dir_not_utf8)?,
        };
        debug!("using pass directory {pass_dir}");

        let cx = ScenarioContext::new(&config);
        let mut runner = ScenarioRunner::new(&registry, cx, MarkerStore::new(pass_dir));
        runner.set_count(self.count).set_retest(self.retest);
        if !self.tests.is_empty() {
            runner.set_filter(self.tests);
        }

        let mut reporter = RunReporter::new(output_writer.reporter_output());
        if output.color.should_colorize(supports_color::Stream::Stderr) {
            reporter.colorize();
        }

        let status = runner.run(&mut reporter)?;
        Ok(status.exit_code())
    }
}

fn format_list(registry: &ScenarioRegistry) -> String {
    let mut out = String::from("list of tests:\n");
    for name in registry.names() {
        swrite!(out, " - {name}\n");
    }
    out
}
