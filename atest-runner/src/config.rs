// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Harness configuration.
//!
//! Configuration is layered: the embedded defaults come first, then an optional user file, then
//! overrides from the command line.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    process::Target,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};
use tracing::warn;

/// The full harness configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct HarnessConfig {
    atest: AtestConfig,
    devices: DeviceConfig,
    timing: TimingConfig,
}

impl HarnessConfig {
    /// The default configuration, embedded into the binary.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Loads the configuration from the embedded defaults, an optional config file and a set of
    /// overrides, in that order.
    ///
    /// Unknown keys are logged as warnings.
    pub fn from_sources(
        config_file: Option<&Utf8Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_warnings(config_file, overrides, &mut DefaultConfigWarnings)
    }

    /// Loads the configuration with custom handling of unknown keys.
    pub fn from_sources_with_warnings(
        config_file: Option<&Utf8Path>,
        overrides: &ConfigOverrides,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let make_error = |kind: ConfigParseErrorKind| {
            ConfigParseError::new(config_file.map(Utf8Path::to_owned), kind)
        };

        let mut builder = Config::builder()
            .add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml));
        if let Some(config_file) = config_file {
            builder = builder.add_source(File::new(config_file.as_str(), FileFormat::Toml));
        }
        let builder = overrides
            .apply(builder)
            .map_err(|error| make_error(ConfigParseErrorKind::BuildError(Box::new(error))))?;

        let config = builder
            .build()
            .map_err(|error| make_error(ConfigParseErrorKind::BuildError(Box::new(error))))?;

        let mut unknown = BTreeSet::new();
        let this: Self = serde_ignored::deserialize(config, |path: serde_ignored::Path| {
            unknown.insert(path.to_string());
        })
        .map_err(|error| make_error(ConfigParseErrorKind::DeserializeError(Box::new(error))))?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(config_file, &unknown);
        }

        this.validate().map_err(make_error)?;
        Ok(this)
    }

    /// Returns the default configuration.
    pub fn default_config() -> Result<Self, ConfigParseError> {
        Self::from_sources(None, &ConfigOverrides::default())
    }

    /// Returns how `atest` is invoked.
    pub fn atest(&self) -> &AtestConfig {
        &self.atest
    }

    /// Returns the master and slave devices.
    pub fn devices(&self) -> &DeviceConfig {
        &self.devices
    }

    /// Returns the choreography timing values.
    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    fn validate(&self) -> Result<(), ConfigParseErrorKind> {
        let invalid = |key: &'static str, reason: &'static str| -> Result<(), _> {
            Err(ConfigParseErrorKind::InvalidValue { key, reason })
        };

        if self.atest.program.is_empty() {
            return invalid("atest.program", "must not be empty");
        }
        if self.atest.rate == 0 {
            return invalid("atest.rate", "must be greater than zero");
        }
        if self.atest.channels == 0 {
            return invalid("atest.channels", "must be greater than zero");
        }
        if self.devices.master.is_empty() {
            return invalid("devices.master", "must not be empty");
        }
        if self.devices.slave.is_empty() {
            return invalid("devices.slave", "must not be empty");
        }
        if self.timing.bounded_duration == 0 {
            return invalid("timing.bounded-duration", "must be greater than zero");
        }
        if self.timing.burst_count == 0 {
            return invalid("timing.burst-count", "must be greater than zero");
        }
        Ok(())
    }
}

/// How `atest` is invoked.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct AtestConfig {
    pub(crate) program: String,
    pub(crate) rate: u32,
    pub(crate) channels: u32,
    #[serde(default)]
    pub(crate) priority: Option<String>,
    #[serde(default)]
    pub(crate) config_file: Option<Utf8PathBuf>,
}

impl AtestConfig {
    /// The name or path of the `atest` executable.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The sample rate every process is started with.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// The channel count every process is started with.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// The scheduling priority forwarded as `-P`, if any.
    pub fn priority(&self) -> Option<&str> {
        self.priority.as_deref()
    }

    /// The atest config file forwarded as `-C`, if any.
    pub fn config_file(&self) -> Option<&Utf8Path> {
        self.config_file.as_deref()
    }
}

/// The two audio endpoints under test.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceConfig {
    pub(crate) master: String,
    pub(crate) slave: String,
}

impl DeviceConfig {
    /// Returns the ALSA device name for a target.
    pub fn get(&self, target: Target) -> &str {
        match target {
            Target::Master => &self.master,
            Target::Slave => &self.slave,
        }
    }
}

/// Timing values for the scenario choreographies.
///
/// There is no handshake between the master and slave roles: scenarios rely on these intervals.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TimingConfig {
    pub(crate) bounded_duration: u32,
    pub(crate) burst_count: u32,
    #[serde(with = "humantime_serde")]
    pub(crate) burst_interval: Duration,
}

impl TimingConfig {
    /// Duration in seconds of short-lived processes.
    pub fn bounded_duration(&self) -> u32 {
        self.bounded_duration
    }

    /// Number of bursts in the sustained-stream scenarios.
    pub fn burst_count(&self) -> u32 {
        self.burst_count
    }

    /// Interval waited before each burst.
    pub fn burst_interval(&self) -> Duration {
        self.burst_interval
    }
}

/// Receives non-fatal problems found while loading the configuration.
pub trait ConfigWarnings {
    /// Called once with every unknown key, as a dotted path such as `devices.loopback`.
    fn unknown_config_keys(&mut self, config_file: Option<&Utf8Path>, unknown: &BTreeSet<String>);
}

/// Logs configuration warnings through `tracing`.
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(
        &mut self,
        config_file: Option<&Utf8Path>,
        unknown: &BTreeSet<String>,
    ) {
        let source = config_file.map_or_else(
            || "command-line overrides".to_owned(),
            |config_file| format!("`{config_file}`"),
        );
        for key in unknown {
            warn!("ignoring unknown configuration key `{key}` in {source}");
        }
    }
}

/// Values from the command line that take precedence over any config file.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Overrides `atest.program`.
    pub program: Option<String>,

    /// Overrides `devices.master`.
    pub master: Option<String>,

    /// Overrides `devices.slave`.
    pub slave: Option<String>,
}

impl ConfigOverrides {
    fn apply(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_override_option("atest.program", self.program.clone())?
            .set_override_option("devices.master", self.master.clone())?
            .set_override_option("devices.slave", self.slave.clone())
    }
}
