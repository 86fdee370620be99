// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use atest_runner::reporter::ReporterStderr;
use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style};
use std::{
    fmt,
    io::{self, Write},
    sync::Once,
};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable that controls log filtering.
pub(crate) const LOG_ENV: &str = "ATEST_LOG";

/// Events logged to this target are printed without an `error:`-style heading.
pub(crate) const NO_HEADING_TARGET: &str = "atest_validate::no_heading";

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output: show process spawn and exit details
    #[arg(long, short, env = "ATEST_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        value_name = "WHEN",
        env = "ATEST_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        init_logger(self.color, self.verbose);
        OutputContext { color: self.color }
    }
}

#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) color: Color,
}

impl OutputContext {
    /// The style used to highlight names in error messages.
    pub fn stderr_highlight(&self) -> Style {
        if self.color.should_colorize(supports_color::Stream::Stderr) {
            Style::new().bold()
        } else {
            Style::new()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

impl Color {
    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

static INIT_LOGGER: Once = Once::new();

fn init_logger(color: Color, verbose: bool) {
    let styles = LogStyles::new(color.should_colorize(supports_color::Stream::Stderr));

    INIT_LOGGER.call_once(|| {
        let default_level = if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };

        // A filter that doesn't parse is reported once the subscriber is up.
        let filter = std::env::var(LOG_ENV).unwrap_or_default();
        let (targets, parse_error) = if filter.is_empty() {
            (Targets::new().with_default(default_level), None)
        } else {
            match filter.parse::<Targets>() {
                Ok(targets) => (targets, None),
                Err(error) => (Targets::new().with_default(default_level), Some(error)),
            }
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(SimpleFormatter { styles })
            .with_writer(io::stderr)
            .with_filter(targets);
        tracing_subscriber::registry().with(layer).init();

        if let Some(error) = parse_error {
            tracing::warn!("ignoring invalid {LOG_ENV} value `{filter}`: {error}");
        }
    });
}

/// Prints `<level>: <message>` and nothing else.
struct SimpleFormatter {
    styles: LogStyles,
}

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if metadata.target() != NO_HEADING_TARGET {
            let (heading, style) = self.styles.heading(*metadata.level());
            write!(writer, "{}: ", heading.style(style))?;
        }

        let mut message = MessageVisitor::default();
        event.record(&mut message);
        writeln!(writer, "{}", message.0)
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

#[derive(Debug, Default)]
struct LogStyles {
    error: Style,
    warning: Style,
    other: Style,
}

impl LogStyles {
    fn new(colorize: bool) -> Self {
        if colorize {
            Self {
                error: Style::new().red().bold(),
                warning: Style::new().yellow().bold(),
                other: Style::new().bold(),
            }
        } else {
            Self::default()
        }
    }

    fn heading(&self, level: Level) -> (&'static str, Style) {
        match level {
            Level::ERROR => ("error", self.error),
            Level::WARN => ("warning", self.warning),
            Level::INFO => ("info", self.other),
            Level::DEBUG => ("debug", self.other),
            Level::TRACE => ("trace", self.other),
        }
    }
}

/// Where command output goes. Tests capture it in memory.
#[derive(Default)]
pub enum OutputWriter {
    /// Write to the process's stdout and stderr.
    #[default]
    Terminal,

    /// Capture output in buffers.
    #[cfg(test)]
    Buffer {
        /// Captured stdout.
        stdout: Vec<u8>,

        /// Captured stderr.
        stderr: Vec<u8>,
    },
}

impl OutputWriter {
    #[cfg(test)]
    pub(crate) fn new_test() -> Self {
        Self::Buffer {
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn stdout(&self) -> Option<&str> {
        match self {
            Self::Terminal => None,
            Self::Buffer { stdout, .. } => std::str::from_utf8(stdout).ok(),
        }
    }

    #[cfg(test)]
    pub(crate) fn stderr(&self) -> Option<&str> {
        match self {
            Self::Terminal => None,
            Self::Buffer { stderr, .. } => std::str::from_utf8(stderr).ok(),
        }
    }

    pub(crate) fn write_stdout(&mut self, out: &str) -> io::Result<()> {
        match self {
            Self::Terminal => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(out.as_bytes())?;
                stdout.flush()
            }
            #[cfg(test)]
            Self::Buffer { stdout, .. } => stdout.write_all(out.as_bytes()),
        }
    }

    pub(crate) fn reporter_output(&mut self) -> ReporterStderr<'_> {
        match self {
            Self::Terminal => ReporterStderr::Terminal,
            #[cfg(test)]
            Self::Buffer { stderr, .. } => ReporterStderr::Buffer(stderr),
        }
    }
}
