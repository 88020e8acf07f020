// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{Args, ValueEnum};
use example_status::{COLOR_ENV, LOG_ENV};
use owo_colors::{OwoColorize, Style, style};
use std::{
    fmt,
    io::{self, Write},
    sync::Once,
};
use supports_color::Stream;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Events with this target are printed without a level heading.
pub(crate) const NO_HEADING_TARGET: &str = "example_status_cli::no_heading";

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = COLOR_ENV
    )]
    color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        init_logging(self.color, self.verbose);
        OutputContext {
            verbose: self.verbose,
            color: self.color,
        }
    }
}

/// Output settings resolved from the command line.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) verbose: bool,
    color: Color,
}

impl OutputContext {
    /// An uncolored, non-verbose context. Logging is left uninitialized.
    pub fn plain() -> Self {
        Self {
            verbose: false,
            color: Color::Never,
        }
    }

    /// Styles for error messages written to stderr.
    pub fn stderr_styles(&self) -> StderrStyles {
        let bold = if self.color.should_colorize(Stream::Stderr) {
            style().bold()
        } else {
            Style::new()
        };
        StderrStyles { bold }
    }
}

/// When to produce color output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub enum Color {
    /// Colorize if the stream supports it.
    #[default]
    Auto,
    /// Always colorize.
    Always,
    /// Never colorize.
    Never,
}

impl Color {
    fn should_colorize(self, stream: Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

/// Styles for messages written to stderr.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
}

static INIT_LOGGING: Once = Once::new();

/// Installs the global subscriber. Only the first call has any effect.
fn init_logging(color: Color, verbose: bool) {
    let colorize = color.should_colorize(Stream::Stderr);

    INIT_LOGGING.call_once(|| {
        let default_level = if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        let (targets, invalid) = match std::env::var(LOG_ENV) {
            Ok(spec) if !spec.is_empty() => match spec.parse::<Targets>() {
                Ok(targets) => (targets, None),
                Err(error) => (
                    Targets::new().with_default(default_level),
                    Some((spec, error)),
                ),
            },
            _ => (Targets::new().with_default(default_level), None),
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(HeadingFormatter { colorize })
            .with_writer(io::stderr)
            .with_filter(targets);
        tracing_subscriber::registry().with(layer).init();

        if let Some((spec, error)) = invalid {
            tracing::warn!("ignoring invalid {LOG_ENV} value `{spec}`: {error}");
        }
    });
}

/// Formats events as `heading: message (field=value, ...)`.
struct HeadingFormatter {
    colorize: bool,
}

impl HeadingFormatter {
    fn heading(&self, level: Level) -> (&'static str, Style) {
        let (name, colored) = match level {
            Level::ERROR => ("error", style().red().bold()),
            Level::WARN => ("warning", style().yellow().bold()),
            Level::INFO => ("info", style().bold()),
            Level::DEBUG => ("debug", style().bold()),
            Level::TRACE => ("trace", style().dimmed()),
        };
        (name, if self.colorize { colored } else { Style::new() })
    }
}

impl<S, N> FormatEvent<S, N> for HeadingFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if metadata.target() != NO_HEADING_TARGET {
            let (name, style) = self.heading(*metadata.level());
            write!(writer, "{}: ", name.style(style))?;
        }

        let mut fields = EventFields::default();
        event.record(&mut fields);

        write!(writer, "{}", fields.message)?;
        if !fields.rest.is_empty() {
            write!(writer, " ({})", fields.rest.join(", "))?;
        }
        writeln!(writer)
    }
}

/// The message and the remaining structured fields of an event.
#[derive(Default)]
struct EventFields {
    message: String,
    rest: Vec<String>,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.rest.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.rest.push(format!("{}={value:?}", field.name()));
        }
    }
}

/// Where command output goes: the real stdout, or a buffer in tests.
#[derive(Default)]
pub enum OutputWriter {
    /// Write to stdout.
    #[default]
    Normal,
    /// Capture stdout.
    #[cfg(test)]
    Test {
        /// Captured bytes.
        stdout: Vec<u8>,
    },
}

impl OutputWriter {
    pub(crate) fn stdout_writer(&mut self) -> Box<dyn Write + '_> {
        match self {
            Self::Normal => Box::new(io::stdout().lock()),
            #[cfg(test)]
            Self::Test { stdout } => Box::new(stdout),
        }
    }
}
