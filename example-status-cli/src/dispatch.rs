// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExampleStatusExitCode, ExpectedError, Result},
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use example_status::{
    ConfigLocation, EnvSource, StatusConfig, StatusStore, StatusSummary, failed_example_ids,
    table,
};
use itertools::Itertools;
use std::io::Write;
use tracing::{debug, info};

/// Query and update persisted per-example test statuses.
///
/// Statuses are stored as a plain-text table, merged across runs so that
/// examples skipped by a filtered run keep their last known status.
#[derive(Debug, Parser)]
#[command(version, bin_name = "example-status", max_term_width = 100)]
pub struct ExampleStatusApp {
    /// Resolve relative paths against this directory
    #[arg(long, short = 'C', global = true, value_name = "DIR")]
    directory: Option<Utf8PathBuf>,

    /// Config file [default: example-status.toml in the working directory]
    ///
    /// Pass `none` to use only the built-in defaults and environment overrides.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Status file to use, overriding the configured path
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<Utf8PathBuf>,

    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl ExampleStatusApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, reading config overrides from the process environment.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        self.exec_with_env(output, output_writer, EnvSource::Process)
    }

    /// Executes the app with config overrides taken from `env`.
    pub fn exec_with_env(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
        env: EnvSource,
    ) -> Result<i32> {
        let cwd = resolve_directory(self.directory.as_deref())?;

        let config = match self.config.as_deref() {
            Some(path) if path.as_str() == "none" => {
                StatusConfig::load(ConfigLocation::Isolated, env)?
            }
            Some(path) => StatusConfig::load(ConfigLocation::Explicit(&cwd.join(path)), env)?,
            None => StatusConfig::load(ConfigLocation::Default(&cwd), env)?,
        };

        let store = match &self.store {
            Some(path) => StatusStore::new(cwd.join(path)),
            None => config.store.store(&cwd),
        };
        debug!("using status file at {}", store.path());

        match self.command {
            Command::Persist { this_run } => {
                let this_run_path = cwd.join(this_run);
                let contents = std::fs::read_to_string(&this_run_path).map_err(|err| {
                    ExpectedError::ThisRunRead {
                        path: this_run_path.clone(),
                        err,
                    }
                })?;
                let this_run = table::decode(&contents);
                debug!(
                    "read {} records from this run at {this_run_path}",
                    this_run.len()
                );

                let merged = store.persist(this_run, &config.store.spec_files(&cwd))?;
                let summary = StatusSummary::from_records(&merged);

                let mut writer = output_writer.stdout_writer();
                write_persist_summary(&summary, store.path(), &mut writer)
                    .map_err(|err| ExpectedError::WriteOutput { err })?;
                if output.verbose {
                    for example_id in failed_example_ids(&merged) {
                        writeln!(writer, "  failed: {example_id}")
                            .map_err(|err| ExpectedError::WriteOutput { err })?;
                    }
                }
                writer.flush().map_err(|err| ExpectedError::WriteOutput { err })?;
            }
            Command::Show { message_format } => {
                let records = store.load()?;
                let mut writer = output_writer.stdout_writer();
                match message_format {
                    MessageFormat::Human => match table::encode(&records) {
                        Some(table) => writer
                            .write_all(table.as_bytes())
                            .map_err(|err| ExpectedError::WriteOutput { err })?,
                        None => info!("no example statuses stored at {}", store.path()),
                    },
                    MessageFormat::Json => {
                        serde_json::to_writer_pretty(&mut writer, &records)
                            .map_err(|err| ExpectedError::SerializeJson { err })?;
                        writeln!(writer).map_err(|err| ExpectedError::WriteOutput { err })?;
                    }
                }
                writer.flush().map_err(|err| ExpectedError::WriteOutput { err })?;
            }
            Command::Failures { next } => {
                let records = store.load()?;
                let failed = failed_example_ids(&records);
                if failed.is_empty() {
                    info!("no failed examples recorded at {}", store.path());
                }

                let take = if next { 1 } else { failed.len() };
                let mut writer = output_writer.stdout_writer();
                for example_id in failed.into_iter().take(take) {
                    writeln!(writer, "{example_id}")
                        .map_err(|err| ExpectedError::WriteOutput { err })?;
                }
                writer.flush().map_err(|err| ExpectedError::WriteOutput { err })?;
            }
            Command::Clear => {
                store.clear()?;
                info!("cleared example statuses at {}", store.path());
            }
        }

        Ok(ExampleStatusExitCode::OK)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge this run's statuses into the status file
    ///
    /// Examples from spec files that were not loaded this run keep their
    /// stored status, unless the spec file no longer exists.
    Persist {
        /// Table-format file with the statuses observed during this run
        #[arg(value_name = "THIS_RUN")]
        this_run: Utf8PathBuf,
    },

    /// Print the stored statuses
    Show {
        /// Output format
        #[arg(long, value_enum, default_value_t, value_name = "FMT")]
        message_format: MessageFormat,
    },

    /// Print the IDs of examples that failed, one per line
    Failures {
        /// Print only the first failure
        #[arg(long)]
        next: bool,
    },

    /// Remove the status file
    Clear,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum MessageFormat {
    /// The persisted table format
    #[default]
    Human,
    /// A JSON array with one object per example
    Json,
}

fn resolve_directory(directory: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    let cwd =
        std::env::current_dir().map_err(|error| ExpectedError::GetCurrentDirFailed { error })?;
    let cwd =
        Utf8PathBuf::try_from(cwd).map_err(|error| ExpectedError::CurrentDirInvalidUtf8 { error })?;

    match directory {
        Some(dir) => {
            let dir = cwd.join(dir);
            if !dir.is_dir() {
                return Err(ExpectedError::DirectoryNotFound { path: dir });
            }
            Ok(dir)
        }
        None => Ok(cwd),
    }
}

fn write_persist_summary(
    summary: &StatusSummary,
    path: &Utf8Path,
    mut writer: impl Write,
) -> std::io::Result<()> {
    let counts = summary
        .by_status
        .iter()
        .map(|(status, count)| format!("{count} {status}"))
        .join(", ");
    let noun = if summary.total == 1 {
        "example"
    } else {
        "examples"
    };

    if counts.is_empty() {
        writeln!(writer, "persisted {} {noun} to {path}", summary.total)
    } else {
        writeln!(writer, "persisted {} {noun} to {path}: {counts}", summary.total)
    }
}
