// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User configuration for example-status.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    existence::FilesystemSpecFiles,
    store::StatusStore,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{
    Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, builder::DefaultState,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// The name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "example-status.toml";

/// The prefix for environment variable overrides.
///
/// Nested keys are separated by `__`, e.g. `EXAMPLE_STATUS_STORE__PATH`.
pub const ENV_PREFIX: &str = "EXAMPLE_STATUS";

/// The environment variable that controls log levels.
pub const LOG_ENV: &str = "EXAMPLE_STATUS_LOG";

/// The environment variable that controls color output.
pub const COLOR_ENV: &str = "EXAMPLE_STATUS_COLOR";

/// Variables that share [`ENV_PREFIX`] but are not config keys. They are never
/// treated as overrides.
const NON_CONFIG_ENV_VARS: [&str; 2] = [LOG_ENV, COLOR_ENV];

/// Resolved configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct StatusConfig {
    /// Store configuration.
    pub store: StoreConfig,
}

/// The `[store]` section.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct StoreConfig {
    /// The file statuses are persisted to.
    pub path: Utf8PathBuf,

    /// The directory spec file paths are relative to.
    #[serde(default, alias = "spec_root")]
    pub spec_root: Option<Utf8PathBuf>,
}

impl StoreConfig {
    /// Returns a store for the configured path, resolved against `cwd`.
    pub fn store(&self, cwd: &Utf8Path) -> StatusStore {
        StatusStore::new(cwd.join(&self.path))
    }

    /// Returns the spec file existence checker, resolved against `cwd`.
    pub fn spec_files(&self, cwd: &Utf8Path) -> FilesystemSpecFiles {
        match &self.spec_root {
            Some(root) => FilesystemSpecFiles::with_root(cwd.join(root)),
            None => FilesystemSpecFiles::with_root(cwd),
        }
    }
}

/// Specifies where to load the config file from.
#[derive(Clone, Copy, Debug)]
pub enum ConfigLocation<'a> {
    /// Look for [`CONFIG_FILE_NAME`] in the given directory, if it exists.
    Default(&'a Utf8Path),

    /// Skip the config file, using only built-in defaults and the environment.
    Isolated,

    /// Load the config file from an explicit path. The file must exist.
    Explicit(&'a Utf8Path),
}

/// Where environment overrides come from.
#[derive(Clone, Debug, Default)]
pub enum EnvSource {
    /// The process environment.
    #[default]
    Process,

    /// A fixed set of variables.
    Fixed(Vec<(String, String)>),
}

impl StatusConfig {
    /// The default config, embedded at build time.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Loads the config: built-in defaults, then the config file, then
    /// environment overrides.
    ///
    /// Unknown keys are logged as warnings.
    pub fn load(location: ConfigLocation<'_>, env: EnvSource) -> Result<Self, ConfigParseError> {
        Self::load_with_warnings(location, env, &mut DefaultConfigWarnings)
    }

    fn load_with_warnings(
        location: ConfigLocation<'_>,
        env: EnvSource,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let mut builder = Self::make_default_config();

        let config_file = match location {
            ConfigLocation::Default(dir) => {
                let path = dir.join(CONFIG_FILE_NAME);
                debug!("config: looking for optional config at {path}");
                builder =
                    builder.add_source(File::new(path.as_str(), FileFormat::Toml).required(false));
                Some(path)
            }
            ConfigLocation::Explicit(path) => {
                debug!("config: loading from explicit path {path}");
                builder = builder.add_source(File::new(path.as_str(), FileFormat::Toml));
                Some(path.to_owned())
            }
            ConfigLocation::Isolated => {
                debug!("config: skipping config file (isolated)");
                None
            }
        };

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__");
        let vars: Vec<(String, String)> = match env {
            EnvSource::Process => std::env::vars().collect(),
            EnvSource::Fixed(vars) => vars,
        };
        let environment = environment.source(Some(
            vars.into_iter()
                .filter(|(name, _)| {
                    !NON_CONFIG_ENV_VARS
                        .iter()
                        .any(|reserved| name.eq_ignore_ascii_case(reserved))
                })
                .collect(),
        ));
        builder = builder.add_source(environment);

        let error_path = config_file.unwrap_or_else(|| Utf8PathBuf::from("<default config>"));
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(error_path.clone(), kind))?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(&error_path, &unknown);
        }

        Ok(config)
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(Self, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: Self = serde_path_to_error::deserialize(ignored_de).map_err(|error| {
            // Both serde_path_to_error and the config crate report the key. Drop
            // the key from the config error for consistency.
            let path = error.path().clone();
            let config_error = error.into_inner();
            let error = match config_error {
                ConfigError::At { error, .. } => *error,
                other => other,
            };
            ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                path, error,
            )))
        })?;

        Ok((config, ignored))
    }
}

/// Handles warnings produced while loading config.
trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Logs warnings using the tracing crate.
struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let keys: Vec<String> = unknown.iter().map(|key| format!("`{key}`")).collect();
        let plural = if keys.len() == 1 { "" } else { "s" };
        warn!(
            "ignoring unknown configuration key{plural} in {config_file}: {}",
            keys.join(", ")
        );
    }
}
