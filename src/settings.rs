//! Code for loading program settings.
use crate::input::{input_err_msg, read_toml};
use crate::log::{DEFAULT_LOG_LEVEL, parse_log_level};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::Path;

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Program settings from config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// The default program log level
    pub log_level: String,
    /// Maximum time in seconds the solver may run for. No limit if absent.
    pub time_limit: Option<f64>,
    /// Relative optimality gap at which the solver stops branching
    pub mip_rel_gap: f64,
    /// Whether to show the solver's own output
    pub solver_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            time_limit: None,
            mip_rel_gap: 1e-6,
            solver_output: false,
        }
    }
}

impl Settings {
    /// Read settings from `settings.toml` in the specified directory.
    ///
    /// If the file is not present, default settings will be used.
    pub fn from_path<P: AsRef<Path>>(dir: P) -> Result<Settings> {
        Self::load_from_path(&dir.as_ref().join(SETTINGS_FILE_NAME))
    }

    /// Read from the specified file, falling back on the defaults if it doesn't exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        settings
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(settings)
    }

    /// Check the log level is known and the solver options are sensible
    pub fn validate(&self) -> Result<()> {
        parse_log_level(&self.log_level)?;

        if let Some(time_limit) = self.time_limit {
            ensure!(
                time_limit.is_finite() && time_limit > 0.0,
                "time_limit must be a finite number greater than zero"
            );
        }

        ensure!(
            self.mip_rel_gap.is_finite() && self.mip_rel_gap >= 0.0,
            "mip_rel_gap must be a finite number greater than or equal to zero"
        );

        Ok(())
    }
}
