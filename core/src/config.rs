//! gamepack.toml configuration
//!
//! Every key is optional; missing keys fall back to the defaults used for
//! Go-based game collections.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{PackError, Result};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "gamepack.toml";

/// What to do when copying a single game directory fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyFailurePolicy {
    /// Stop the run; games copied so far stay on disk.
    #[default]
    Abort,
    /// Record the failure and move on to the next game.
    Continue,
}

/// Packaging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackConfig {
    /// Case-insensitive substring identifying game directories.
    pub marker: String,

    /// Literal substring removed (everywhere) from a directory name to
    /// produce the packaged game name.
    pub strip_token: String,

    /// File name ending of the game source file, including the dot.
    pub source_extension: String,

    /// Compiler program and its leading arguments.
    /// `-o <executable> <source>` is appended.
    pub compile_command: Vec<String>,

    /// Upper bound for a single compiler invocation.
    pub compile_timeout_secs: u64,

    /// Manifest file name, written at the target root.
    pub manifest_file: String,

    /// Build report file name, written at the target root.
    pub report_file: String,

    pub on_copy_failure: CopyFailurePolicy,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            marker: "game".to_string(),
            strip_token: "_game".to_string(),
            source_extension: ".go".to_string(),
            compile_command: vec!["go".to_string(), "build".to_string()],
            compile_timeout_secs: 300,
            manifest_file: "metadata.json".to_string(),
            report_file: "report.json".to_string(),
            on_copy_failure: CopyFailurePolicy::Abort,
        }
    }
}

impl PackConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PackError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| PackError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise `gamepack.toml` in `dir` if it
    /// exists, otherwise the defaults.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!("Using config {}", candidate.display());
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.marker.is_empty() {
            return Err(PackError::InvalidConfig("marker must not be empty".into()));
        }
        if self.source_extension.is_empty() {
            return Err(PackError::InvalidConfig(
                "source_extension must not be empty".into(),
            ));
        }
        if self.compile_command.first().is_none_or(|program| program.is_empty()) {
            return Err(PackError::InvalidConfig(
                "compile_command must name a program".into(),
            ));
        }
        if self.compile_timeout_secs == 0 {
            return Err(PackError::InvalidConfig(
                "compile_timeout_secs must be greater than 0".into(),
            ));
        }

        for (key, name) in [
            ("manifest_file", &self.manifest_file),
            ("report_file", &self.report_file),
        ] {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(PackError::InvalidConfig(format!(
                    "{} must be a plain file name, got {:?}",
                    key, name
                )));
            }
        }

        Ok(())
    }
}
