//! Configuration types for the logging system
//!
//! A filter is a default level plus per-target overrides, so the log
//! engine can run at `debug` while everything else stays quieter.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Targets emitted by the Strand crates
pub const STRAND_TARGETS: [&str; 3] = ["strand_core", "strand_storage", "strand_log"];

/// Main logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for every target without an override (RUST_LOG wins over both)
    pub default_level: String,

    /// Per-target levels, e.g. `strand_log` => `debug`
    pub targets: BTreeMap<String, String>,

    /// Console output, if any
    pub console: Option<ConsoleFormat>,

    /// File output, if any
    pub file: Option<FileConfig>,

    /// JSONL formatting for JSON console and file output
    pub jsonl: JsonlConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            targets: BTreeMap::new(),
            console: Some(ConsoleFormat::Jsonl),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Pretty console output, Strand crates at `debug`
    pub fn development() -> Self {
        STRAND_TARGETS.iter().fold(
            Self {
                console: Some(ConsoleFormat::Pretty { ansi: true }),
                ..Default::default()
            },
            |config, target| config.with_target(*target, "debug"),
        )
    }

    /// JSONL to daily files under `log_dir`, no console
    ///
    /// Log engine and store events stay at `info`; other crates log
    /// warnings only.
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            default_level: "warn".to_string(),
            console: None,
            file: Some(FileConfig {
                directory: log_dir,
                ..FileConfig::default()
            }),
            ..Default::default()
        }
        .with_target("strand_log", "info")
        .with_target("strand_storage", "info")
    }

    /// Warnings only, uncolored so test output stays readable
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            console: Some(ConsoleFormat::Pretty { ansi: false }),
            ..Default::default()
        }
    }

    /// Override the level for one target
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.targets.insert(target.into(), level.into());
        self
    }

    /// Filter directives in `EnvFilter` syntax
    pub fn filter_directives(&self) -> String {
        let mut directives = vec![self.default_level.clone()];
        directives.extend(
            self.targets
                .iter()
                .map(|(target, level)| format!("{}={}", target, level)),
        );
        directives.join(",")
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleFormat {
    /// Human-readable lines
    Pretty { ansi: bool },
    /// One JSON object per line
    Jsonl,
}

/// File output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Directory for log files
    pub directory: PathBuf,
    /// File name prefix
    pub prefix: String,
    /// Rotation strategy
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "strand".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

/// File rotation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RotationStrategy {
    #[default]
    Daily,
    /// Single `<prefix>.log` file, truncated on startup
    Never,
}

/// JSONL formatting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonlConfig {
    /// Include the enclosing spans, e.g. `add_with_meta`
    pub include_spans: bool,
    /// Include file/line information
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            include_spans: true,
            include_location: false,
        }
    }
}
