//! Structured logging setup for Strand
//!
//! The library crates only emit `tracing` events. This crate is for the
//! binaries, tests, and tools embedding a log: it installs a global
//! subscriber with console and/or file output.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines for log aggregation (default)
//! - **Pretty Console**: Human-readable output for development
//! - **File Output**: Daily-rotated JSONL files via tracing-appender
//! - **Per-crate Levels**: e.g. `strand_log=debug` on top of the default
//! - **RUST_LOG**: Overrides the configured filter
//!
//! # Quick Start
//!
//! ```ignore
//! use strand_logging::{LoggingConfig, SubscriberBuilder};
//!
//! // JSONL to console
//! SubscriberBuilder::new().init();
//!
//! // Pretty console, Strand crates at debug
//! SubscriberBuilder::new()
//!     .with_config(LoggingConfig::development())
//!     .init();
//!
//! // Only the log engine at trace
//! SubscriberBuilder::new()
//!     .with_level("warn")
//!     .with_target("strand_log", "trace")
//!     .init();
//! ```

pub mod config;

pub use config::{
    ConsoleFormat, FileConfig, JsonlConfig, LoggingConfig, RotationStrategy, STRAND_TARGETS,
};

use std::fs::{self, File};

use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create rolling appender: {0}")]
    Appender(#[from] InitError),

    #[error("Failed to set global subscriber: {0}")]
    Init(#[from] TryInitError),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builder for configuring and initializing the logging subscriber
///
/// By default, console output uses JSONL format. Use
/// `LoggingConfig::development()` for human-readable output.
#[derive(Debug, Default)]
pub struct SubscriberBuilder {
    config: LoggingConfig,
}

impl SubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LoggingConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Set the level for one target
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.config = self.config.with_target(target, level);
        self
    }

    /// Enable or disable console output
    ///
    /// Enabling keeps an already configured format, JSONL otherwise.
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console = match (enabled, self.config.console) {
            (false, _) => None,
            (true, Some(format)) => Some(format),
            (true, None) => Some(ConsoleFormat::Jsonl),
        };
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Initialize the subscriber globally
    ///
    /// Keep the returned guard alive for as long as file output is needed.
    /// Failures are reported on stderr and leave logging disabled.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }

    /// Try to initialize the subscriber globally
    ///
    /// Fails if a global subscriber has already been set or the log file
    /// cannot be opened.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let (layers, guard) = self.layers()?;
        Registry::default().with(layers).try_init()?;
        Ok(guard)
    }

    fn layers(&self) -> Result<(Vec<BoxedLayer>, Option<WorkerGuard>), LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.filter_directives()));

        let mut layers: Vec<BoxedLayer> = vec![env_filter.boxed()];
        let mut guard = None;

        match self.config.console {
            Some(ConsoleFormat::Pretty { ansi }) => layers.push(
                tracing_subscriber::fmt::layer()
                    .with_ansi(ansi)
                    .with_target(true)
                    .boxed(),
            ),
            Some(ConsoleFormat::Jsonl) => {
                layers.push(json_layer(&self.config.jsonl, std::io::stdout))
            }
            None => {}
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(json_layer(&self.config.jsonl, writer));
            guard = Some(file_guard);
        }

        Ok((layers, guard))
    }
}

fn json_layer<S, W>(jsonl: &JsonlConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(jsonl.include_spans)
        .with_span_list(jsonl.include_spans)
        .flatten_event(true)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_writer(writer)
        .boxed()
}

/// Non-blocking writer for the configured file; `Never` truncates a single file
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let rotation = match config.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&config.directory)?;
            let file = File::create(config.directory.join(format!("{}.log", config.prefix)))?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log")
        .build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() {
    SubscriberBuilder::new().init();
}

/// Initialize logging for development (pretty console, Strand crates at debug)
pub fn init_development() {
    SubscriberBuilder::new()
        .with_config(LoggingConfig::development())
        .init();
}

/// Initialize logging for testing
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_testing() {
    let _ = SubscriberBuilder::new()
        .with_config(LoggingConfig::testing())
        .try_init();
}
