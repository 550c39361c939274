//! Logging initialization.
//!
//! All diagnostics go to stderr through `tracing`; stdout carries only scan
//! records.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Resolved logging settings after CLI flags are applied over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl LogSettings {
    /// Merge config values with CLI overrides. `--verbose` forces at least
    /// `debug`, but keeps `trace` if the config asks for it.
    pub fn resolve(config: &tessera_core::Config, verbose: bool, json_logs: bool) -> Self {
        let level = match (verbose, config.logging.level.as_str()) {
            (true, "trace") => "trace",
            (true, _) => "debug",
            (false, level) => level,
        };
        Self {
            level: level.to_string(),
            json: json_logs || config.logging.format == "json",
        }
    }
}

/// Install the global subscriber.
///
/// The RUST_LOG environment variable overrides the configured level.
pub fn init(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    if settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the loaded configuration and global CLI flags.
pub fn init_from_config(config: &tessera_core::Config, verbose: bool, json_logs: bool) {
    init(&LogSettings::resolve(config, verbose, json_logs));
}
