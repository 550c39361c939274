//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of concurrent decode workers
    pub parallel_workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 10,
        }
    }
}

/// Pipeline settings for backpressure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the task and result channels
    pub buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { buffer_size: 100 }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Files above this size are skipped without being read
    pub max_file_size_mb: u64,

    /// Per-task deadline covering read, decode and averaging
    pub task_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            task_timeout_ms: 30_000,
        }
    }
}

/// Output settings used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
