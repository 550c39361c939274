//! Tessera Core - concurrent image scanning for mosaic building.
//!
//! Tessera walks a directory tree, decodes every file it can as a raster
//! image, and records each image's average color and dimensions. The records
//! are the raw material for a photo mosaic.
//!
//! # Architecture
//!
//! ```text
//! Walk → Task channel → P workers (read → decode → average) → Record stream
//! ```
//!
//! Files that are not images, cannot be read, or fail to decode are skipped.
//! Only an unreadable root directory fails the scan.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tessera_core::{Config, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> tessera_core::Result<()> {
//!     let scanner = Scanner::new(Config::load()?);
//!     let report = scanner.scan("./photos".as_ref()).await?;
//!     for record in &report.records {
//!         println!("{} {}", record.path.display(), record.average_color.to_hex());
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{AverageError, ConfigError, PipelineError, PipelineResult, Result, TesseraError};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{ScanHandle, ScanReport, Scanner};
pub use types::{FileTask, ImageRecord, Rgb, ScanSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
