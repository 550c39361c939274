//! Image scanning pipeline components.
//!
//! - **discovery**: Walk the root and submit one task per file
//! - **decode**: Try registered codecs until one decodes the bytes
//! - **pixels**: Decoded raster with per-pixel access
//! - **average**: Mean color over a pixel grid
//! - **processor**: Read → decode → average for a single task
//! - **worker**: Fixed-size worker pool
//! - **tracker**: Outstanding-task count and drain detection
//! - **channel**: Bounded channels for backpressure
//! - **scanner**: Orchestrates the full pipeline

pub mod average;
pub mod channel;
pub mod decode;
pub mod discovery;
pub mod pixels;
pub mod processor;
pub mod scanner;
pub mod tracker;
pub mod worker;

// Re-exports for convenient access
pub use average::{average_color, Average};
pub use decode::{Codec, DecodedImage, ImageCrateCodec, ImageDecoder};
pub use discovery::{DirectoryWalker, WalkStats};
pub use pixels::{Bounds, ChannelDepth, PixelGrid, PixelSource};
pub use processor::ImageProcessor;
pub use scanner::{ScanHandle, ScanReport, Scanner};
pub use tracker::{CompletionTracker, Ticket};
pub use worker::{WorkerPool, WorkerStats};
