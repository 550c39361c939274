//! Core data types for the Tessera scanning pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One filesystem entry waiting to be checked and decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Path to the entry, as produced by the walk
    pub path: PathBuf,
}

impl FileTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb` form.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// The output for one successfully decoded image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Path of the source file
    pub path: PathBuf,

    /// Arithmetic mean of every pixel, alpha ignored
    pub average_color: Rgb,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Label of the codec that decoded the file ("png", "jpeg", ...)
    pub format: String,
}

/// Statistics for one completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Tasks the walker handed to the pool
    pub submitted: u64,

    /// Tasks the pool finished, successfully or not
    pub completed: u64,

    /// Records produced
    pub images: u64,

    /// Tasks dropped as soft failures
    pub skipped: u64,

    /// Entries the walker could not visit
    pub walk_errors: u64,

    /// Times the outstanding count drained to zero (1 for a finished scan)
    pub drains: u64,

    /// Wall-clock duration of the scan
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl ScanSummary {
    /// Records produced per second of wall-clock time.
    pub fn images_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.images as f64 / secs
        } else {
            0.0
        }
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb::new(255, 0, 16).to_hex(), "#ff0010");
    }

    #[test]
    fn test_image_record_serializes_flat_color() {
        let record = ImageRecord {
            path: PathBuf::from("tiles/a.png"),
            average_color: Rgb::new(10, 20, 30),
            width: 4,
            height: 2,
            format: "png".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"average_color\":{\"r\":10,\"g\":20,\"b\":30}"));
        assert!(json.contains("\"width\":4"));
    }

    #[test]
    fn test_summary_rate() {
        let summary = ScanSummary {
            images: 10,
            elapsed: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((summary.images_per_sec() - 5.0).abs() < f64::EPSILON);
        assert_eq!(ScanSummary::default().images_per_sec(), 0.0);
    }
}
