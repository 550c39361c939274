//! Per-task processing: read → decode → average → record.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Config, LimitsConfig};
use crate::error::{AverageError, PipelineError, PipelineResult};
use crate::types::{FileTask, ImageRecord};

use super::average::average_color;
use super::decode::ImageDecoder;

/// Turns one file task into an image record, or a soft failure.
#[derive(Clone)]
pub struct ImageProcessor {
    decoder: ImageDecoder,
    limits: LimitsConfig,
}

impl ImageProcessor {
    /// Create a processor with the default codec set.
    pub fn new(config: &Config) -> Self {
        Self::with_decoder(ImageDecoder::default(), config.limits.clone())
    }

    pub fn with_decoder(decoder: ImageDecoder, limits: LimitsConfig) -> Self {
        Self { decoder, limits }
    }

    /// Process one task within the configured deadline.
    ///
    /// A task that exceeds `limits.task_timeout_ms` becomes
    /// [`PipelineError::Timeout`]. A decode already running on the blocking
    /// pool cannot be interrupted and finishes in the background.
    pub async fn process(&self, task: &FileTask) -> PipelineResult<ImageRecord> {
        let timeout_ms = self.limits.task_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.process_inner(task)).await
        {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout {
                path: task.path.clone(),
                timeout_ms,
            }),
        }
    }

    async fn process_inner(&self, task: &FileTask) -> PipelineResult<ImageRecord> {
        let path = task.path.clone();
        let open_err = |source: std::io::Error| PipelineError::Open {
            path: path.clone(),
            source,
        };

        let metadata = tokio::fs::metadata(&path).await.map_err(open_err)?;
        // Reading a FIFO or device could block a blocking-pool thread forever.
        if !metadata.is_file() {
            return Err(PipelineError::NotRegularFile(path.clone()));
        }
        let max_bytes = self.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.clone(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let bytes = tokio::fs::read(&path).await.map_err(open_err)?;

        let decoder = self.decoder.clone();
        let path_owned = path.clone();
        tokio::task::spawn_blocking(move || Self::process_bytes(&decoder, &bytes, path_owned))
            .await
            .map_err(|e| PipelineError::Decode {
                path,
                message: format!("Task join error: {}", e),
            })?
    }

    /// Synchronous decode and average of bytes already read from `path`.
    pub fn process_bytes(
        decoder: &ImageDecoder,
        bytes: &[u8],
        path: PathBuf,
    ) -> PipelineResult<ImageRecord> {
        let decoded = decoder.decode(bytes, &path)?;
        let average = average_color(&decoded.grid).map_err(|e| match e {
            AverageError::EmptyImage => PipelineError::EmptyImage(path.clone()),
        })?;

        tracing::debug!(
            path = %path.display(),
            format = decoded.format,
            width = average.width,
            height = average.height,
            color = %average.color.to_hex(),
            "Got info for file"
        );

        Ok(ImageRecord {
            path,
            average_color: average.color,
            width: average.width,
            height: average.height,
            format: decoded.format.to_string(),
        })
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }
}

/// Log a dropped task. Soft failures are expected noise in a directory scan.
pub(crate) fn log_skipped(path: &Path, error: &PipelineError) {
    tracing::debug!(path = %path.display(), error = %error, "Skipping file");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::decode::Codec;
    use crate::types::Rgb;
    use image::{DynamicImage, ImageFormat, ImageResult, RgbImage};
    use std::io::Cursor;

    fn write_png(path: &Path, px: [u8; 3]) {
        RgbImage::from_pixel(2, 2, image::Rgb(px))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    /// Decodes everything into a zero-area image.
    struct Hollow;

    impl Codec for Hollow {
        fn name(&self) -> &'static str {
            "hollow"
        }

        fn sniff(&self, _bytes: &[u8]) -> bool {
            true
        }

        fn decode(&self, _bytes: &[u8]) -> ImageResult<DynamicImage> {
            Ok(DynamicImage::new_rgb8(0, 0))
        }
    }

    /// Takes far longer than any test deadline.
    struct Sluggish;

    impl Codec for Sluggish {
        fn name(&self) -> &'static str {
            "sluggish"
        }

        fn sniff(&self, _bytes: &[u8]) -> bool {
            true
        }

        fn decode(&self, _bytes: &[u8]) -> ImageResult<DynamicImage> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(DynamicImage::new_rgb8(1, 1))
        }
    }

    #[tokio::test]
    async fn test_slow_decode_times_out_softly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.img");
        std::fs::write(&path, b"slow").unwrap();

        let limits = LimitsConfig {
            task_timeout_ms: 20,
            ..LimitsConfig::default()
        };
        let decoder = ImageDecoder::with_codecs(vec![Box::new(Sluggish)]);
        let processor = ImageProcessor::with_decoder(decoder, limits);

        let err = processor.process(&FileTask::new(&path)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { timeout_ms: 20, .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_process_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        write_png(&path, [255, 0, 0]);

        let processor = ImageProcessor::new(&Config::default());
        let record = processor.process(&FileTask::new(&path)).await.unwrap();

        assert_eq!(record.path, path);
        assert_eq!(record.average_color, Rgb::new(255, 0, 0));
        assert_eq!((record.width, record.height), (2, 2));
        assert_eq!(record.format, "png");
    }

    #[tokio::test]
    async fn test_missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let processor = ImageProcessor::new(&Config::default());
        let err = processor
            .process(&FileTask::new(dir.path().join("gone.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Open { .. }));
    }

    #[tokio::test]
    async fn test_zero_byte_file_is_soft_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jpg");
        std::fs::write(&path, b"").unwrap();

        let processor = ImageProcessor::new(&Config::default());
        let err = processor.process(&FileTask::new(&path)).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_oversized_file_skipped_before_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 1024 * 1024 + 1]).unwrap();

        let limits = LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        };
        let processor = ImageProcessor::with_decoder(ImageDecoder::default(), limits);
        let err = processor.process(&FileTask::new(&path)).await.unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { max_mb: 1, .. }));
    }

    #[tokio::test]
    async fn test_huge_size_limit_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        write_png(&path, [255, 0, 0]);

        let limits = LimitsConfig {
            max_file_size_mb: u64::MAX,
            ..LimitsConfig::default()
        };
        let processor = ImageProcessor::with_decoder(ImageDecoder::default(), limits);
        let record = processor.process(&FileTask::new(&path)).await.unwrap();
        assert_eq!(record.average_color, Rgb::new(255, 0, 0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fifo_is_skipped_without_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe");
        let made = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !made {
            return;
        }

        let limits = LimitsConfig {
            task_timeout_ms: 5_000,
            ..LimitsConfig::default()
        };
        let processor = ImageProcessor::with_decoder(ImageDecoder::default(), limits);
        let err = processor.process(&FileTask::new(&path)).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotRegularFile(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_zero_area_decode_is_empty_image() {
        let decoder = ImageDecoder::with_codecs(vec![Box::new(Hollow)]);
        let err = ImageProcessor::process_bytes(&decoder, b"xx", PathBuf::from("hollow.img"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyImage(_)));
    }

    #[test]
    fn test_process_bytes_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 255])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();

        let record = ImageProcessor::process_bytes(
            &ImageDecoder::default(),
            buf.get_ref(),
            PathBuf::from("blue.jpg"),
        )
        .unwrap();
        assert_eq!(record.format, "jpeg");
        assert_eq!((record.width, record.height), (8, 8));
        // Lossy, but a flat block stays close to pure blue.
        assert!(record.average_color.b > 240);
        assert!(record.average_color.r < 16);
    }
}
