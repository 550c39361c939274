//! Image decoding by dispatch over a registered list of codecs.
//!
//! Codecs are tried in registration order. A codec is only asked to decode
//! bytes whose signature it recognises, and the first successful decode wins.
//! The default order is PNG, JPEG, GIF, WebP, BMP, TIFF.

use image::{DynamicImage, ImageFormat, ImageResult};
use std::path::Path;
use std::sync::Arc;

use crate::error::PipelineError;

use super::pixels::PixelGrid;

/// A pluggable "given bytes, decode to pixels or fail" capability.
pub trait Codec: Send + Sync {
    /// Short lowercase label reported on records ("png", "jpeg", ...).
    fn name(&self) -> &'static str;

    /// Cheap magic-byte check run before a full decode.
    fn sniff(&self, bytes: &[u8]) -> bool;

    fn decode(&self, bytes: &[u8]) -> ImageResult<DynamicImage>;
}

/// Codec backed by one of the `image` crate's format decoders.
pub struct ImageCrateCodec {
    format: ImageFormat,
    name: &'static str,
    signature: fn(&[u8]) -> bool,
}

impl ImageCrateCodec {
    pub fn png() -> Self {
        Self {
            format: ImageFormat::Png,
            name: "png",
            signature: |b| b.starts_with(&[0x89, b'P', b'N', b'G']),
        }
    }

    pub fn jpeg() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            name: "jpeg",
            signature: |b| b.starts_with(&[0xFF, 0xD8, 0xFF]),
        }
    }

    pub fn gif() -> Self {
        Self {
            format: ImageFormat::Gif,
            name: "gif",
            signature: |b| b.starts_with(b"GIF8"),
        }
    }

    pub fn webp() -> Self {
        Self {
            format: ImageFormat::WebP,
            name: "webp",
            signature: |b| b.len() >= 12 && b.starts_with(b"RIFF") && &b[8..12] == b"WEBP",
        }
    }

    pub fn bmp() -> Self {
        Self {
            format: ImageFormat::Bmp,
            name: "bmp",
            signature: |b| b.starts_with(b"BM"),
        }
    }

    pub fn tiff() -> Self {
        Self {
            format: ImageFormat::Tiff,
            name: "tiff",
            // II + 42 (little-endian) or MM + 42 (big-endian)
            signature: |b| {
                b.starts_with(&[b'I', b'I', 0x2A, 0x00]) || b.starts_with(&[b'M', b'M', 0x00, 0x2A])
            },
        }
    }
}

impl Codec for ImageCrateCodec {
    fn name(&self) -> &'static str {
        self.name
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        (self.signature)(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> ImageResult<DynamicImage> {
        image::load_from_memory_with_format(bytes, self.format)
    }
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// The decoded pixels
    pub grid: PixelGrid,
    /// Label of the codec that accepted the bytes
    pub format: &'static str,
}

/// Tries each registered codec in order. Cheap to clone.
#[derive(Clone)]
pub struct ImageDecoder {
    codecs: Arc<[Box<dyn Codec>]>,
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::with_codecs(vec![
            Box::new(ImageCrateCodec::png()),
            Box::new(ImageCrateCodec::jpeg()),
            Box::new(ImageCrateCodec::gif()),
            Box::new(ImageCrateCodec::webp()),
            Box::new(ImageCrateCodec::bmp()),
            Box::new(ImageCrateCodec::tiff()),
        ])
    }
}

impl ImageDecoder {
    /// Build a decoder over a custom codec list, tried in the given order.
    pub fn with_codecs(codecs: Vec<Box<dyn Codec>>) -> Self {
        Self {
            codecs: codecs.into(),
        }
    }

    /// Names of the registered codecs, in trial order.
    pub fn codec_names(&self) -> Vec<&'static str> {
        self.codecs.iter().map(|c| c.name()).collect()
    }

    /// Decode `bytes` read from `path`.
    ///
    /// `path` is only used for error context. Failures here are deterministic
    /// for the same bytes and are never retried.
    pub fn decode(&self, bytes: &[u8], path: &Path) -> Result<DecodedImage, PipelineError> {
        let mut last_error = None;

        for codec in self.codecs.iter().filter(|c| c.sniff(bytes)) {
            match codec.decode(bytes) {
                Ok(image) => {
                    return Ok(DecodedImage {
                        grid: PixelGrid::from(image),
                        format: codec.name(),
                    });
                }
                Err(e) => {
                    tracing::trace!(
                        codec = codec.name(),
                        path = %path.display(),
                        error = %e,
                        "Codec rejected bytes"
                    );
                    last_error = Some(format!("{}: {}", codec.name(), e));
                }
            }
        }

        match last_error {
            Some(message) => Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message,
            }),
            None => Err(PipelineError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pixels::PixelSource;
    use image::{ImageError, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn encode(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, image::Rgb([9, 8, 7])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    /// Accepts everything and records how often it was asked.
    struct Greedy {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        succeed: bool,
    }

    impl Codec for Greedy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn sniff(&self, _bytes: &[u8]) -> bool {
            true
        }

        fn decode(&self, _bytes: &[u8]) -> ImageResult<DynamicImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(DynamicImage::new_rgb8(1, 1))
            } else {
                Err(ImageError::IoError(std::io::Error::other("nope")))
            }
        }
    }

    #[test]
    fn test_default_codec_order() {
        let decoder = ImageDecoder::default();
        assert_eq!(
            decoder.codec_names(),
            vec!["png", "jpeg", "gif", "webp", "bmp", "tiff"]
        );
    }

    #[test]
    fn test_decodes_png_and_jpeg() {
        let decoder = ImageDecoder::default();

        let png = decoder.decode(&encode(ImageFormat::Png), Path::new("a.png")).unwrap();
        assert_eq!(png.format, "png");
        assert_eq!((png.grid.width(), png.grid.height()), (3, 2));

        let jpeg = decoder.decode(&encode(ImageFormat::Jpeg), Path::new("b.jpg")).unwrap();
        assert_eq!(jpeg.format, "jpeg");
    }

    #[test]
    fn test_format_detected_by_content_not_extension() {
        let decoder = ImageDecoder::default();
        let decoded = decoder
            .decode(&encode(ImageFormat::Bmp), Path::new("misnamed.png"))
            .unwrap();
        assert_eq!(decoded.format, "bmp");
        assert_eq!(decoded.grid.pixel(0, 0), [9, 8, 7, 255]);
    }

    #[test]
    fn test_text_is_unsupported() {
        let decoder = ImageDecoder::default();
        let err = decoder
            .decode(b"just some notes\n", Path::new("notes.txt"))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_empty_bytes_are_unsupported() {
        let decoder = ImageDecoder::default();
        let err = decoder.decode(&[], Path::new("empty")).err().unwrap();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_truncated_png_is_decode_error() {
        let mut bytes = encode(ImageFormat::Png);
        bytes.truncate(20);
        let decoder = ImageDecoder::default();
        let err = decoder.decode(&bytes, Path::new("cut.png")).err().unwrap();
        match err {
            PipelineError::Decode { message, .. } => assert!(message.starts_with("png")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_first_success_wins() {
        let failing = Arc::new(AtomicUsize::new(0));
        let winner = Arc::new(AtomicUsize::new(0));
        let never = Arc::new(AtomicUsize::new(0));
        let decoder = ImageDecoder::with_codecs(vec![
            Box::new(Greedy {
                name: "first",
                calls: failing.clone(),
                succeed: false,
            }),
            Box::new(Greedy {
                name: "second",
                calls: winner.clone(),
                succeed: true,
            }),
            Box::new(Greedy {
                name: "third",
                calls: never.clone(),
                succeed: true,
            }),
        ]);

        let decoded = decoder.decode(b"anything", Path::new("x")).unwrap();
        assert_eq!(decoded.format, "second");
        assert_eq!(failing.load(Ordering::SeqCst), 1);
        assert_eq!(winner.load(Ordering::SeqCst), 1);
        assert_eq!(never.load(Ordering::SeqCst), 0);
    }
}
