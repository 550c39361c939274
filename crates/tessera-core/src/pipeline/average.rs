//! Average color of a pixel grid.
//!
//! Channels are summed at native depth, divided by the pixel count, and only
//! then rescaled to 8 bits, so rounding happens once per channel instead of
//! once per pixel.
//!
//! Alpha is not part of the result. Samples are averaged raw: transparent
//! pixels count like opaque ones and nothing is pre-multiplied.

use crate::error::AverageError;
use crate::types::Rgb;

use super::pixels::PixelSource;

/// Average color together with the dimensions it was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Average {
    pub color: Rgb,
    pub width: u32,
    pub height: u32,
}

/// Compute the mean RGB over the half-open bounds of `source`.
pub fn average_color<S: PixelSource + ?Sized>(source: &S) -> Result<Average, AverageError> {
    let bounds = source.bounds();
    let count = bounds.area();
    if count == 0 {
        return Err(AverageError::EmptyImage);
    }

    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for y in bounds.min_y..bounds.max_y {
        for x in bounds.min_x..bounds.max_x {
            let [pr, pg, pb, _] = source.pixel(x, y);
            r += u64::from(pr);
            g += u64::from(pg);
            b += u64::from(pb);
        }
    }

    let divisor = source.depth().to_eight_bit_divisor();
    let scale = |sum: u64| ((sum / count) / divisor).min(255) as u8;

    Ok(Average {
        color: Rgb::new(scale(r), scale(g), scale(b)),
        width: bounds.width(),
        height: bounds.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pixels::{Bounds, ChannelDepth, PixelGrid};
    use image::{DynamicImage, ImageBuffer, RgbImage, RgbaImage};

    /// Grid whose pixel value encodes its coordinates, with arbitrary bounds.
    struct Gradient {
        bounds: Bounds,
    }

    impl PixelSource for Gradient {
        fn bounds(&self) -> Bounds {
            self.bounds
        }

        fn depth(&self) -> ChannelDepth {
            ChannelDepth::Eight
        }

        fn pixel(&self, x: u32, y: u32) -> [u16; 4] {
            assert!(x >= self.bounds.min_x && x < self.bounds.max_x, "x out of range");
            assert!(y >= self.bounds.min_y && y < self.bounds.max_y, "y out of range");
            [x as u16, y as u16, 0, 255]
        }
    }

    fn rgb8(width: u32, height: u32, px: [u8; 3]) -> PixelGrid {
        PixelGrid::from(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb(px),
        )))
    }

    #[test]
    fn test_uniform_red_2x2() {
        let avg = average_color(&rgb8(2, 2, [255, 0, 0])).unwrap();
        assert_eq!(avg.color, Rgb::new(255, 0, 0));
        assert_eq!((avg.width, avg.height), (2, 2));
    }

    #[test]
    fn test_single_pixel() {
        let avg = average_color(&rgb8(1, 1, [10, 20, 30])).unwrap();
        assert_eq!(avg.color, Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_zero_area_is_empty_image() {
        let grid = Gradient {
            bounds: Bounds {
                min_x: 4,
                min_y: 0,
                max_x: 4,
                max_y: 8,
            },
        };
        assert_eq!(average_color(&grid), Err(AverageError::EmptyImage));
    }

    #[test]
    fn test_offset_bounds_are_half_open() {
        // x in {2,3,4}, y in {10,11}: means are 3 and 10 (10.5 truncated).
        let grid = Gradient {
            bounds: Bounds {
                min_x: 2,
                min_y: 10,
                max_x: 5,
                max_y: 12,
            },
        };
        let avg = average_color(&grid).unwrap();
        assert_eq!(avg.color, Rgb::new(3, 10, 0));
        assert_eq!((avg.width, avg.height), (3, 2));
    }

    #[test]
    fn test_mixed_pixels_truncate() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([0, 100, 255]));
        img.put_pixel(1, 0, image::Rgb([255, 101, 0]));
        let avg = average_color(&PixelGrid::from(DynamicImage::ImageRgb8(img))).unwrap();
        assert_eq!(avg.color, Rgb::new(127, 100, 127));
    }

    #[test]
    fn test_sixteen_bit_rescaled_after_averaging() {
        let mut img: ImageBuffer<image::Rgb<u16>, Vec<u16>> = ImageBuffer::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([0xFFFF, 0x0000, 0x8080]));
        img.put_pixel(1, 0, image::Rgb([0xFFFF, 0x0202, 0x8080]));
        let grid = PixelGrid::from(DynamicImage::ImageRgb16(img));
        let avg = average_color(&grid).unwrap();
        // 0x0101 / 257 = 1, 0x8080 / 257 = 128
        assert_eq!(avg.color, Rgb::new(255, 1, 128));
    }

    #[test]
    fn test_alpha_is_ignored() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([200, 0, 0, 0]));
        img.put_pixel(1, 0, image::Rgba([100, 0, 0, 255]));
        let avg = average_color(&PixelGrid::from(DynamicImage::ImageRgba8(img))).unwrap();
        assert_eq!(avg.color, Rgb::new(150, 0, 0));
    }

    #[test]
    fn test_deterministic() {
        let mut img = RgbImage::new(17, 9);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = image::Rgb([(x * 13) as u8, (y * 29) as u8, (x ^ y) as u8]);
        }
        let grid = PixelGrid::from(DynamicImage::ImageRgb8(img));
        let first = average_color(&grid).unwrap();
        for _ in 0..5 {
            assert_eq!(average_color(&grid).unwrap(), first);
        }
    }
}
