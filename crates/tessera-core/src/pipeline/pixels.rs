//! Decoded raster representation with per-pixel channel access.

use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};

/// Half-open pixel bounds `[min_x, max_x) × [min_y, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Bounds {
    /// Bounds anchored at the origin.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            max_x: width,
            max_y: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    /// Number of pixels enclosed, widened so large images cannot overflow.
    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

/// Bit depth of each stored channel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDepth {
    Eight,
    Sixteen,
}

impl ChannelDepth {
    /// Divisor that maps a sample at this depth onto 0..=255.
    pub const fn to_eight_bit_divisor(self) -> u64 {
        match self {
            Self::Eight => 1,
            Self::Sixteen => 257,
        }
    }
}

/// Anything that can hand out RGBA samples inside its bounds.
pub trait PixelSource {
    fn bounds(&self) -> Bounds;

    fn depth(&self) -> ChannelDepth;

    /// RGBA samples at native depth. Callers stay within [`PixelSource::bounds`].
    fn pixel(&self, x: u32, y: u32) -> [u16; 4];
}

/// A decoded image, normalised to RGBA at 8 or 16 bits per channel.
pub enum PixelGrid {
    Eight(RgbaImage),
    Sixteen(ImageBuffer<Rgba<u16>, Vec<u16>>),
}

impl PixelGrid {
    pub fn width(&self) -> u32 {
        match self {
            Self::Eight(buf) => buf.width(),
            Self::Sixteen(buf) => buf.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Eight(buf) => buf.height(),
            Self::Sixteen(buf) => buf.height(),
        }
    }
}

impl From<DynamicImage> for PixelGrid {
    /// Sources wider than 8 bits per channel (16-bit and float) keep 16 bits.
    fn from(image: DynamicImage) -> Self {
        let color = image.color();
        let bytes_per_channel = color.bytes_per_pixel() / color.channel_count().max(1);
        if bytes_per_channel > 1 {
            Self::Sixteen(image.into_rgba16())
        } else {
            Self::Eight(image.into_rgba8())
        }
    }
}

impl PixelSource for PixelGrid {
    fn bounds(&self) -> Bounds {
        Bounds::from_size(self.width(), self.height())
    }

    fn depth(&self) -> ChannelDepth {
        match self {
            Self::Eight(_) => ChannelDepth::Eight,
            Self::Sixteen(_) => ChannelDepth::Sixteen,
        }
    }

    fn pixel(&self, x: u32, y: u32) -> [u16; 4] {
        match self {
            Self::Eight(buf) => buf.get_pixel(x, y).0.map(u16::from),
            Self::Sixteen(buf) => buf.get_pixel(x, y).0,
        }
    }
}
