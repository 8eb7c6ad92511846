// Frame domain: planar input frames, the interleaved intermediate, and RGBA rasters.

pub mod error;
pub mod synthetic;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use self::error::{PipelineError, Result};

/// A single plane of a planar YUV frame.
///
/// `row_stride` is the byte distance between the starts of consecutive rows
/// and may include alignment padding. `pixel_stride` is the byte distance
/// between consecutive samples within a row (1 for fully planar storage,
/// 2 for semi-planar chroma).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub data: Vec<u8>,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl Plane {
    /// Create a plane with explicit row and pixel strides.
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// Create a plane whose samples are tightly packed within each row.
    pub fn packed(data: Vec<u8>, row_stride: usize) -> Self {
        Self::new(data, row_stride, 1)
    }

    /// Bytes spanned by one row of `samples` samples, or `None` on overflow.
    pub fn row_len(&self, samples: usize) -> Option<usize> {
        if samples == 0 {
            return Some(0);
        }
        (samples - 1).checked_mul(self.pixel_stride)?.checked_add(1)
    }

    /// Smallest byte length that can hold `rows` rows of `samples` samples,
    /// or `None` if the geometry overflows `usize`.
    ///
    /// The last row does not need trailing padding; camera HALs routinely
    /// hand out planes whose final row stops at the last sample.
    pub fn min_len(&self, samples: usize, rows: usize) -> Option<usize> {
        if samples == 0 || rows == 0 {
            return Some(0);
        }
        (rows - 1)
            .checked_mul(self.row_stride)?
            .checked_add(self.row_len(samples)?)
    }
}

/// A 4:2:0 planar frame as delivered by the video source.
///
/// Luma is full resolution; each chroma plane holds ⌈width/2⌉ × ⌈height/2⌉
/// logical samples. The pipeline only borrows a frame for the duration of a
/// single call and never retains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanarFrame {
    pub width: u32,
    pub height: u32,
    pub y: Plane,
    pub u: Plane,
    pub v: Plane,
}

impl PlanarFrame {
    pub fn new(width: u32, height: u32, y: Plane, u: Plane, v: Plane) -> Self {
        Self {
            width,
            height,
            y,
            u,
            v,
        }
    }

    /// Total bytes held by the three planes.
    pub fn byte_len(&self) -> usize {
        self.y.data.len() + self.u.data.len() + self.v.data.len()
    }

    /// Logical chroma samples per row.
    pub fn chroma_width(&self) -> usize {
        chroma_dim(self.width)
    }

    /// Logical chroma rows.
    pub fn chroma_height(&self) -> usize {
        chroma_dim(self.height)
    }
}

/// Order of the two chroma bytes in each interleaved pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChromaOrder {
    /// V then U (NV21).
    #[default]
    Vu,
    /// U then V (NV12).
    Uv,
}

/// Luma plane followed by interleaved chroma pairs.
///
/// Produced by the ingestor and consumed by the colour converter within the
/// processing of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleavedYuv {
    pub width: u32,
    pub height: u32,
    pub order: ChromaOrder,
    pub data: Vec<u8>,
}

impl InterleavedYuv {
    /// Expected byte length for the given dimensions:
    /// `w*h + 2*⌈w/2⌉*⌈h/2⌉`.
    pub fn expected_len(width: u32, height: u32) -> usize {
        let luma = width as usize * height as usize;
        luma + 2 * chroma_dim(width) * chroma_dim(height)
    }

    /// Split into the luma plane and the interleaved chroma plane.
    pub fn planes(&self) -> (&[u8], &[u8]) {
        let luma = self.width as usize * self.height as usize;
        self.data.split_at(luma.min(self.data.len()))
    }
}

/// One packed 8-bit RGBA sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque colour.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }
}

/// A displayable RGBA raster, row-major with no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Raster {
    /// Wrap a pixel vector, checking that it holds exactly `width * height` samples.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(PipelineError::Format(format!(
                "raster {width}x{height} needs {expected} pixels, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build a raster from pixels the caller has already sized.
    pub(crate) fn from_parts(width: u32, height: u32, pixels: Vec<Rgba>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A raster with every pixel set to `pixel`.
    pub fn filled(width: u32, height: u32, pixel: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<Rgba> {
        self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Packed `R,G,B,A` bytes without copying.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Drop the alpha channel, producing packed RGB24.
    pub fn to_rgb24(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixels.len() * 3);
        for px in &self.pixels {
            rgb.extend_from_slice(&[px.r, px.g, px.b]);
        }
        rgb
    }
}

/// Number of chroma samples covering `luma` samples at 2:1 subsampling.
pub(crate) fn chroma_dim(luma: u32) -> usize {
    (luma as usize).div_ceil(2)
}
