use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::frame::error::{PipelineError, Result};
use crate::frame::{chroma_dim, ChromaOrder, InterleavedYuv, Raster, Rgba};

/// Quantisation range of the incoming luma/chroma samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorRange {
    /// Samples use the whole 0-255 range (JFIF / camera sensor output).
    #[default]
    Full,
    /// Studio swing: luma 16-235, chroma 16-240.
    Limited,
}

/// Convert an interleaved 4:2:0 buffer into an opaque RGBA raster.
///
/// Each chroma pair is shared by a 2x2 block of luma samples. Uses BT.601
/// coefficients in fixed-point integer arithmetic (<<8). With `parallel`
/// set, rows are converted on the rayon pool.
pub fn convert(yuv: &InterleavedYuv, range: ColorRange, parallel: bool) -> Result<Raster> {
    let expected = InterleavedYuv::expected_len(yuv.width, yuv.height);
    if yuv.data.len() != expected {
        return Err(PipelineError::Format(format!(
            "interleaved buffer for {}x{} must be {expected} bytes, got {}",
            yuv.width,
            yuv.height,
            yuv.data.len()
        )));
    }

    let width = yuv.width as usize;
    let height = yuv.height as usize;
    if width == 0 || height == 0 {
        return Raster::new(yuv.width, yuv.height, Vec::new());
    }

    let (luma, chroma) = yuv.planes();
    let chroma_row_len = chroma_dim(yuv.width) * 2;
    let mut pixels = vec![Rgba::default(); width * height];

    let convert_row = |(row, out): (usize, &mut [Rgba])| {
        let luma_row = &luma[row * width..(row + 1) * width];
        let chroma_row = &chroma[(row / 2) * chroma_row_len..(row / 2 + 1) * chroma_row_len];
        for (col, px) in out.iter_mut().enumerate() {
            let pair = &chroma_row[(col / 2) * 2..(col / 2) * 2 + 2];
            let (u, v) = match yuv.order {
                ChromaOrder::Vu => (pair[1], pair[0]),
                ChromaOrder::Uv => (pair[0], pair[1]),
            };
            *px = yuv_to_rgba(luma_row[col], u, v, range);
        }
    };

    if parallel {
        pixels.par_chunks_mut(width).enumerate().for_each(convert_row);
    } else {
        pixels.chunks_mut(width).enumerate().for_each(convert_row);
    }

    Raster::new(yuv.width, yuv.height, pixels)
}

/// Convert one YUV sample to an opaque RGBA pixel.
#[inline]
pub fn yuv_to_rgba(y: u8, u: u8, v: u8, range: ColorRange) -> Rgba {
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    let (r, g, b) = match range {
        ColorRange::Full => {
            let y = y as i32 * 256;
            (
                (y + 359 * v) >> 8,
                (y - 88 * u - 183 * v) >> 8,
                (y + 454 * u) >> 8,
            )
        }
        ColorRange::Limited => {
            let y = (y as i32 - 16) * 298;
            (
                (y + 409 * v + 128) >> 8,
                (y - 100 * u - 208 * v + 128) >> 8,
                (y + 516 * u + 128) >> 8,
            )
        }
    };
    Rgba::opaque(clamp_channel(r), clamp_channel(g), clamp_channel(b))
}

fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
