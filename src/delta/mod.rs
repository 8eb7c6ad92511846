// Per-channel deltas between consecutive rasters.

use serde::{Deserialize, Serialize};

use crate::frame::{Raster, Rgba};

/// How a channel difference is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiffPolicy {
    /// `|current - previous|`, independent of frame order.
    #[default]
    Absolute,
    /// `current - previous`, negative results clamped to 0.
    ForwardSaturating,
}

/// Which pixels are differenced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiffSampling {
    /// Every pixel of the overlap.
    #[default]
    Full,
    /// Only pixels with even x and even y; the rest are opaque black.
    EveryOther,
}

/// Computes delta rasters under a fixed policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Differencer {
    policy: DiffPolicy,
    sampling: DiffSampling,
}

impl Differencer {
    pub fn new(policy: DiffPolicy, sampling: DiffSampling) -> Self {
        Self { policy, sampling }
    }

    /// Difference `current` against an optional baseline.
    ///
    /// Without a baseline (first frame) the result is a copy of `current`.
    /// The input is borrowed so the caller can keep it as the next baseline.
    pub fn diff(&self, current: &Raster, previous: Option<&Raster>) -> Raster {
        match previous {
            Some(previous) => self.difference(current, previous),
            None => current.clone(),
        }
    }

    /// Difference two rasters over their overlapping top-left rectangle.
    ///
    /// The output is sized to the overlap, never to the larger input. Alpha
    /// is the mean of both inputs' alpha.
    pub fn difference(&self, current: &Raster, previous: &Raster) -> Raster {
        let width = current.width().min(previous.width());
        let height = current.height().min(previous.height());
        let cur_stride = current.width() as usize;
        let prev_stride = previous.width() as usize;

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height as usize {
            let cur_row = &current.pixels()[y * cur_stride..y * cur_stride + width as usize];
            let prev_row = &previous.pixels()[y * prev_stride..y * prev_stride + width as usize];
            for (x, (c, p)) in cur_row.iter().zip(prev_row).enumerate() {
                let sampled = match self.sampling {
                    DiffSampling::Full => true,
                    DiffSampling::EveryOther => x % 2 == 0 && y % 2 == 0,
                };
                pixels.push(if sampled {
                    self.pixel_delta(*c, *p)
                } else {
                    Rgba::BLACK
                });
            }
        }

        Raster::from_parts(width, height, pixels)
    }

    fn pixel_delta(&self, current: Rgba, previous: Rgba) -> Rgba {
        let channel = |c: u8, p: u8| match self.policy {
            DiffPolicy::Absolute => c.abs_diff(p),
            DiffPolicy::ForwardSaturating => c.saturating_sub(p),
        };
        Rgba::new(
            channel(current.r, previous.r),
            channel(current.g, previous.g),
            channel(current.b, previous.b),
            ((current.a as u16 + previous.a as u16) / 2) as u8,
        )
    }
}
