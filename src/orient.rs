use std::fmt;

use crate::frame::error::PipelineError;
use crate::frame::{Raster, Rgba};

/// Clockwise rotation applied to bring a sensor raster into display orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotation in degrees (0, 90, 180 or 270).
    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = PipelineError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(PipelineError::InvalidArgument(format!(
                "rotation must be 0, 90, 180 or 270 degrees, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Rotate a raster clockwise. `Deg0` hands the input back without copying.
pub fn rotate(raster: Raster, rotation: Rotation) -> Raster {
    let width = raster.width() as usize;
    let height = raster.height() as usize;

    match rotation {
        Rotation::Deg0 => raster,
        Rotation::Deg180 => {
            let mut pixels = raster.into_pixels();
            pixels.reverse();
            Raster::from_parts(width as u32, height as u32, pixels)
        }
        Rotation::Deg90 | Rotation::Deg270 => {
            let src = raster.pixels();
            let mut pixels: Vec<Rgba> = Vec::with_capacity(src.len());
            // Output is `height` wide and `width` tall.
            for out_y in 0..width {
                for out_x in 0..height {
                    let (x, y) = if rotation == Rotation::Deg90 {
                        (out_y, height - 1 - out_x)
                    } else {
                        (width - 1 - out_y, out_x)
                    };
                    pixels.push(src[y * width + x]);
                }
            }
            Raster::from_parts(height as u32, width as u32, pixels)
        }
    }
}
