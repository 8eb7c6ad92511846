use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::frame::error::{PipelineError, Result};
use crate::frame::{Raster, Rgba};

/// Receives pipeline output on the worker thread.
///
/// Implementations marshal rasters to whatever context owns the display.
pub trait DisplaySink: Send + Sync {
    /// Hand over a finished raster.
    fn present(&self, raster: Raster);

    /// Called at most once per second with the latest FPS reading.
    fn report_fps(&self, _fps: u32) {}
}

/// Thread-safe ring buffer of presented rasters.
///
/// Stores up to `capacity` rasters, overwriting the oldest when full.
/// Rasters are wrapped in `Arc` so readers get a cheap reference-counted
/// pointer instead of cloning the pixel buffer.
pub struct RasterBuffer {
    rasters: Mutex<Vec<Option<Arc<Raster>>>>,
    capacity: usize,
    write_idx: Mutex<usize>,
    /// Monotonic counter incremented on each push.
    sequence: AtomicU64,
    /// Latest FPS reading, 0 until the first window closes.
    fps: AtomicU32,
}

impl RasterBuffer {
    /// Create a new ring buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let rasters = (0..capacity).map(|_| None).collect();
        Self {
            rasters: Mutex::new(rasters),
            capacity,
            write_idx: Mutex::new(0),
            sequence: AtomicU64::new(0),
            fps: AtomicU32::new(0),
        }
    }

    /// Push a raster, overwriting the oldest if full.
    pub fn push(&self, raster: Raster) {
        if self.capacity == 0 {
            return;
        }
        let mut rasters = self.rasters.lock();
        let mut idx = self.write_idx.lock();
        rasters[*idx] = Some(Arc::new(raster));
        *idx = (*idx + 1) % self.capacity;
        self.sequence.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of rasters pushed so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Most recently pushed raster, if any.
    pub fn latest(&self) -> Option<Arc<Raster>> {
        if self.capacity == 0 {
            return None;
        }
        let rasters = self.rasters.lock();
        let idx = self.write_idx.lock();
        let latest_idx = if *idx == 0 {
            self.capacity - 1
        } else {
            *idx - 1
        };
        rasters[latest_idx].clone()
    }

    /// Latest FPS reading, or `None` before the first window closes.
    pub fn fps(&self) -> Option<u32> {
        match self.fps.load(Ordering::Relaxed) {
            0 => None,
            fps => Some(fps),
        }
    }
}

impl DisplaySink for RasterBuffer {
    fn present(&self, raster: Raster) {
        self.push(raster);
    }

    fn report_fps(&self, fps: u32) {
        self.fps.store(fps, Ordering::Relaxed);
    }
}

/// Downscale a raster to fit within `max_width` x `max_height`, keeping
/// its aspect ratio. Rasters that already fit are returned unchanged.
///
/// Uses `fast_image_resize` for SIMD-accelerated resizing.
pub fn scale_to_fit(raster: Raster, max_width: u32, max_height: u32) -> Result<Raster> {
    use fast_image_resize as fr;
    use fr::images::Image;

    if raster.width() <= max_width && raster.height() <= max_height {
        return Ok(raster);
    }
    if max_width == 0 || max_height == 0 {
        return Err(PipelineError::InvalidArgument(format!(
            "cannot fit a raster into {max_width}x{max_height}"
        )));
    }

    let scale = f64::min(
        max_width as f64 / raster.width() as f64,
        max_height as f64 / raster.height() as f64,
    );
    let width = ((raster.width() as f64 * scale).round() as u32).clamp(1, max_width);
    let height = ((raster.height() as f64 * scale).round() as u32).clamp(1, max_height);

    let src_image = Image::from_vec_u8(
        raster.width(),
        raster.height(),
        raster.as_bytes().to_vec(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| PipelineError::Format(format!("resize source: {e}")))?;
    let mut dst_image = Image::new(width, height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, None)
        .map_err(|e| PipelineError::Format(format!("resize failed: {e}")))?;

    let bytes = dst_image.into_vec();
    let pixels: Vec<Rgba> = bytemuck::cast_slice(&bytes).to_vec();
    Raster::new(width, height, pixels)
}
