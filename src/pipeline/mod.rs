// Pipeline controller. Ingests, converts, differences and rotates one frame at a time.

pub mod config;

use crate::convert::color::convert;
use crate::convert::ingest::ingest;
use crate::delta::Differencer;
use crate::diagnostics::rate::RateMonitor;
use crate::frame::error::Result;
use crate::frame::{PlanarFrame, Raster};
use crate::orient::{rotate, Rotation};

use self::config::PipelineConfig;

/// Mutable state carried between frames of one video session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineState {
    previous: Option<Raster>,
    rate: RateMonitor,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last converted (undifferenced) raster, if any.
    pub fn previous(&self) -> Option<&Raster> {
        self.previous.as_ref()
    }

    pub fn rate(&self) -> &RateMonitor {
        &self.rate
    }

    /// Drop the retained raster and zero the rate counters.
    pub fn clear(&mut self) {
        self.previous = None;
        self.rate.reset();
    }
}

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFrame {
    /// Delta raster in display orientation.
    pub raster: Raster,
    /// Frames counted in the window that just closed, if one closed.
    pub fps: Option<u32>,
}

/// Runs frames through the pipeline and owns the state between them.
///
/// Not safe for concurrent use: callers confine a controller to one thread
/// or serialise access to it.
#[derive(Debug)]
pub struct PipelineController {
    config: PipelineConfig,
    differ: Differencer,
    state: PipelineState,
}

impl PipelineController {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_state(config, PipelineState::new())
    }

    /// Build a controller around existing state.
    pub fn with_state(config: PipelineConfig, state: PipelineState) -> Self {
        tracing::debug!(?config, "pipeline controller created");
        Self {
            differ: Differencer::new(config.diff_policy, config.sampling),
            config,
            state,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Process one frame: ingest, convert, difference against the previous
    /// frame, then rotate by `rotation_degrees` clockwise.
    ///
    /// All fallible work happens before the state is touched, so an error
    /// leaves the retained raster and rate counters exactly as they were.
    /// The converted raster, not the delta, becomes the next baseline.
    pub fn process_frame(
        &mut self,
        frame: &PlanarFrame,
        rotation_degrees: i32,
        now_ms: u64,
    ) -> Result<ProcessedFrame> {
        let rotation = Rotation::try_from(rotation_degrees)?;
        let yuv = ingest(frame, self.config.chroma_order)?;
        let current = convert(&yuv, self.config.color_range, self.config.parallel)?;

        let delta = self.differ.diff(&current, self.state.previous.as_ref());
        let raster = rotate(delta, rotation);

        let fps = self.state.rate.on_frame(now_ms);
        self.state.previous = Some(current);

        Ok(ProcessedFrame { raster, fps })
    }

    /// Forget the previous frame and rate window. Call when the video source restarts.
    pub fn reset(&mut self) {
        self.state.clear();
        tracing::debug!("pipeline state reset");
    }
}
