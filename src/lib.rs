//! Real-time frame-delta pipeline for camera previews.
//!
//! Planar YUV frames are ingested, converted to RGBA, differenced against
//! the previous frame, rotated into display orientation and handed to a
//! display sink. [`PipelineController`] is the synchronous core;
//! [`PreviewSession`] wraps it in a worker thread with a keep-only-latest
//! intake for live sources.

pub mod convert;
pub mod delta;
pub mod diagnostics;
pub mod frame;
pub mod orient;
pub mod pipeline;
pub mod preview;

pub use delta::{DiffPolicy, DiffSampling, Differencer};
pub use frame::error::{PipelineError, Result};
pub use frame::{ChromaOrder, InterleavedYuv, PlanarFrame, Plane, Raster, Rgba};
pub use orient::Rotation;
pub use pipeline::config::{ConfigError, PipelineConfig};
pub use pipeline::{PipelineController, PipelineState, ProcessedFrame};
pub use preview::capture::{PreviewSession, SourceFrame};
pub use preview::sink::{DisplaySink, RasterBuffer};
