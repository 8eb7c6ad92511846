// Conversion stages: planar ingest and YUV to RGBA.

pub mod color;
pub mod ingest;
