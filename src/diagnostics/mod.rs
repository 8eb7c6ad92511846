// Throughput reporting: per-window FPS and session counters.

pub mod rate;
pub mod stats;
