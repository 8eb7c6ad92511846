// Preview delivery: keep-only-latest frame intake and display sinks.

pub mod capture;
pub mod sink;
