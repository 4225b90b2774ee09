//! # Middleware
//!
//! - `metrics`: per-route request counters and latency histogram.

pub mod metrics;
