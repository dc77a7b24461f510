//! Watermark module: the "last processed time" boundary between runs.
//!
//! ## Lifecycle
//!
//! ```text
//! load() → Watermark → poll run advances a candidate → save(candidate)
//! ```
//!
//! `save` is only called after a fully successful run, so an interrupted run
//! retries from the previous value.

pub mod store;
pub mod types;

pub use store::{FileWatermarkStore, MemoryWatermarkStore, WatermarkStore};
pub use types::{Watermark, DEFAULT_LOOKBACK_HOURS, WATERMARK_FORMAT};
