//! Sweeping oscilloscope core: timestamped samples are drawn onto a fixed
//! time window that wraps, with each new sweep overdrawing the previous one.
//!
//! - `sweep`: per-channel sweep state, batch classification, occluder and fanout
//! - `drivers`: payload sources, the source-to-scope pipeline, PNG snapshots and errors
pub mod drivers;
pub mod sweep;
pub use drivers::{ScopeError, SweepPipeline};
pub use sweep::{Sample, ScopeConfig, SweepScope, SweepWindow};
