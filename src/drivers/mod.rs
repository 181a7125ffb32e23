// src/drivers/mod.rs
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod source;
pub use error::ScopeError;
pub use pipeline::SweepPipeline;
pub use plot::{render_channel_png, render_scope_png, PlotStyle};
pub use source::{LiveSource, ManualSource, PayloadSource, SyntheticSource};
