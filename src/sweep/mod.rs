pub mod classifier;
pub mod config;
pub mod erase;
pub mod fanout;
pub mod sample;
pub mod scope;
pub mod window;
pub use classifier::{classify, ClassifiedBatch, SweepPlan};
pub use config::{ScopeConfig, TimeDomain, YScale};
pub use erase::occluder_bounds;
pub use fanout::ChannelFanout;
pub use sample::{Rect, Sample};
pub use scope::{Diagnostics, SweepScope};
pub use window::{
    DrawableRect, DrawableSeries, Layer, Occluder, SweepBuffer, SweepOutcome, SweepWindow,
};
