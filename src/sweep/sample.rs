use serde::{Deserialize, Serialize};
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp in the time-domain unit. Raw on input, wrapped once plotted.
    pub x: f64,
    pub y: f64,
}
impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
/// Axis-aligned rectangle in plot coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}
