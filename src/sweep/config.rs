use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::drivers::ScopeError;

/// Width of the visible x-axis. Plotted x values live in `[0, width)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeDomain(f64);
impl TimeDomain {
    pub fn new(width: f64) -> Result<Self, ScopeError> {
        if !width.is_finite() || width <= 0.0 {
            return Err(ScopeError::InvalidConfig(format!(
                "time domain must be a positive finite number, got {width}"
            )));
        }
        Ok(Self(width))
    }
    pub fn width(&self) -> f64 {
        self.0
    }
    /// Maps a raw timestamp onto the sweeping axis.
    pub fn wrap(&self, x: f64) -> f64 {
        let r = x.rem_euclid(self.0);
        // rem_euclid rounds tiny negative inputs up to exactly the width
        if r >= self.0 {
            0.0
        } else {
            r
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum YScale {
    /// Start from `initial` and grow to include every plotted value. Never shrinks.
    Expansion { initial: (f64, f64) },
    Fixed { min: f64, max: f64 },
}
impl Default for YScale {
    fn default() -> Self {
        YScale::Expansion {
            initial: (-1.0, 1.0),
        }
    }
}
impl YScale {
    pub fn initial_range(&self) -> (f64, f64) {
        match *self {
            YScale::Expansion { initial } => initial,
            YScale::Fixed { min, max } => (min, max),
        }
    }
}
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Width of the x-axis, in milliseconds.
    pub time_domain: f64,
    pub channels: usize,
    /// Samples per second produced by the synthetic generator.
    pub sample_rate: f64,
    pub y_scale: YScale,
    /// Reuse the previous value for non-numeric entries of a replicated payload.
    pub hold_last_value: bool,
    pub max_event_gap_ms: f64,
    pub live_address: String,
}
impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            time_domain: 5000.0,
            channels: 1,
            sample_rate: 44_000.0,
            y_scale: YScale::default(),
            hold_last_value: false,
            max_event_gap_ms: 2000.0,
            live_address: "127.0.0.1:5049".to_owned(),
        }
    }
}
impl ScopeConfig {
    pub fn validate(&self) -> Result<(), ScopeError> {
        TimeDomain::new(self.time_domain)?;
        if self.channels == 0 {
            return Err(ScopeError::InvalidConfig(
                "at least one channel is required".into(),
            ));
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ScopeError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !self.max_event_gap_ms.is_finite() || self.max_event_gap_ms <= 0.0 {
            return Err(ScopeError::InvalidConfig(format!(
                "max event gap must be positive, got {}",
                self.max_event_gap_ms
            )));
        }
        let (min, max) = self.y_scale.initial_range();
        if !(min < max) {
            return Err(ScopeError::InvalidConfig(format!(
                "y range must satisfy min < max, got ({min}, {max})"
            )));
        }
        Ok(())
    }
    pub fn time_domain(&self) -> Result<TimeDomain, ScopeError> {
        TimeDomain::new(self.time_domain)
    }
    pub fn from_json_str(text: &str) -> Result<Self, ScopeError> {
        let config: ScopeConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }
}
