use std::time::Instant;

use log::{debug, warn};
use serde_json::Value;

use super::{
    config::{ScopeConfig, TimeDomain},
    fanout::ChannelFanout,
    sample::Sample,
    window::{SweepOutcome, SweepWindow},
};
use crate::drivers::ScopeError;

/// Counters for observing the scope from tests and the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub payloads: u64,
    pub rejected_payloads: u64,
    pub wraps: u64,
    pub overflow_resets: u64,
}

type OverflowHook = Box<dyn FnMut(usize, usize) + Send>;

/// All channels of one sweeping display plus the fanout feeding them.
pub struct SweepScope {
    domain: TimeDomain,
    channels: Vec<SweepWindow>,
    fanout: ChannelFanout,
    started_at: Instant,
    diagnostics: Diagnostics,
    overflow_hook: Option<OverflowHook>,
}
impl SweepScope {
    pub fn new(config: &ScopeConfig) -> Result<Self, ScopeError> {
        config.validate()?;
        let domain = config.time_domain()?;
        let channels = (0..config.channels)
            .map(|_| SweepWindow::new(domain, config.y_scale))
            .collect();
        Ok(Self {
            domain,
            channels,
            fanout: ChannelFanout::new(
                config.channels,
                config.max_event_gap_ms,
                config.hold_last_value,
                0.0,
            ),
            started_at: Instant::now(),
            diagnostics: Diagnostics::default(),
            overflow_hook: None,
        })
    }
    pub fn domain(&self) -> TimeDomain {
        self.domain
    }
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
    pub fn channel(&self, index: usize) -> Option<&SweepWindow> {
        self.channels.get(index)
    }
    pub fn channels(&self) -> &[SweepWindow] {
        &self.channels
    }
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }
    /// Called with `(channel, wraps)` whenever a batch is dropped for spanning several sweeps.
    pub fn set_overflow_hook(&mut self, hook: impl FnMut(usize, usize) + Send + 'static) {
        self.overflow_hook = Some(Box::new(hook));
    }
    /// Handles one inbound event using the wall clock since construction.
    pub fn on_message(&mut self, payload: &Value) -> Result<Vec<SweepOutcome>, ScopeError> {
        let now_ms = self.started_at.elapsed().as_secs_f64() * 1000.0;
        self.on_message_at(payload, now_ms)
    }
    /// Handles one inbound event stamped with the instant it arrived, which may
    /// be well before the event is applied.
    pub fn on_message_received(
        &mut self,
        payload: &Value,
        received_at: Instant,
    ) -> Result<Vec<SweepOutcome>, ScopeError> {
        let now_ms = received_at
            .saturating_duration_since(self.started_at)
            .as_secs_f64()
            * 1000.0;
        self.on_message_at(payload, now_ms)
    }
    /// Handles one inbound event received at `now_ms`. A rejected payload leaves every channel untouched.
    pub fn on_message_at(
        &mut self,
        payload: &Value,
        now_ms: f64,
    ) -> Result<Vec<SweepOutcome>, ScopeError> {
        self.diagnostics.payloads += 1;
        let batches = match self.fanout.split(payload, now_ms) {
            Ok(batches) => batches,
            Err(err) => {
                self.diagnostics.rejected_payloads += 1;
                warn!("dropping inbound payload: {err}");
                return Err(err);
            }
        };
        let outcomes = batches
            .iter()
            .enumerate()
            .map(|(index, batch)| self.apply_to(index, batch))
            .collect();
        Ok(outcomes)
    }
    pub fn apply_channel(
        &mut self,
        index: usize,
        batch: &[Sample],
    ) -> Result<SweepOutcome, ScopeError> {
        if index >= self.channels.len() {
            return Err(ScopeError::ChannelOutOfRange {
                index,
                count: self.channels.len(),
            });
        }
        Ok(self.apply_to(index, batch))
    }
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
        debug!("reset {} channels", self.channels.len());
    }
    fn apply_to(&mut self, index: usize, batch: &[Sample]) -> SweepOutcome {
        let outcome = self.channels[index].apply(batch);
        match outcome {
            SweepOutcome::Wrapped { .. } => self.diagnostics.wraps += 1,
            SweepOutcome::Overflow { wraps } => {
                self.diagnostics.overflow_resets += 1;
                debug!("channel {index}: {wraps} wraps in one batch, buffers cleared");
                if let Some(hook) = self.overflow_hook.as_mut() {
                    hook(index, wraps);
                }
            }
            SweepOutcome::Idle | SweepOutcome::Appended { .. } => {}
        }
        outcome
    }
}
#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    fn scope(channels: usize) -> SweepScope {
        let config = ScopeConfig {
            channels,
            ..ScopeConfig::default()
        };
        SweepScope::new(&config).unwrap()
    }
    fn points(xs: &[f64]) -> Value {
        Value::Array(xs.iter().map(|&x| json!({ "x": x, "y": 1.0 })).collect())
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ScopeConfig {
            channels: 0,
            ..ScopeConfig::default()
        };
        assert!(SweepScope::new(&config).is_err());
    }

    #[test]
    fn channels_are_independent() {
        let mut scope = scope(2);
        scope
            .on_message_at(&json!([points(&[100.0, 200.0]), points(&[4000.0])]), 0.0)
            .unwrap();
        let b_before = (
            scope.channel(1).unwrap().head(),
            scope.channel(1).unwrap().left().clone(),
            scope.channel(1).unwrap().right().clone(),
            *scope.channel(1).unwrap().occluder(),
        );
        scope
            .apply_channel(0, &[Sample::new(4900.0, 1.0), Sample::new(5100.0, 1.0)])
            .unwrap();
        let b = scope.channel(1).unwrap();
        assert_eq!(b.head(), b_before.0);
        assert_eq!(b.left(), &b_before.1);
        assert_eq!(b.right(), &b_before.2);
        assert_eq!(b.occluder(), &b_before.3);
        assert_eq!(scope.channel(0).unwrap().head(), 100.0);
    }

    #[test]
    fn malformed_payload_leaves_state_unchanged() {
        let mut scope = scope(1);
        scope.on_message_at(&json!([points(&[10.0, 20.0])]), 0.0).unwrap();
        let err = scope.on_message_at(&json!({ "oops": true }), 5.0).unwrap_err();
        assert!(matches!(err, ScopeError::MalformedPayload(_)));
        let ch = scope.channel(0).unwrap();
        assert_eq!(ch.head(), 20.0);
        assert_eq!(ch.left().len(), 2);
        assert_eq!(scope.diagnostics().rejected_payloads, 1);
        assert_eq!(scope.diagnostics().payloads, 2);
    }

    #[test]
    fn replicated_payload_reaches_every_channel() {
        let mut scope = scope(3);
        let outcomes = scope.on_message_at(&json!([1.0, 2.0]), 100.0).unwrap();
        assert_eq!(outcomes, vec![SweepOutcome::Appended { count: 2 }; 3]);
        for ch in scope.channels() {
            assert_eq!(ch.head(), 100.0);
            assert_eq!(ch.left().len(), 2);
        }
    }

    #[test]
    fn overflow_is_counted_and_reported() {
        let mut scope = scope(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scope.set_overflow_hook(move |channel, wraps| {
            sink.lock().unwrap().push((channel, wraps));
        });
        scope
            .on_message_at(&json!([points(&[100.0, 4990.0, 50.0, 4990.0, 50.0])]), 0.0)
            .unwrap();
        assert_eq!(scope.diagnostics().overflow_resets, 1);
        assert_eq!(seen.lock().unwrap().as_slice(), &[(0, 2)]);
        let ch = scope.channel(0).unwrap();
        assert!(ch.left().is_empty() && ch.right().is_empty());
        assert_eq!(ch.head(), 50.0);
    }

    #[test]
    fn continuous_stream_wraps_once_per_sweep() {
        let mut scope = scope(1);
        // 16 ms ticks of 8 values for 12 s of stream over a 5 s domain.
        for tick in 1..=750 {
            let values: Vec<f64> = (0..8).map(|i| (tick * 8 + i) as f64).collect();
            scope.on_message_at(&json!(values), tick as f64 * 16.0).unwrap();
        }
        let diag = scope.diagnostics();
        assert_eq!(diag.wraps, 2);
        assert_eq!(diag.overflow_resets, 0);
        let ch = scope.channel(0).unwrap();
        assert!((ch.head() - 2000.0).abs() < 1e-6);
        assert!(ch.right().points().iter().all(|s| s.x < 5000.0));
    }

    #[test]
    fn payloads_applied_together_keep_their_arrival_spacing() {
        use std::time::Duration;
        let mut scope = scope(1);
        let start = scope.started_at;
        let tick = |ms: u64| start + Duration::from_millis(ms);
        // The second and third payloads arrived one tick apart but are applied back to back.
        for (value, ms) in [(1.0, 16), (2.0, 32), (3.0, 48)] {
            scope.on_message_received(&json!(vec![value; 8]), tick(ms)).unwrap();
        }
        let left = scope.channel(0).unwrap().left().points();
        let last: Vec<f64> = left[16..].iter().map(|s| s.x).collect();
        assert_eq!(last.len(), 8);
        assert!((last[0] - 34.0).abs() < 1e-6);
        assert!((last[7] - 48.0).abs() < 1e-6);
    }

    #[test]
    fn queued_rejection_is_returned_to_the_caller() {
        let mut scope = scope(1);
        let received = scope.started_at;
        let err = scope
            .on_message_received(&json!("not an array"), received)
            .unwrap_err();
        assert!(matches!(err, ScopeError::MalformedPayload(_)));
        assert!(err.to_string().contains("array"));
        assert_eq!(scope.diagnostics().rejected_payloads, 1);
    }

    #[test]
    fn out_of_range_channel_is_an_error() {
        let mut scope = scope(1);
        assert!(matches!(
            scope.apply_channel(3, &[Sample::new(1.0, 1.0)]),
            Err(ScopeError::ChannelOutOfRange { index: 3, count: 1 })
        ));
    }

    #[test]
    fn reset_clears_all_channels() {
        let mut scope = scope(2);
        scope.on_message_at(&json!([3.0, 4.0]), 250.0).unwrap();
        scope.reset();
        for ch in scope.channels() {
            assert_eq!(ch.head(), 0.0);
            assert!(ch.left().is_empty());
        }
    }
}
