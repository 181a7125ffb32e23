use log::warn;
use serde::Deserialize;
use serde_json::Value;

use super::sample::Sample;
use crate::drivers::ScopeError;

/// Splits inbound payloads into one batch per channel.
///
/// Two payload shapes are accepted:
/// - `[y0, y1, ...]`: values are spread evenly over the time elapsed since the
///   previous event and the same sample goes to every channel;
/// - `[[{x, y}, ...], ...]`: one array per channel, passed through as is.
#[derive(Clone, Debug)]
pub struct ChannelFanout {
    channels: usize,
    hold_last_value: bool,
    max_gap_ms: f64,
    /// Wall clock of the previous accepted event.
    prev_event_ms: f64,
    last_value: f64,
}
impl ChannelFanout {
    pub fn new(channels: usize, max_gap_ms: f64, hold_last_value: bool, start_ms: f64) -> Self {
        Self {
            channels,
            hold_last_value,
            max_gap_ms,
            prev_event_ms: start_ms,
            last_value: 0.0,
        }
    }
    pub fn channels(&self) -> usize {
        self.channels
    }
    /// Converts `payload` received at `now_ms` into per-channel batches.
    ///
    /// Nothing is updated when the payload is rejected.
    pub fn split(&mut self, payload: &Value, now_ms: f64) -> Result<Vec<Vec<Sample>>, ScopeError> {
        let Value::Array(items) = payload else {
            return Err(ScopeError::MalformedPayload(format!(
                "expected an array, got {}",
                kind_of(payload)
            )));
        };
        let batches = if items.iter().any(Value::is_array) {
            self.split_per_channel(items)?
        } else {
            self.split_replicated(items, now_ms)?
        };
        self.prev_event_ms = now_ms;
        Ok(batches)
    }
    fn split_per_channel(&self, items: &[Value]) -> Result<Vec<Vec<Sample>>, ScopeError> {
        if items.len() != self.channels {
            warn!(
                "payload carries {} channel arrays, scope has {} channels",
                items.len(),
                self.channels
            );
        }
        let mut batches = vec![Vec::new(); self.channels];
        for (idx, item) in items.iter().enumerate() {
            let points = Vec::<Sample>::deserialize(item).map_err(|e| {
                ScopeError::MalformedPayload(format!("channel {idx}: {e}"))
            })?;
            if let Some(batch) = batches.get_mut(idx) {
                *batch = points;
            }
        }
        Ok(batches)
    }
    fn split_replicated(
        &mut self,
        items: &[Value],
        now_ms: f64,
    ) -> Result<Vec<Vec<Sample>>, ScopeError> {
        let mut last_value = self.last_value;
        let mut values = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            match item.as_f64() {
                Some(v) => last_value = v,
                None if self.hold_last_value => {}
                None => {
                    return Err(ScopeError::MalformedPayload(format!(
                        "entry {idx} is {}, expected a number",
                        kind_of(item)
                    )))
                }
            }
            values.push(last_value);
        }
        let delta = (now_ms - self.prev_event_ms).clamp(0.0, self.max_gap_ms);
        let count = values.len() as f64;
        let start = self.prev_event_ms;
        let samples: Vec<Sample> = values
            .iter()
            .enumerate()
            .map(|(i, &y)| Sample::new(start + (i as f64 + 1.0) / count * delta, y))
            .collect();
        self.last_value = last_value;
        Ok(vec![samples; self.channels])
    }
}
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
