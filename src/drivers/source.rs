use std::collections::VecDeque;
use std::f64::consts::PI;
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::Value;

use crate::drivers::ScopeError;

/// Something that yields inbound payloads on demand. `Ok(None)` means nothing is ready yet.
pub trait PayloadSource {
    fn next_payload(&mut self) -> Result<Option<Value>, ScopeError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<Value>,
}
impl ManualSource {
    pub fn new(payloads: impl IntoIterator<Item = Value>) -> Self {
        Self {
            queue: payloads.into_iter().collect(),
        }
    }
}
impl PayloadSource for ManualSource {
    fn next_payload(&mut self) -> Result<Option<Value>, ScopeError> {
        Ok(self.queue.pop_front())
    }
}

/// Local test signal: a sine with uniform noise, sized by the sample rate.
pub struct SyntheticSource {
    sample_rate: f64,
    max_gap_ms: f64,
    freq_hz: f64,
    amplitude: f64,
    noise: f64,
    /// Fraction of a sample carried over to the next tick.
    carry: f64,
    t_secs: f64,
    last_tick: Instant,
    rng: StdRng,
}
impl SyntheticSource {
    pub fn new(sample_rate: f64, max_gap_ms: f64) -> Self {
        Self::with_rng(sample_rate, max_gap_ms, StdRng::from_entropy())
    }
    pub fn with_rng(sample_rate: f64, max_gap_ms: f64, rng: StdRng) -> Self {
        Self {
            sample_rate,
            max_gap_ms,
            freq_hz: 1.2,
            amplitude: 1.0,
            noise: 0.05,
            carry: 0.0,
            t_secs: 0.0,
            last_tick: Instant::now(),
            rng,
        }
    }
    /// Values produced over `elapsed_ms`, clamped to the maximum event gap.
    pub fn generate(&mut self, elapsed_ms: f64) -> Vec<f64> {
        let elapsed_ms = elapsed_ms.clamp(0.0, self.max_gap_ms);
        let wanted = elapsed_ms * self.sample_rate / 1000.0 + self.carry;
        let count = wanted.floor();
        self.carry = wanted - count;
        let dt = 1.0 / self.sample_rate;
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count as usize {
            self.t_secs += dt;
            let base = (2.0 * PI * self.freq_hz * self.t_secs).sin() * self.amplitude;
            let jitter = if self.noise > 0.0 {
                self.rng.gen_range(-self.noise..self.noise)
            } else {
                0.0
            };
            values.push(base + jitter);
        }
        values
    }
}
impl PayloadSource for SyntheticSource {
    fn next_payload(&mut self) -> Result<Option<Value>, ScopeError> {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_tick).as_secs_f64() * 1000.0;
        self.last_tick = now;
        let values = self.generate(elapsed_ms);
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(Value::from(values)))
    }
}

const MIN_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_millis(20);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Line-delimited JSON over TCP. Reconnects on its own after the peer goes away.
pub struct LiveSource {
    address: String,
    reader: Option<BufReader<TcpStream>>,
    pending: Vec<u8>,
    backoff: Duration,
    retry_at: Option<Instant>,
}
impl LiveSource {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            reader: None,
            pending: Vec::new(),
            backoff: MIN_BACKOFF,
            retry_at: None,
        }
    }
    pub fn is_connected(&self) -> bool {
        self.reader.is_some()
    }
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.get_ref().shutdown(Shutdown::Both).ok();
            info!("closed live connection to {}", self.address);
        }
        self.pending.clear();
    }
    fn ensure_connected(&mut self) -> bool {
        if self.reader.is_some() {
            return true;
        }
        if self.retry_at.is_some_and(|at| Instant::now() < at) {
            return false;
        }
        match self.connect() {
            Ok(stream) => {
                info!("connected to {}", self.address);
                self.reader = Some(BufReader::new(stream));
                self.backoff = MIN_BACKOFF;
                self.retry_at = None;
                true
            }
            Err(err) => {
                warn!(
                    "connect to {} failed: {err}; retrying in {:?}",
                    self.address, self.backoff
                );
                self.schedule_retry();
                false
            }
        }
    }
    /// Tries every resolved address, each bounded by `CONNECT_TIMEOUT`, so an
    /// unreachable peer never blocks the caller for the OS default.
    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in self.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => return Self::configure(stream),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(ErrorKind::NotFound, "address resolved to nothing")
        }))
    }
    fn configure(stream: TcpStream) -> io::Result<TcpStream> {
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
    fn schedule_retry(&mut self) {
        self.retry_at = Some(Instant::now() + self.backoff);
        self.backoff = (self.backoff * 2).min(MAX_BACKOFF);
    }
    fn drop_connection(&mut self, reason: &str) {
        warn!("lost connection to {}: {reason}", self.address);
        self.reader = None;
        self.pending.clear();
        self.schedule_retry();
    }
}
impl PayloadSource for LiveSource {
    fn next_payload(&mut self) -> Result<Option<Value>, ScopeError> {
        if !self.ensure_connected() {
            return Ok(None);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        match reader.read_until(b'\n', &mut self.pending) {
            Ok(0) => {
                self.drop_connection("closed by peer");
                Ok(None)
            }
            Ok(_) if self.pending.ends_with(b"\n") => {
                let line = std::mem::take(&mut self.pending);
                let text = String::from_utf8_lossy(&line);
                if text.trim().is_empty() {
                    return Ok(None);
                }
                Ok(Some(serde_json::from_str(text.trim())?))
            }
            // Partial line at EOF; keep it until the rest arrives.
            Ok(_) => Ok(None),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(err) => {
                self.drop_connection(&err.to_string());
                Ok(None)
            }
        }
    }
}
impl Drop for LiveSource {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    use serde_json::json;

    use super::*;

    #[test]
    fn unreachable_peer_gives_up_quickly() {
        // Non-routable; without a connect timeout this hangs for the OS default.
        let mut source = LiveSource::new("10.255.255.1:9");
        let started = Instant::now();
        assert_eq!(source.next_payload().unwrap(), None);
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!source.is_connected());
        assert!(source.retry_at.is_some());
    }

    #[test]
    fn manual_source_replays_in_order() {
        let mut source = ManualSource::new(vec![json!([1.0]), json!([2.0])]);
        assert_eq!(source.next_payload().unwrap(), Some(json!([1.0])));
        assert_eq!(source.next_payload().unwrap(), Some(json!([2.0])));
        assert_eq!(source.next_payload().unwrap(), None);
    }

    #[test]
    fn synthetic_batch_size_follows_sample_rate() {
        let mut source = SyntheticSource::with_rng(1000.0, 2000.0, StdRng::seed_from_u64(7));
        assert_eq!(source.generate(16.0).len(), 16);
        // 0.5 samples carried over twice make one extra sample.
        assert_eq!(source.generate(0.5).len(), 0);
        assert_eq!(source.generate(0.5).len(), 1);
    }

    #[test]
    fn synthetic_gap_is_clamped() {
        let mut source = SyntheticSource::with_rng(100.0, 2000.0, StdRng::seed_from_u64(1));
        assert_eq!(source.generate(60_000.0).len(), 200);
        assert!(source.generate(-5.0).is_empty());
    }

    #[test]
    fn synthetic_values_stay_near_amplitude() {
        let mut source = SyntheticSource::with_rng(500.0, 2000.0, StdRng::seed_from_u64(3));
        let values = source.generate(1000.0);
        assert!(values.iter().all(|v| v.abs() <= 1.05 + 1e-9));
    }

    fn poll(source: &mut LiveSource) -> Option<Value> {
        for _ in 0..500 {
            if let Some(payload) = source.next_payload().unwrap() {
                return Some(payload);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn live_source_reads_lines_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = thread::spawn(move || {
            for round in 0..2 {
                let (mut stream, _) = listener.accept().unwrap();
                writeln!(stream, "[{round}.0, 1.5]").unwrap();
                stream.flush().unwrap();
            }
        });
        let mut source = LiveSource::new(address);
        assert_eq!(poll(&mut source), Some(json!([0.0, 1.5])));
        // First connection is closed by the server; the source dials again.
        assert_eq!(poll(&mut source), Some(json!([1.0, 1.5])));
        server.join().unwrap();
    }

    #[test]
    fn unreachable_address_backs_off() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        let mut source = LiveSource::new(address);
        assert_eq!(source.next_payload().unwrap(), None);
        assert!(!source.is_connected());
        assert!(source.retry_at.is_some());
        assert_eq!(source.backoff, MIN_BACKOFF * 2);
    }
}
