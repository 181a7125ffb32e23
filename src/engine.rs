// src/engine.rs
use std::sync::mpsc::{Receiver, Sender, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use sweepscope::drivers::{LiveSource, PayloadSource, SyntheticSource};
use sweepscope::ScopeConfig;

use crate::types::*;

// 合成数据按显示刷新率出包
const SYNTHETIC_TICK: Duration = Duration::from_millis(16);
const IDLE_TICK: Duration = Duration::from_millis(50);
const LIVE_POLL: Duration = Duration::from_millis(2);

// 数据包队列上限；GUI 不取数据时（窗口最小化）多出的包直接丢弃，
// 恢复后由 SweepScope 的 overflow 处理时间跳变
pub const PAYLOAD_QUEUE: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Forwarded {
    Queued,
    Dropped,
    Closed,
}

pub fn forward_payload(tx_data: &SyncSender<InboundPayload>, inbound: InboundPayload) -> Forwarded {
    match tx_data.try_send(inbound) {
        Ok(()) => Forwarded::Queued,
        Err(TrySendError::Full(_)) => Forwarded::Dropped,
        Err(TrySendError::Disconnected(_)) => Forwarded::Closed,
    }
}

pub fn spawn_thread(
    tx: Sender<EngineMessage>,
    tx_data: SyncSender<InboundPayload>,
    rx_cmd: Receiver<GuiCommand>,
    config: ScopeConfig,
) -> JoinHandle<()> {
    thread::spawn(move || {
        tx.send(EngineMessage::Log("Acquisition engine ready.".to_owned())).ok();

        let mut mode = ConnectionMode::Synthetic;
        let mut source: Option<Box<dyn PayloadSource + Send>> = None;
        let mut is_streaming = false;
        let mut dropped: u64 = 0;

        'outer: loop {
            // 1. 处理 GUI 命令
            while let Ok(cmd) = rx_cmd.try_recv() {
                match cmd {
                    GuiCommand::Connect(requested) => {
                        if source.is_some() {
                            continue;
                        }
                        mode = requested;
                        let fresh: Box<dyn PayloadSource + Send> = match mode {
                            ConnectionMode::Synthetic => Box::new(SyntheticSource::new(
                                config.sample_rate,
                                config.max_event_gap_ms,
                            )),
                            ConnectionMode::Live => {
                                Box::new(LiveSource::new(config.live_address.clone()))
                            }
                        };
                        source = Some(fresh);
                        let text = match mode {
                            ConnectionMode::Synthetic => "Synthetic source attached".to_owned(),
                            ConnectionMode::Live => format!("Live source -> {}", config.live_address),
                        };
                        info!("{text}");
                        tx.send(EngineMessage::Log(text)).ok();
                        tx.send(EngineMessage::Status(true)).ok();
                    }
                    GuiCommand::Disconnect => {
                        // LiveSource 在 drop 时关闭连接
                        source = None;
                        is_streaming = false;
                        tx.send(EngineMessage::Status(false)).ok();
                    }
                    GuiCommand::StartStream => {
                        if source.is_some() {
                            is_streaming = true;
                            tx.send(EngineMessage::Log("Stream started".to_owned())).ok();
                        }
                    }
                    GuiCommand::StopStream => {
                        is_streaming = false;
                        tx.send(EngineMessage::Log("Stream stopped".to_owned())).ok();
                    }
                    GuiCommand::Shutdown => break 'outer,
                }
            }

            // 2. 数据流
            let Some(active) = source.as_mut().filter(|_| is_streaming) else {
                thread::sleep(IDLE_TICK);
                continue;
            };
            match active.next_payload() {
                Ok(Some(payload)) => {
                    let inbound = InboundPayload {
                        payload,
                        received_at: Instant::now(),
                    };
                    match forward_payload(&tx_data, inbound) {
                        Forwarded::Queued => {}
                        Forwarded::Dropped => {
                            dropped += 1;
                            debug!("payload queue full, dropped {dropped} so far");
                        }
                        // GUI 已经退出
                        Forwarded::Closed => break,
                    }
                }
                Ok(None) if mode == ConnectionMode::Live => thread::sleep(LIVE_POLL),
                Ok(None) => {}
                Err(err) => {
                    warn!("source error: {err}");
                    tx.send(EngineMessage::Log(format!("Source error: {err}"))).ok();
                }
            }
            if mode == ConnectionMode::Synthetic {
                thread::sleep(SYNTHETIC_TICK);
            }
        }
        info!("acquisition engine stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{channel, sync_channel};

    use serde_json::json;

    use super::*;

    fn inbound(value: f64) -> InboundPayload {
        InboundPayload {
            payload: json!([value]),
            received_at: Instant::now(),
        }
    }

    #[test]
    fn stalled_consumer_does_not_grow_the_queue() {
        let (tx_data, rx_data) = sync_channel(PAYLOAD_QUEUE);
        let results: Vec<Forwarded> = (0..100)
            .map(|i| forward_payload(&tx_data, inbound(i as f64)))
            .collect();
        assert_eq!(
            results.iter().filter(|r| **r == Forwarded::Queued).count(),
            PAYLOAD_QUEUE
        );
        assert_eq!(
            results.iter().filter(|r| **r == Forwarded::Dropped).count(),
            100 - PAYLOAD_QUEUE
        );
        // The oldest payloads are the ones kept.
        let kept: Vec<_> = rx_data.try_iter().map(|p| p.payload).collect();
        assert_eq!(kept.len(), PAYLOAD_QUEUE);
        assert_eq!(kept[0], json!([0.0]));
    }

    #[test]
    fn closed_consumer_is_reported() {
        let (tx_data, rx_data) = sync_channel(PAYLOAD_QUEUE);
        drop(rx_data);
        assert_eq!(forward_payload(&tx_data, inbound(1.0)), Forwarded::Closed);
    }

    #[test]
    fn engine_keeps_queue_bounded_while_gui_is_stalled() {
        let (tx, _rx) = channel();
        let (tx_data, rx_data) = sync_channel(PAYLOAD_QUEUE);
        let (tx_cmd, rx_cmd) = channel();
        let config = ScopeConfig {
            sample_rate: 1000.0,
            ..ScopeConfig::default()
        };
        let engine = spawn_thread(tx, tx_data, rx_cmd, config);
        tx_cmd.send(GuiCommand::Connect(ConnectionMode::Synthetic)).unwrap();
        tx_cmd.send(GuiCommand::StartStream).unwrap();
        // Roughly 25 synthetic ticks pass without anyone draining.
        thread::sleep(Duration::from_millis(400));
        // The engine must still react to commands with a full queue.
        tx_cmd.send(GuiCommand::Shutdown).unwrap();
        engine.join().unwrap();
        let queued = rx_data.try_iter().count();
        assert!(queued > 0 && queued <= PAYLOAD_QUEUE);
    }
}
