// src/types.rs
use std::time::Instant;

use serde_json::Value;

// 数据来源
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ConnectionMode {
    Synthetic,
    Live,
}

// GUI 发给后台的命令
#[derive(Clone, Debug)]
pub enum GuiCommand {
    Connect(ConnectionMode),
    Disconnect,
    StartStream,
    StopStream,
    Shutdown,
}

// 后台发给 GUI 的消息
#[derive(Clone, Debug)]
pub enum EngineMessage {
    Log(String),
    Status(bool), // 连接状态
}

// 原始数据包，带到达时间，由 GUI 线程交给 SweepScope
#[derive(Clone, Debug)]
pub struct InboundPayload {
    pub payload: Value,
    pub received_at: Instant,
}
