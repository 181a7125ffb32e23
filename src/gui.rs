// src/gui.rs
use std::sync::mpsc::{channel, sync_channel, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::SystemTime;

use eframe::egui;
use egui::{Color32, Stroke};
use egui_plot::{Line, Plot, PlotPoints, Polygon};
use log::{error, info};
use sweepscope::drivers::{render_scope_png, PlotStyle};
use sweepscope::sweep::{Layer, SweepBuffer};
use sweepscope::{ScopeConfig, SweepScope};

use crate::engine;
use crate::types::*;

const TRACE_COLORS: [Color32; 6] = [
    Color32::from_rgb(0, 255, 128),
    Color32::from_rgb(0, 255, 255),
    Color32::YELLOW,
    Color32::from_rgb(255, 0, 255),
    Color32::from_rgb(255, 128, 0),
    Color32::WHITE,
];

pub struct ScopeApp {
    // 系统状态
    is_connected: bool,
    is_streaming: bool,
    connection_mode: ConnectionMode,

    // 扫描显示
    scope: SweepScope,
    live_address: String,

    // 界面日志
    log_messages: Vec<String>,

    // 通讯管道
    rx: Receiver<EngineMessage>,
    rx_data: Receiver<InboundPayload>,
    tx_cmd: Sender<GuiCommand>,
    engine: Option<JoinHandle<()>>,
}

impl ScopeApp {
    pub fn new(scope: SweepScope, config: ScopeConfig) -> Self {
        let (tx, rx) = channel();
        // 有界队列：GUI 停止刷新时由后台丢包，不在内存里堆积
        let (tx_data, rx_data) = sync_channel(engine::PAYLOAD_QUEUE);
        let (tx_cmd, rx_cmd) = channel();

        // 启动后台采集线程
        let live_address = config.live_address.clone();
        let engine = engine::spawn_thread(tx, tx_data, rx_cmd, config);

        Self {
            is_connected: false,
            is_streaming: false,
            connection_mode: ConnectionMode::Synthetic,
            scope,
            live_address,
            log_messages: vec!["Sweepscope ready.".to_owned()],
            rx,
            rx_data,
            tx_cmd,
            engine: Some(engine),
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 {
            self.log_messages.remove(0);
        }
    }

    fn send(&mut self, cmd: GuiCommand) {
        if self.tx_cmd.send(cmd).is_err() {
            self.log("Engine is not running");
        }
    }

    fn drain_engine(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                EngineMessage::Log(s) => self.log(&s),
                EngineMessage::Status(b) => {
                    self.is_connected = b;
                    if !b {
                        self.is_streaming = false;
                    }
                }
            }
        }
        // 按到达时间打时间戳，而不是按本帧的时间
        while let Ok(inbound) = self.rx_data.try_recv() {
            if let Err(err) = self
                .scope
                .on_message_received(&inbound.payload, inbound.received_at)
            {
                self.log(&format!("Rejected payload: {err}"));
            }
        }
    }

    fn save_snapshot(&mut self) {
        let stamp = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let filename = format!("sweep_snapshot_{stamp}.png");
        let result = render_scope_png(&self.scope, &PlotStyle::default())
            .and_then(|png| std::fs::write(&filename, png).map_err(Into::into));
        match result {
            Ok(()) => {
                info!("snapshot saved to {filename}");
                self.log(&format!("Saved {filename}"));
            }
            Err(err) => {
                error!("snapshot failed: {err}");
                self.log(&format!("Snapshot failed: {err}"));
            }
        }
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);
        ui.heading("Sweepscope");
        ui.label(format!(
            "{} ch, {:.0} ms window",
            self.scope.channel_count(),
            self.scope.domain().width()
        ));
        ui.separator();

        ui.add_enabled_ui(!self.is_connected, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.connection_mode, ConnectionMode::Synthetic, "SYNTH");
                ui.selectable_value(&mut self.connection_mode, ConnectionMode::Live, "LIVE");
            });
        });
        if self.connection_mode == ConnectionMode::Live {
            ui.small(format!("server: {}", self.live_address));
        }

        let btn_txt = if self.is_connected { "DISCONNECT" } else { "CONNECT" };
        if ui.button(btn_txt).clicked() {
            if self.is_connected {
                self.send(GuiCommand::Disconnect);
            } else {
                self.send(GuiCommand::Connect(self.connection_mode));
            }
        }

        if self.is_connected {
            let stream_btn = if self.is_streaming { "STOP STREAM" } else { "START STREAM" };
            if ui.button(stream_btn).clicked() {
                // 立即更新，避免按钮闪烁
                if self.is_streaming {
                    self.send(GuiCommand::StopStream);
                    self.is_streaming = false;
                } else {
                    self.send(GuiCommand::StartStream);
                    self.is_streaming = true;
                }
            }
        }
        if ui.button("RESET VIEW").clicked() {
            self.scope.reset();
        }
        if ui.button("SAVE PNG").clicked() {
            self.save_snapshot();
        }

        ui.add_space(20.0);
        ui.separator();
        let diag = self.scope.diagnostics();
        ui.monospace(format!("payloads  {}", diag.payloads));
        ui.monospace(format!("rejected  {}", diag.rejected_payloads));
        ui.monospace(format!("sweeps    {}", diag.wraps));
        ui.monospace(format!("overflows {}", diag.overflow_resets));

        ui.add_space(10.0);
        egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
            for m in &self.log_messages {
                ui.monospace(m);
            }
        });
    }

    fn channel_plots(&self, ui: &mut egui::Ui) {
        let count = self.scope.channel_count().max(1);
        let height = (ui.available_height() / count as f32 - ui.spacing().item_spacing.y).max(40.0);
        let background = ui.visuals().extreme_bg_color;
        let domain = self.scope.domain().width();
        for (i, window) in self.scope.channels().iter().enumerate() {
            let color = TRACE_COLORS[i % TRACE_COLORS.len()];
            let (y_min, y_max) = window.y_range();
            Plot::new(format!("channel_{i}"))
                .height(height)
                .include_x(0.0)
                .include_x(domain)
                .include_y(y_min)
                .include_y(y_max)
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false)
                .allow_boxed_zoom(false)
                .show(ui, |plot_ui| {
                    // 按 draw order 依次绘制：旧数据 -> 遮罩 -> 新数据
                    for layer in window.layers() {
                        match layer {
                            Layer::Previous(buf) | Layer::Current(buf) => {
                                if !buf.is_empty() {
                                    plot_ui.line(Line::new(plot_points(buf)).color(color));
                                }
                            }
                            Layer::Occluder(rect) => {
                                let x2 = rect.x2.min(domain);
                                let corners = vec![
                                    [rect.x1, rect.y1],
                                    [x2, rect.y1],
                                    [x2, rect.y2],
                                    [rect.x1, rect.y2],
                                ];
                                plot_ui.polygon(
                                    Polygon::new(PlotPoints::new(corners))
                                        .fill_color(background)
                                        .stroke(Stroke::NONE),
                                );
                            }
                        }
                    }
                });
        }
    }
}

fn plot_points(buf: &SweepBuffer) -> PlotPoints {
    PlotPoints::new(buf.points().iter().map(|s| [s.x, s.y]).collect())
}

impl eframe::App for ScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. 消息处理
        self.drain_engine();
        if self.is_streaming {
            ctx.request_repaint();
        }

        // 2. UI 绘制
        ctx.set_visuals(egui::Visuals::dark());
        egui::SidePanel::left("L").min_width(220.0).show(ctx, |ui| {
            self.side_panel(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.channel_plots(ui);
        });
    }
}

impl Drop for ScopeApp {
    fn drop(&mut self) {
        self.tx_cmd.send(GuiCommand::Shutdown).ok();
        if let Some(engine) = self.engine.take() {
            engine.join().ok();
        }
    }
}
