// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod engine;
mod gui;
mod types;
use anyhow::{anyhow, Context};
use eframe::egui;
use log::info;
use sweepscope::{ScopeConfig, SweepScope};
// 配置文件：SWEEPSCOPE_CONFIG 或第一个命令行参数，否则使用默认值
fn load_config() -> anyhow::Result<ScopeConfig> {
    let path = std::env::var("SWEEPSCOPE_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1));
    match path {
        Some(path) => {
            info!("loading config from {path}");
            ScopeConfig::load_from_path(&path)
        }
        None => Ok(ScopeConfig::default()),
    }
}
// 入口函数
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = load_config()?;
    let scope = SweepScope::new(&config).context("failed to build sweep scope")?;
    info!(
        "{} channels, {} ms window, {} samples/s synthetic",
        config.channels, config.time_domain, config.sample_rate
    );
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 720.0])
        .with_min_inner_size([640.0, 360.0])
        .with_title("Sweepscope");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "Sweepscope",
        options,
        Box::new(move |_cc| Box::new(gui::ScopeApp::new(scope, config))),
    )
    .map_err(|e| anyhow!("gui exited with error: {e}"))
}
