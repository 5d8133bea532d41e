// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod config;
mod drivers;
mod engine;
mod gui;
mod recorder;
mod simulator;
mod types;
use anyhow::{anyhow, Result};
use eframe::egui;
use config::AppConfig;
fn main() -> Result<()> {
    env_logger::init();
    let config = AppConfig::load()?;
    log::info!(
        "resource {}, csv {}, every {} ms, {} s window",
        config.resource,
        config.csv_path.display(),
        config.interval_ms,
        config.window_secs
    );
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([900.0, 540.0])
        .with_title("Average Voltage Trace");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "scope-avg",
        options,
        Box::new(move |cc| Box::new(gui::ScopeAvgApp::new(cc, config))),
    )
    .map_err(|err| anyhow!("GUI failed: {err}"))
}
