// src/gui.rs
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use eframe::egui;
use egui::Color32;
use egui_plot::{Line, Plot, PlotPoints};
use crate::config::AppConfig;
use crate::drivers::SeriesPoint;
use crate::engine;
use crate::types::*;
const MAX_LOG_LINES: usize = 8;
/// How long closing the window waits for the acquisition thread.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);
pub struct ScopeAvgApp {
    status: SessionStatus,
    series: Vec<SeriesPoint>,
    window_secs: f64,
    log_messages: Vec<String>,
    rx: Receiver<EngineMessage>,
    tx_cmd: Sender<EngineCommand>,
    engine: Option<JoinHandle<()>>,
}
impl ScopeAvgApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let repaint = cc.egui_ctx.clone();
        let window_secs = config.window_secs;
        let resource = config.resource.clone();
        let engine = engine::spawn_thread(config, tx, rx_cmd, move || repaint.request_repaint());
        Self {
            status: SessionStatus::Connecting,
            series: Vec::new(),
            window_secs,
            log_messages: vec![format!("Opening {resource}")],
            rx,
            tx_cmd,
            engine: Some(engine),
        }
    }
    fn log(&mut self, msg: String) {
        self.log_messages.push(format!("> {msg}"));
        if self.log_messages.len() > MAX_LOG_LINES {
            self.log_messages.remove(0);
        }
    }
    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                EngineMessage::Log(line) => self.log(line),
                EngineMessage::Status(status) => self.status = status,
                EngineMessage::Series(points) => self.series = points,
                EngineMessage::Fatal(reason) => self.log(format!("Error: {reason}")),
            }
        }
    }
    fn status_label(&self) -> (&'static str, Color32) {
        match self.status {
            SessionStatus::Connecting => ("Connecting", Color32::YELLOW),
            SessionStatus::Running => ("Acquiring", Color32::GREEN),
            SessionStatus::Stopped => ("Stopped", Color32::GRAY),
        }
    }
}
impl eframe::App for ScopeAvgApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_messages();
        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let (text, color) = self.status_label();
                ui.colored_label(color, text);
                ui.separator();
                ui.label(format!("{} points in the last {} s", self.series.len(), self.window_secs));
                if let Some(latest) = self.series.last() {
                    ui.separator();
                    ui.label(format!("{:.4} V @ {:.2} s", latest.value, latest.time_offset));
                }
            });
        });
        egui::TopBottomPanel::bottom("log").show(ctx, |ui| {
            for line in &self.log_messages {
                ui.monospace(line.as_str());
            }
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            let points: PlotPoints = self
                .series
                .iter()
                .map(|p| [p.time_offset, p.value])
                .collect();
            Plot::new("avg_voltage")
                .x_axis_label("Time [s]")
                .y_axis_label("Voltage [V]")
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new(points).name("Avg Voltage"));
                });
        });
        // Keeps the status bar fresh if the engine goes quiet.
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}
impl Drop for ScopeAvgApp {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine::stop_thread(&self.tx_cmd, engine, SHUTDOWN_GRACE);
        }
    }
}
