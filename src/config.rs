// src/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{bail, Context, Result};
use log::info;
use serde::Deserialize;
pub const CONFIG_ENV: &str = "SCOPE_AVG_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "scope-avg.json";
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// VISA-style resource string, see `InstrumentAddress`.
    pub resource: String,
    pub csv_path: PathBuf,
    pub interval_ms: u64,
    pub window_secs: f64,
    /// Instrument I/O timeout.
    pub timeout_ms: u64,
}
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            resource: "SIM::INSTR".to_owned(),
            csv_path: PathBuf::from("waveform_avg.csv"),
            interval_ms: 10,
            window_secs: 10.0,
            timeout_ms: 10_000,
        }
    }
}
impl AppConfig {
    /// Loads from `$SCOPE_AVG_CONFIG`, or `scope-avg.json`; a missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Self::default().validated();
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("loading {}", path.display()))
    }
    pub fn from_json(text: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(text).context("invalid config JSON")?;
        config.validated()
    }
    fn validated(self) -> Result<Self> {
        if self.interval_ms == 0 {
            bail!("interval_ms must be greater than zero");
        }
        if !self.window_secs.is_finite() || self.window_secs <= 0.0 {
            bail!("window_secs must be positive, got {}", self.window_secs);
        }
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be greater than zero");
        }
        Ok(self)
    }
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
