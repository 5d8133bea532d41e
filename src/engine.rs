// src/engine.rs
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use crate::config::AppConfig;
use crate::drivers::{
    connect_serial, connect_tcp, AcquisitionLoop, DisplaySink, InstrumentAddress,
    InstrumentTransport, SeriesPoint,
};
use crate::recorder::CsvRecorder;
use crate::simulator::SimulatedScope;
use crate::types::*;
/// Fixed-period deadlines. Deadlines missed while a tick overran are dropped, not queued.
pub struct TickSchedule {
    interval: Duration,
    next: Instant,
}
impl TickSchedule {
    pub fn new(interval: Duration, first: Instant) -> Self {
        Self {
            interval,
            next: first,
        }
    }
    pub fn until_next(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }
    /// Moves to the first deadline after `now`, returning how many were skipped.
    pub fn advance(&mut self, now: Instant) -> u32 {
        self.next += self.interval;
        let mut skipped = 0;
        while self.next <= now {
            self.next += self.interval;
            skipped += 1;
        }
        skipped
    }
}
/// Forwards snapshots to the GUI thread.
pub struct ChannelDisplay<F: Fn()> {
    tx: Sender<EngineMessage>,
    notify: F,
}
impl<F: Fn()> DisplaySink for ChannelDisplay<F> {
    fn show(&mut self, snapshot: Vec<SeriesPoint>) {
        // GUI gone: the next command poll sees the disconnect and stops the session.
        if self.tx.send(EngineMessage::Series(snapshot)).is_ok() {
            (self.notify)();
        }
    }
}
pub fn open_transport(resource: &str, timeout: Duration) -> Result<Box<dyn InstrumentTransport>> {
    let address: InstrumentAddress = resource.parse()?;
    let transport: Box<dyn InstrumentTransport> = match address {
        InstrumentAddress::Tcp { host, port } => Box::new(
            connect_tcp(&host, port, timeout)
                .with_context(|| format!("connecting to {host}:{port}"))?,
        ),
        InstrumentAddress::Serial { path } => Box::new(
            connect_serial(&path, timeout).with_context(|| format!("opening {path}"))?,
        ),
        InstrumentAddress::Simulated => Box::new(SimulatedScope::new()),
    };
    Ok(transport)
}
/// Runs one acquisition session on a background thread until `Stop` or the GUI hangs up.
pub fn spawn_thread<F>(
    config: AppConfig,
    tx: Sender<EngineMessage>,
    rx_cmd: Receiver<EngineCommand>,
    notify: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    thread::spawn(move || {
        if let Err(err) = run_session(&config, &tx, &rx_cmd, notify) {
            error!("acquisition session failed: {err:#}");
            tx.send(EngineMessage::Fatal(format!("{err:#}"))).ok();
        }
        tx.send(EngineMessage::Status(SessionStatus::Stopped)).ok();
    })
}
/// Sends `Stop` and waits at most `grace` for the session thread to exit.
///
/// A thread blocked in an instrument read can take up to the transport timeout to notice;
/// it is left to finish on its own and `false` is returned.
pub fn stop_thread(
    tx_cmd: &Sender<EngineCommand>,
    handle: JoinHandle<()>,
    grace: Duration,
) -> bool {
    tx_cmd.send(EngineCommand::Stop).ok();
    let deadline = Instant::now() + grace;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("acquisition thread still waiting on the instrument, not joining it");
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    handle.join().is_ok()
}
fn run_session<F: Fn()>(
    config: &AppConfig,
    tx: &Sender<EngineMessage>,
    rx_cmd: &Receiver<EngineCommand>,
    notify: F,
) -> Result<()> {
    tx.send(EngineMessage::Status(SessionStatus::Connecting)).ok();
    let transport = open_transport(&config.resource, config.timeout())
        .with_context(|| format!("opening instrument {}", config.resource))?;
    let recorder = CsvRecorder::create(&config.csv_path)
        .with_context(|| format!("creating {}", config.csv_path.display()))?;
    let display = ChannelDisplay {
        tx: tx.clone(),
        notify,
    };
    let mut session = AcquisitionLoop::start(transport, recorder, display, config.window_secs)
        .context("starting acquisition")?;
    let params = *session.params();
    tx.send(EngineMessage::Status(SessionStatus::Running)).ok();
    tx.send(EngineMessage::Log(format!(
        "Acquiring {} every {} ms ({} pts, {} V/count)",
        config.resource, config.interval_ms, params.total_points, params.y_multiplier
    )))
    .ok();
    let mut schedule = TickSchedule::new(config.interval(), Instant::now());
    loop {
        match rx_cmd.recv_timeout(schedule.until_next(Instant::now())) {
            Ok(EngineCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        session.run_tick();
        let skipped = schedule.advance(Instant::now());
        if skipped > 0 {
            debug!("tick overran, skipped {skipped} deadline(s)");
        }
    }
    session.stop();
    let stats = session.stats();
    info!("session ended: {} ticks, {} skipped", stats.completed, stats.skipped);
    tx.send(EngineMessage::Log(format!(
        "Stopped after {} ticks ({} skipped)",
        stats.completed, stats.skipped
    )))
    .ok();
    Ok(())
}
