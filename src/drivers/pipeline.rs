use std::time::Instant;
use log::{debug, info, warn};
use crate::drivers::buffer::{SeriesPoint, SlidingSeriesBuffer};
use crate::drivers::error::AcquisitionError;
use crate::drivers::preamble::ScaleParameters;
use crate::drivers::source::InstrumentTransport;
use crate::drivers::{decode, reduce};
pub const PREAMBLE_QUERY: &str = ":WAVeform:PREamble?";
pub const DATA_QUERY: &str = ":WAVeform:DATA?";
/// Channel 1, screen data, unsigned 1-byte binary.
pub fn setup_commands() -> Vec<String> {
    [
        ":WAVeform:SOURce CHAN1",
        ":WAVeform:MODE NORMal",
        ":WAVeform:FORMat BYTE",
        ":WAVeform:ENCdg RIBinary",
        ":WAVeform:DATA:WIDth 1",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}
/// Append-only record of every committed point.
pub trait DurableSink {
    /// Writes the column header. Only the first call has an effect.
    fn write_header(&mut self) -> Result<(), AcquisitionError>;
    /// Appends one row; the row must be durable once this returns.
    fn append(&mut self, point: &SeriesPoint) -> Result<(), AcquisitionError>;
}
impl<D: DurableSink + ?Sized> DurableSink for &mut D {
    fn write_header(&mut self) -> Result<(), AcquisitionError> {
        (**self).write_header()
    }
    fn append(&mut self, point: &SeriesPoint) -> Result<(), AcquisitionError> {
        (**self).append(point)
    }
}
/// Receives the full retained series after every committed point and redraws from scratch.
pub trait DisplaySink {
    fn show(&mut self, snapshot: Vec<SeriesPoint>);
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Running,
    Stopped,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub completed: u64,
    pub skipped: u64,
}
/// One acquisition session: owns the transport, the scale parameters and both sinks.
///
/// Ticks are driven by the caller; each either updates both sinks or neither.
pub struct AcquisitionLoop<T: InstrumentTransport, D: DurableSink, S: DisplaySink> {
    transport: T,
    durable: D,
    display: S,
    params: ScaleParameters,
    buffer: SlidingSeriesBuffer,
    started_at: Instant,
    state: LoopState,
    stats: TickStats,
}
impl<T: InstrumentTransport, D: DurableSink, S: DisplaySink> AcquisitionLoop<T, D, S> {
    /// Configures the instrument, reads the preamble and writes the durable header.
    ///
    /// Any failure here is fatal; the transport is closed before the error is returned.
    pub fn start(
        mut transport: T,
        mut durable: D,
        display: S,
        window_secs: f64,
    ) -> Result<Self, AcquisitionError> {
        let mut state = LoopState::Initializing;
        debug!("acquisition session {state:?}");
        let initialized = SlidingSeriesBuffer::new(window_secs).and_then(|buffer| {
            let params = initialize(&mut transport, &mut durable)?;
            Ok((buffer, params))
        });
        let (buffer, params) = match initialized {
            Ok(ready) => ready,
            Err(err) => {
                if let Err(close_err) = transport.close() {
                    warn!("closing transport after failed start: {close_err}");
                }
                return Err(err);
            }
        };
        state = LoopState::Running;
        info!(
            "acquisition {state:?}: {} points/block, {:.3e} s/sample, {} V/count, window {window_secs} s",
            params.total_points, params.x_increment, params.y_multiplier
        );
        Ok(Self {
            transport,
            durable,
            display,
            params,
            buffer,
            started_at: Instant::now(),
            state,
            stats: TickStats::default(),
        })
    }
    pub fn params(&self) -> &ScaleParameters {
        &self.params
    }
    pub fn stats(&self) -> TickStats {
        self.stats
    }
    /// One tick timestamped with the wall-clock time elapsed since `start`.
    pub fn tick(&mut self) -> Result<SeriesPoint, AcquisitionError> {
        let value = self.acquire()?;
        let time_offset = self.started_at.elapsed().as_secs_f64();
        self.commit(time_offset, value)
    }
    /// Runs one tick, logging and counting a failure instead of returning it.
    pub fn run_tick(&mut self) -> Option<SeriesPoint> {
        match self.tick() {
            Ok(point) => Some(point),
            Err(AcquisitionError::Stopped) => None,
            Err(err) => {
                self.stats.skipped += 1;
                warn!("skipping tick: {err}");
                None
            }
        }
    }
    /// Closes the transport. Repeated calls do nothing; close errors are logged, not returned.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.state = LoopState::Stopped;
        if let Err(err) = self.transport.close() {
            warn!("ignoring error while closing instrument: {err}");
        }
        info!(
            "acquisition stopped after {} ticks ({} skipped)",
            self.stats.completed, self.stats.skipped
        );
    }
    fn acquire(&mut self) -> Result<f64, AcquisitionError> {
        if self.state != LoopState::Running {
            return Err(AcquisitionError::Stopped);
        }
        let raw = self.transport.query_binary_block(DATA_QUERY)?;
        if raw.len() != self.params.total_points {
            debug!(
                "block has {} points, preamble announced {}",
                raw.len(),
                self.params.total_points
            );
        }
        let volts = decode(&raw, &self.params)?;
        reduce(&volts)
    }
    fn commit(&mut self, time_offset: f64, value: f64) -> Result<SeriesPoint, AcquisitionError> {
        if let Some(latest) = self.buffer.latest() {
            if time_offset < latest.time_offset {
                return Err(AcquisitionError::OutOfOrder {
                    previous: latest.time_offset,
                    current: time_offset,
                });
            }
        }
        let point = SeriesPoint::new(time_offset, value);
        self.durable.append(&point)?;
        self.buffer.append(point);
        self.display.show(self.buffer.snapshot());
        self.stats.completed += 1;
        Ok(point)
    }
}
impl<T: InstrumentTransport, D: DurableSink, S: DisplaySink> Drop for AcquisitionLoop<T, D, S> {
    fn drop(&mut self) {
        self.stop();
    }
}
#[cfg(test)]
impl<T: InstrumentTransport, D: DurableSink, S: DisplaySink> AcquisitionLoop<T, D, S> {
    pub fn state(&self) -> LoopState {
        self.state
    }
    pub fn buffer(&self) -> &SlidingSeriesBuffer {
        &self.buffer
    }
    pub fn transport(&self) -> &T {
        &self.transport
    }
    pub fn durable(&self) -> &D {
        &self.durable
    }
    pub fn display(&self) -> &S {
        &self.display
    }
    /// One tick with an explicit timestamp instead of the wall clock.
    pub fn tick_at(&mut self, time_offset: f64) -> Result<SeriesPoint, AcquisitionError> {
        let value = self.acquire()?;
        self.commit(time_offset, value)
    }
}
fn initialize<T: InstrumentTransport, D: DurableSink>(
    transport: &mut T,
    durable: &mut D,
) -> Result<ScaleParameters, AcquisitionError> {
    transport.configure(&setup_commands())?;
    let preamble = transport.query_text(PREAMBLE_QUERY)?;
    let params = ScaleParameters::from_preamble(&preamble)?;
    durable.write_header()?;
    Ok(params)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::ManualTransport;
    use crate::drivers::TransportError;
    const PREAMBLE: &str = "0,0,2,1,1.0e-6,0,0,0.04,0,128";
    #[derive(Default)]
    struct MemorySink {
        header_writes: usize,
        rows: Vec<SeriesPoint>,
        fail_next: bool,
    }
    impl DurableSink for MemorySink {
        fn write_header(&mut self) -> Result<(), AcquisitionError> {
            self.header_writes += 1;
            Ok(())
        }
        fn append(&mut self, point: &SeriesPoint) -> Result<(), AcquisitionError> {
            if std::mem::take(&mut self.fail_next) {
                let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
                return Err(AcquisitionError::SinkWrite(csv::Error::from(io)));
            }
            self.rows.push(*point);
            Ok(())
        }
    }
    #[derive(Default)]
    struct Frames(Vec<Vec<SeriesPoint>>);
    impl DisplaySink for Frames {
        fn show(&mut self, snapshot: Vec<SeriesPoint>) {
            self.0.push(snapshot);
        }
    }
    fn transport() -> ManualTransport {
        ManualTransport::new().with_reply(PREAMBLE_QUERY, PREAMBLE)
    }
    fn session(
        transport: ManualTransport,
        window_secs: f64,
    ) -> AcquisitionLoop<ManualTransport, MemorySink, Frames> {
        AcquisitionLoop::start(transport, MemorySink::default(), Frames::default(), window_secs)
            .unwrap()
    }
    #[test]
    fn start_configures_then_reads_preamble() {
        let acq = session(transport(), 10.0);
        let mut expected = setup_commands();
        expected.push(PREAMBLE_QUERY.to_owned());
        assert_eq!(acq.transport().issued(), expected.as_slice());
        assert_eq!(acq.state(), LoopState::Running);
        assert_eq!(acq.params().y_multiplier, 0.04);
        assert_eq!(acq.durable().header_writes, 1);
    }
    #[test]
    fn malformed_preamble_is_fatal_and_closes_transport() {
        let mut transport = ManualTransport::new().with_reply(PREAMBLE_QUERY, "0,0,1200");
        let mut sink = MemorySink::default();
        let err = AcquisitionLoop::start(&mut transport, &mut sink, Frames::default(), 10.0).err();
        assert!(matches!(err, Some(AcquisitionError::MalformedPreamble(_))));
        assert_eq!(sink.header_writes, 0);
        assert!(transport.is_closed());
        assert_eq!(transport.close_calls(), 1);
    }
    #[test]
    fn tick_converts_reduces_and_feeds_both_sinks() {
        let acq_transport = transport().with_blocks(vec![vec![228, 128]]);
        let mut acq = session(acq_transport, 10.0);
        let point = acq.tick_at(0.5).unwrap();
        assert_eq!(point.time_offset, 0.5);
        assert!((point.value - 2.0).abs() < 1e-12);
        assert_eq!(acq.durable().rows, vec![point]);
        assert_eq!(acq.display().0, vec![vec![point]]);
        assert_eq!(acq.transport().issued().last().map(String::as_str), Some(DATA_QUERY));
    }
    #[test]
    fn failed_ticks_leave_both_sinks_untouched() {
        let mut t = transport();
        t.push_error(TransportError::Timeout);
        t.push_block(Vec::new());
        t.push_block(vec![128, 128]);
        t.push_block(vec![228, 228]);
        let mut acq = session(t, 10.0);
        assert!(matches!(
            acq.tick_at(0.0),
            Err(AcquisitionError::Transport(TransportError::Timeout))
        ));
        assert!(matches!(acq.tick_at(1.0), Err(AcquisitionError::EmptyAcquisition)));
        acq.durable.fail_next = true;
        assert!(matches!(acq.tick_at(2.0), Err(AcquisitionError::SinkWrite(_))));
        assert!(acq.durable().rows.is_empty());
        assert!(acq.buffer().is_empty());
        assert!(acq.display().0.is_empty());
        let point = acq.tick_at(3.0).unwrap();
        assert!((point.value - 4.0).abs() < 1e-12);
        assert_eq!(acq.durable().rows.len(), 1);
        assert_eq!(acq.buffer().len(), 1);
    }
    #[test]
    fn run_tick_counts_skips_and_continues() {
        let mut t = transport();
        t.push_error(TransportError::Timeout);
        t.push_block(vec![128]);
        let mut acq = session(t, 10.0);
        assert!(acq.run_tick().is_none());
        assert!(acq.run_tick().is_some());
        assert_eq!(acq.stats(), TickStats { completed: 1, skipped: 1 });
    }
    #[test]
    fn out_of_order_timestamp_is_rejected() {
        let t = transport().with_blocks(vec![vec![128], vec![128]]);
        let mut acq = session(t, 10.0);
        acq.tick_at(5.0).unwrap();
        assert!(matches!(acq.tick_at(4.0), Err(AcquisitionError::OutOfOrder { .. })));
        assert_eq!(acq.durable().rows.len(), 1);
    }
    #[test]
    fn thirteen_ticks_keep_the_last_window() {
        // 25 counts at 0.04 V/count is 1 V, so values cycle through 0..=4 V
        let blocks = (0..=12u8).map(|i| vec![128 + 25 * (i % 5), 128 + 25 * (i % 5)]);
        let mut acq = session(transport().with_blocks(blocks), 10.0);
        for i in 0..=12 {
            acq.tick_at(i as f64).unwrap();
        }
        let times: Vec<f64> = acq.buffer().iter().map(|p| p.time_offset).collect();
        assert_eq!(times.first(), Some(&2.0));
        assert_eq!(times.last(), Some(&12.0));
        assert_eq!(times.len(), 11);
        assert_eq!(acq.durable().rows.len(), 13);
        let last_frame = acq.display().0.last().unwrap();
        assert_eq!(last_frame.len(), 11);
        assert!((last_frame[10].value - 2.0).abs() < 1e-12);
    }
    #[test]
    fn stop_is_idempotent_and_swallows_close_errors() {
        let mut acq = session(transport().with_failing_close(), 10.0);
        acq.stop();
        acq.stop();
        assert_eq!(acq.state(), LoopState::Stopped);
        assert_eq!(acq.transport().close_calls(), 1);
        assert!(matches!(acq.tick_at(1.0), Err(AcquisitionError::Stopped)));
        assert!(acq.run_tick().is_none());
        assert_eq!(acq.stats().skipped, 0);
    }
    #[test]
    fn invalid_window_fails_before_touching_instrument() {
        let result = AcquisitionLoop::start(transport(), MemorySink::default(), Frames::default(), 0.0);
        assert!(matches!(result, Err(AcquisitionError::InvalidWindow(_))));
    }
}
