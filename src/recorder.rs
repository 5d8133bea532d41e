use std::fs::File;
use std::io::Write;
use std::path::Path;
use log::info;
use crate::drivers::{AcquisitionError, DurableSink, SeriesPoint};
pub const HEADER: [&str; 2] = ["Time [s]", "Avg Voltage [V]"];
/// Two-column CSV log of the averaged trace, flushed after every row.
pub struct CsvRecorder<W: Write> {
    inner: W,
    header_written: bool,
}
impl CsvRecorder<File> {
    /// Truncates `path`; the header is written when the session starts.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, AcquisitionError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(csv::Error::from)?;
        info!("recording to {}", path.display());
        Ok(Self::from_writer(file))
    }
}
impl<W: Write> CsvRecorder<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            inner,
            header_written: false,
        }
    }
    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
    /// Writes one complete line straight through. Nothing is held back, so a
    /// row that failed to reach `inner` can never surface with a later one.
    fn write_line(&mut self, line: &[u8]) -> Result<(), AcquisitionError> {
        self.inner.write_all(line).map_err(csv::Error::from)?;
        self.inner.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}
fn row_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new())
}
fn finish_row(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, AcquisitionError> {
    let line = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(line)
}
impl<W: Write> DurableSink for CsvRecorder<W> {
    fn write_header(&mut self) -> Result<(), AcquisitionError> {
        if self.header_written {
            return Ok(());
        }
        let mut writer = row_writer();
        writer.write_record(HEADER)?;
        let line = finish_row(writer)?;
        self.write_line(&line)?;
        self.header_written = true;
        Ok(())
    }
    fn append(&mut self, point: &SeriesPoint) -> Result<(), AcquisitionError> {
        let mut writer = row_writer();
        writer.serialize((point.time_offset, point.value))?;
        let line = finish_row(writer)?;
        self.write_line(&line)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn contents(recorder: &CsvRecorder<Vec<u8>>) -> String {
        String::from_utf8(recorder.get_ref().clone()).unwrap()
    }
    #[test]
    fn header_is_written_once() {
        let mut recorder = CsvRecorder::from_writer(Vec::new());
        recorder.write_header().unwrap();
        recorder.write_header().unwrap();
        assert_eq!(contents(&recorder), "Time [s],Avg Voltage [V]\n");
    }
    #[test]
    fn rows_are_flushed_as_they_are_appended() {
        let mut recorder = CsvRecorder::from_writer(Vec::new());
        recorder.write_header().unwrap();
        recorder.append(&SeriesPoint::new(0.25, 2.0)).unwrap();
        assert_eq!(contents(&recorder), "Time [s],Avg Voltage [V]\n0.25,2.0\n");
        recorder.append(&SeriesPoint::new(1.5, -0.04)).unwrap();
        let text = contents(&recorder);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows, vec!["Time [s],Avg Voltage [V]", "0.25,2.0", "1.5,-0.04"]);
    }
    /// Refuses every write and flush while `fail` is set.
    struct Flaky {
        data: Vec<u8>,
        fail: bool,
    }
    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.fail {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            if self.fail {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            Ok(())
        }
    }
    #[test]
    fn failed_row_is_not_written_with_the_next_one() {
        let mut recorder = CsvRecorder::from_writer(Flaky {
            data: Vec::new(),
            fail: false,
        });
        recorder.write_header().unwrap();
        recorder.inner.fail = true;
        let err = recorder.append(&SeriesPoint::new(1.0, 9.0)).unwrap_err();
        assert!(matches!(err, AcquisitionError::SinkWrite(_)));
        recorder.inner.fail = false;
        recorder.append(&SeriesPoint::new(2.0, 5.0)).unwrap();
        let text = String::from_utf8(recorder.get_ref().data.clone()).unwrap();
        assert!(!text.contains("1.0,9.0"));
        assert_eq!(text, "Time [s],Avg Voltage [V]\n2.0,5.0\n");
    }
    #[test]
    fn header_is_retried_after_a_failed_write() {
        let mut recorder = CsvRecorder::from_writer(Flaky {
            data: Vec::new(),
            fail: true,
        });
        assert!(recorder.write_header().is_err());
        recorder.inner.fail = false;
        recorder.write_header().unwrap();
        let text = String::from_utf8(recorder.get_ref().data.clone()).unwrap();
        assert_eq!(text, "Time [s],Avg Voltage [V]\n");
    }
    #[test]
    fn creates_file_on_disk() {
        let path = std::env::temp_dir().join(format!("scope-avg-recorder-{}.csv", std::process::id()));
        {
            let mut recorder = CsvRecorder::create(&path).unwrap();
            recorder.write_header().unwrap();
            recorder.append(&SeriesPoint::new(3.0, 1.0)).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(text, "Time [s],Avg Voltage [V]\n3.0,1.0\n");
    }
}
