use thiserror::Error;
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("instrument I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("instrument did not answer within the configured timeout")]
    Timeout,
    #[error("malformed binary block: {0}")]
    InvalidBlock(String),
    #[error("unsupported instrument address `{0}`")]
    UnsupportedAddress(String),
    #[error("instrument does not understand `{0}`")]
    UnknownCommand(String),
    #[error("transport already closed")]
    Closed,
}
impl TransportError {
    /// Folds read/write timeouts into `Timeout` so callers see one variant.
    pub fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => TransportError::Timeout,
            _ => TransportError::Io(err),
        }
    }
}
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("malformed preamble: {0}")]
    MalformedPreamble(String),
    #[error("instrument returned an empty acquisition")]
    EmptyAcquisition,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("durable sink write failed: {0}")]
    SinkWrite(#[from] csv::Error),
    #[error("window duration must be positive and finite, got {0}")]
    InvalidWindow(f64),
    #[error("point at {current}s arrived after {previous}s")]
    OutOfOrder { previous: f64, current: f64 },
    #[error("acquisition session already stopped")]
    Stopped,
}
