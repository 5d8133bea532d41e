// src/drivers/mod.rs
pub mod buffer;
pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod preamble;
pub mod reducer;
pub mod scpi;
pub mod source;
// Re-export the pieces the engine and GUI work with.
pub use buffer::SeriesPoint;
pub use decoder::decode;
pub use error::{AcquisitionError, TransportError};
pub use pipeline::{AcquisitionLoop, DisplaySink, DurableSink, DATA_QUERY, PREAMBLE_QUERY};
pub use preamble::ScaleParameters;
pub use reducer::reduce;
pub use scpi::{connect_serial, connect_tcp, InstrumentAddress};
pub use source::InstrumentTransport;
