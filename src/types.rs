// src/types.rs
use crate::drivers::SeriesPoint;
// GUI -> engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    Stop,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Connecting,
    Running,
    Stopped,
}
// engine -> GUI
#[derive(Clone, Debug)]
pub enum EngineMessage {
    Log(String),
    Status(SessionStatus),
    /// Full retained window after a committed tick.
    Series(Vec<SeriesPoint>),
    /// Session could not start.
    Fatal(String),
}
