#[cfg(test)]
use std::collections::{HashMap, VecDeque};
use crate::drivers::TransportError;
/// Command/response link to an instrument.
pub trait InstrumentTransport {
    /// Sends each directive in order; none of them produce a response.
    fn configure(&mut self, commands: &[String]) -> Result<(), TransportError>;
    fn query_text(&mut self, command: &str) -> Result<String, TransportError>;
    fn query_binary_block(&mut self, command: &str) -> Result<Vec<u8>, TransportError>;
    fn close(&mut self) -> Result<(), TransportError>;
}
impl<T: InstrumentTransport + ?Sized> InstrumentTransport for Box<T> {
    fn configure(&mut self, commands: &[String]) -> Result<(), TransportError> {
        (**self).configure(commands)
    }
    fn query_text(&mut self, command: &str) -> Result<String, TransportError> {
        (**self).query_text(command)
    }
    fn query_binary_block(&mut self, command: &str) -> Result<Vec<u8>, TransportError> {
        (**self).query_binary_block(command)
    }
    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}
impl<T: InstrumentTransport + ?Sized> InstrumentTransport for &mut T {
    fn configure(&mut self, commands: &[String]) -> Result<(), TransportError> {
        (**self).configure(commands)
    }
    fn query_text(&mut self, command: &str) -> Result<String, TransportError> {
        (**self).query_text(command)
    }
    fn query_binary_block(&mut self, command: &str) -> Result<Vec<u8>, TransportError> {
        (**self).query_binary_block(command)
    }
    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}
/// Scripted transport for exercising the acquisition loop without hardware.
#[cfg(test)]
#[derive(Default)]
pub struct ManualTransport {
    replies: HashMap<String, String>,
    blocks: VecDeque<Result<Vec<u8>, TransportError>>,
    issued: Vec<String>,
    close_calls: usize,
    fail_close: bool,
    closed: bool,
}
#[cfg(test)]
impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_reply(mut self, command: &str, reply: impl Into<String>) -> Self {
        self.replies.insert(command.to_owned(), reply.into());
        self
    }
    pub fn with_blocks(mut self, blocks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        self.blocks.extend(blocks.into_iter().map(Ok));
        self
    }
    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
    pub fn push_block(&mut self, block: Vec<u8>) {
        self.blocks.push_back(Ok(block));
    }
    pub fn push_error(&mut self, err: TransportError) {
        self.blocks.push_back(Err(err));
    }
    /// Every command seen so far, in the order it was issued.
    pub fn issued(&self) -> &[String] {
        &self.issued
    }
    pub fn close_calls(&self) -> usize {
        self.close_calls
    }
    pub fn is_closed(&self) -> bool {
        self.closed
    }
    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}
#[cfg(test)]
impl InstrumentTransport for ManualTransport {
    fn configure(&mut self, commands: &[String]) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.issued.extend(commands.iter().cloned());
        Ok(())
    }
    fn query_text(&mut self, command: &str) -> Result<String, TransportError> {
        self.ensure_open()?;
        self.issued.push(command.to_owned());
        self.replies
            .get(command)
            .cloned()
            .ok_or_else(|| TransportError::UnknownCommand(command.to_owned()))
    }
    fn query_binary_block(&mut self, command: &str) -> Result<Vec<u8>, TransportError> {
        self.ensure_open()?;
        self.issued.push(command.to_owned());
        self.blocks.pop_front().unwrap_or(Err(TransportError::Timeout))
    }
    fn close(&mut self) -> Result<(), TransportError> {
        self.close_calls += 1;
        self.closed = true;
        if self.fail_close {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "link dropped during close",
            )));
        }
        Ok(())
    }
}
