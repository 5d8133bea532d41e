use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;
use log::{debug, info};
use serialport::{ClearBuffer, SerialPort};
use crate::drivers::{InstrumentTransport, TransportError};
/// Raw SCPI socket port used by most LAN oscilloscopes.
pub const RAW_SOCKET_PORT: u16 = 5555;
pub const SERIAL_BAUD: u32 = 9600;
/// Parsed VISA-style resource string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstrumentAddress {
    Tcp { host: String, port: u16 },
    Serial { path: String },
    Simulated,
}
impl FromStr for InstrumentAddress {
    type Err = TransportError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || TransportError::UnsupportedAddress(s.to_owned());
        let parts: Vec<&str> = s.trim().split("::").collect();
        let head = parts[0].to_ascii_uppercase();
        let suffix_ok = match &parts[1..] {
            [] => true,
            [kind] => kind.eq_ignore_ascii_case("INSTR"),
            _ => false,
        };
        if head == "SIM" {
            return if suffix_ok { Ok(InstrumentAddress::Simulated) } else { Err(unsupported()) };
        }
        if let Some(board) = head.strip_prefix("TCPIP") {
            if !board.chars().all(|c| c.is_ascii_digit()) {
                return Err(unsupported());
            }
            let (host, port) = match &parts[1..] {
                [host, port, kind] if kind.eq_ignore_ascii_case("SOCKET") => {
                    (*host, port.parse().map_err(|_| unsupported())?)
                }
                [host] => (*host, RAW_SOCKET_PORT),
                [host, kind] if kind.eq_ignore_ascii_case("INSTR") => (*host, RAW_SOCKET_PORT),
                _ => return Err(unsupported()),
            };
            if host.is_empty() {
                return Err(unsupported());
            }
            return Ok(InstrumentAddress::Tcp {
                host: host.to_owned(),
                port,
            });
        }
        if head.starts_with("ASRL") && suffix_ok {
            let path = &parts[0][4..];
            if path.is_empty() {
                return Err(unsupported());
            }
            return Ok(InstrumentAddress::Serial {
                path: serial_device(path),
            });
        }
        Err(unsupported())
    }
}
/// `ASRL3` names COM3 on Windows; anything else is taken as a device path.
fn serial_device(path: &str) -> String {
    if cfg!(windows) && path.chars().all(|c| c.is_ascii_digit()) {
        format!("COM{path}")
    } else {
        path.to_owned()
    }
}
/// Byte stream an SCPI session can run over.
pub trait ScpiPort: Read + Write {
    fn disconnect(&mut self) -> io::Result<()> {
        self.flush()
    }
    /// Throws away input that has arrived but not been read yet.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}
impl ScpiPort for TcpStream {
    fn disconnect(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
    fn discard_input(&mut self) -> io::Result<()> {
        self.set_nonblocking(true)?;
        let mut scratch = [0u8; 512];
        let drained = loop {
            match self.read(&mut scratch) {
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => break Err(err),
            }
        };
        self.set_nonblocking(false)?;
        drained
    }
}
impl ScpiPort for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
/// Newline-terminated SCPI commands over any byte stream.
///
/// A response that fails to read leaves the stream out of step with the
/// instrument; whatever is left of it is thrown away before the next command.
pub struct ScpiStream<P: ScpiPort> {
    reader: Option<BufReader<P>>,
    desynced: bool,
}
impl<P: ScpiPort> ScpiStream<P> {
    pub fn new(port: P) -> Self {
        Self {
            reader: Some(BufReader::new(port)),
            desynced: false,
        }
    }
    #[cfg(test)]
    pub fn get_ref(&self) -> Option<&P> {
        self.reader.as_ref().map(BufReader::get_ref)
    }
    fn reader(&mut self) -> Result<&mut BufReader<P>, TransportError> {
        self.reader.as_mut().ok_or(TransportError::Closed)
    }
    fn resync(&mut self) -> Result<(), TransportError> {
        let reader = self.reader()?;
        let stale = reader.buffer().len();
        reader.consume(stale);
        reader
            .get_mut()
            .discard_input()
            .map_err(TransportError::from_io)?;
        debug!("discarded the rest of a failed response ({stale} buffered bytes)");
        self.desynced = false;
        Ok(())
    }
    fn send(&mut self, command: &str) -> Result<(), TransportError> {
        if self.desynced {
            self.resync()?;
        }
        debug!("scpi > {command}");
        let port = self.reader()?.get_mut();
        write_command(port, command).map_err(TransportError::from_io)
    }
    fn read_line(&mut self) -> Result<String, TransportError> {
        let reader = self.reader()?;
        skip_terminators(reader).map_err(TransportError::from_io)?;
        let mut line = Vec::new();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(TransportError::from_io)?;
        if read == 0 {
            return Err(TransportError::Io(io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(String::from_utf8_lossy(&line).trim().to_owned())
    }
}
impl<P: ScpiPort> InstrumentTransport for ScpiStream<P> {
    fn configure(&mut self, commands: &[String]) -> Result<(), TransportError> {
        for command in commands {
            self.send(command)?;
        }
        Ok(())
    }
    fn query_text(&mut self, command: &str) -> Result<String, TransportError> {
        self.send(command)?;
        let reply = self.read_line();
        if reply.is_err() {
            self.desynced = true;
        }
        reply
    }
    fn query_binary_block(&mut self, command: &str) -> Result<Vec<u8>, TransportError> {
        self.send(command)?;
        let block = self.reader().and_then(read_ieee_block);
        if block.is_err() {
            self.desynced = true;
        }
        block
    }
    fn close(&mut self) -> Result<(), TransportError> {
        match self.reader.take() {
            Some(reader) => reader.into_inner().disconnect().map_err(TransportError::from_io),
            None => Ok(()),
        }
    }
}
fn write_command<W: Write>(port: &mut W, command: &str) -> io::Result<()> {
    port.write_all(command.as_bytes())?;
    port.write_all(b"\n")?;
    port.flush()
}
fn skip_terminators<R: Read>(reader: &mut BufReader<R>) -> io::Result<()> {
    loop {
        let pending = reader.fill_buf()?;
        let skip = pending
            .iter()
            .take_while(|b| matches!(**b, b'\n' | b'\r'))
            .count();
        if skip == 0 {
            return Ok(());
        }
        reader.consume(skip);
    }
}
/// Reads `#<n><length><data>`; `#0` blocks run up to the next newline.
pub fn read_ieee_block<R: Read>(reader: &mut BufReader<R>) -> Result<Vec<u8>, TransportError> {
    skip_terminators(reader).map_err(TransportError::from_io)?;
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte).map_err(TransportError::from_io)?;
    if byte[0] != b'#' {
        return Err(TransportError::InvalidBlock(format!(
            "expected '#', got {:#04x}",
            byte[0]
        )));
    }
    reader.read_exact(&mut byte).map_err(TransportError::from_io)?;
    let digits = (byte[0] as char).to_digit(10).ok_or_else(|| {
        TransportError::InvalidBlock(format!("bad length digit count {:#04x}", byte[0]))
    })? as usize;
    if digits == 0 {
        let mut data = Vec::new();
        reader
            .read_until(b'\n', &mut data)
            .map_err(TransportError::from_io)?;
        if data.last() == Some(&b'\n') {
            data.pop();
        }
        return Ok(data);
    }
    let mut length = vec![0u8; digits];
    reader.read_exact(&mut length).map_err(TransportError::from_io)?;
    let length: usize = std::str::from_utf8(&length)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            TransportError::InvalidBlock(format!(
                "bad block length `{}`",
                String::from_utf8_lossy(&length)
            ))
        })?;
    let mut data = vec![0u8; length];
    reader.read_exact(&mut data).map_err(TransportError::from_io)?;
    // Only eat the terminator if it already arrived; otherwise the next read skips it.
    if reader.buffer().first() == Some(&b'\n') {
        reader.consume(1);
    }
    Ok(data)
}
pub fn connect_tcp(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<ScpiStream<TcpStream>, TransportError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(TransportError::from_io)?
        .next()
        .ok_or_else(|| TransportError::UnsupportedAddress(format!("{host}:{port}")))?;
    let stream = TcpStream::connect_timeout(&addr, timeout).map_err(TransportError::from_io)?;
    stream
        .set_read_timeout(Some(timeout))
        .map_err(TransportError::from_io)?;
    stream
        .set_write_timeout(Some(timeout))
        .map_err(TransportError::from_io)?;
    stream.set_nodelay(true).map_err(TransportError::from_io)?;
    info!("connected to {addr}");
    Ok(ScpiStream::new(stream))
}
pub fn connect_serial(
    path: &str,
    timeout: Duration,
) -> Result<ScpiStream<Box<dyn SerialPort>>, TransportError> {
    let port = serialport::new(path, SERIAL_BAUD).timeout(timeout).open()?;
    info!("opened {path} at {SERIAL_BAUD} baud");
    Ok(ScpiStream::new(port))
}
