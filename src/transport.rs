//! Byte transport towards the board that drives the data bus.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

/// Line speed of the board's serial link.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// A send that blocks longer than this is reported as a transport failure.
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Blocking one-byte sender. Framing and handshaking belong to the
/// implementation; the caller only learns whether the byte went out.
pub trait ByteSink {
    fn send(&mut self, byte: u8) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sends each byte through a `Write` and flushes it immediately.
pub struct WriteSink<W: Write> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for WriteSink<W> {
    fn send(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_all(&[byte])?;
        self.inner.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ByteSink for Vec<u8> {
    fn send(&mut self, byte: u8) -> io::Result<()> {
        self.push(byte);
        Ok(())
    }
}

/// Opens the serial link to the data-bus board at `baud_rate`, 8N1, no
/// flow control.
pub fn open_serial<P: AsRef<Path>>(
    path: P,
    baud_rate: u32,
) -> io::Result<WriteSink<Box<dyn SerialPort>>> {
    let name = path.as_ref().to_string_lossy();
    let port = serialport::new(name.as_ref(), baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(WRITE_TIMEOUT)
        .open()?;
    log::info!("Transport opened: {} at {} baud, 8N1", name, baud_rate);
    Ok(WriteSink::new(port))
}

/// Opens an existing plain file or device node as the transport, with no
/// line setup. Used for replay sessions, where bytes usually go to a file.
pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<WriteSink<File>> {
    let file = OpenOptions::new()
        .write(true)
        .create(false)
        .open(path.as_ref())?;
    log::info!("Transport opened: {}", path.as_ref().display());
    Ok(WriteSink::new(file))
}
