use log::{debug, info};
use serialport::SerialPort;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use super::{ByteSink, ByteSource};
use crate::error::Result;

const READ_CHUNK: usize = 256;

/// Non-blocking wrapper over a `serialport` handle.
///
/// Reads are pulled from the OS in chunks and handed out one byte at a time.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    pending: VecDeque<u8>,
}

impl SerialTransport {
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        info!("Opening serial port {} at {} baud", port_name, baud_rate);
        let mut builder = serialport::new(port_name, baud_rate).timeout(Duration::from_millis(50));
        // Some USB serial adapters need explicit settings
        #[cfg(unix)]
        {
            builder = builder
                .data_bits(serialport::DataBits::Eight)
                .stop_bits(serialport::StopBits::One)
                .parity(serialport::Parity::None)
                .flow_control(serialport::FlowControl::None);
        }
        let mut port = builder.open()?;
        let _ = port.write_data_terminal_ready(true);
        let _ = port.write_request_to_send(true);

        // Clear any existing buffered startup text
        let mut purged = 0usize;
        let mut purge_buf = [0u8; 512];
        if let Ok(waiting) = port.bytes_to_read() {
            if waiting > 0 {
                purged = port.read(&mut purge_buf).unwrap_or(0);
            }
        }
        debug!("Serial port initialized, purged {} stale bytes", purged);

        Ok(Self {
            port,
            pending: VecDeque::with_capacity(READ_CHUNK),
        })
    }

    fn fill(&mut self) -> io::Result<()> {
        let waiting = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if waiting == 0 {
            return Ok(());
        }
        let mut chunk = [0u8; READ_CHUNK];
        let want = waiting.min(READ_CHUNK);
        match self.port.read(&mut chunk[..want]) {
            Ok(n) => {
                self.pending.extend(&chunk[..n]);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl ByteSource for SerialTransport {
    fn available(&mut self) -> io::Result<usize> {
        if self.pending.is_empty() {
            self.fill()?;
        }
        Ok(self.pending.len())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pending.is_empty() {
            self.fill()?;
        }
        Ok(self.pending.pop_front())
    }
}

impl ByteSink for SerialTransport {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }
}
