//! # Serial Transport Module
//!
//! The modem only needs three things from the link to the host: whether a byte is
//! waiting, reading that byte, and writing a block of bytes. Reads never block.
//!
//! - [`SerialTransport`] - a real serial port (feature `serial`)
//! - [`MemoryTransport`] - in-memory loopback used by tests and offline tools

use std::collections::VecDeque;
use std::io;

#[cfg(feature = "serial")]
mod serial;
#[cfg(feature = "serial")]
pub use serial::SerialTransport;

pub trait ByteSource {
    /// Bytes that can be read right now without blocking.
    fn available(&mut self) -> io::Result<usize>;

    /// Next byte, or `None` if nothing is waiting.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

pub trait ByteSink {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()>;
}

/// Full-duplex link to the host.
pub trait Transport: ByteSource + ByteSink {}

impl<T: ByteSource + ByteSink + ?Sized> Transport for T {}

impl ByteSink for Vec<u8> {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the host had sent them.
    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    /// Bytes the modem wrote so far.
    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }
}

impl ByteSource for MemoryTransport {
    fn available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.rx.pop_front())
    }
}

impl ByteSink for MemoryTransport {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.tx.extend_from_slice(data);
        Ok(())
    }
}
