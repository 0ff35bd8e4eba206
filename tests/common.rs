//! Test utilities & fixtures.
//! Provides a dispatcher that records submissions and helpers for building frames.

use meshtnc::dispatcher::{Packet, PacketDispatcher};
use meshtnc::kiss::{KissModem, Port};
use meshtnc::mode::{CliMode, ModeHandle};
use meshtnc::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub payload: Vec<u8>,
    pub priority: u8,
    pub delay_ms: u32,
}

/// Dispatcher that keeps every submitted packet for inspection.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    pub submitted: Vec<Submitted>,
    /// When set, `obtain_packet` reports an exhausted pool.
    pub exhausted: bool,
}

impl PacketDispatcher for RecordingDispatcher {
    fn obtain_packet(&mut self) -> Option<Packet> {
        if self.exhausted {
            None
        } else {
            Some(Packet::new())
        }
    }

    fn submit_packet(&mut self, packet: Packet, priority: u8, delay_ms: u32) -> Result<()> {
        self.submitted.push(Submitted {
            payload: packet.into_payload(),
            priority,
            delay_ms,
        });
        Ok(())
    }
}

/// Modem on `port` in KISS mode with a recording dispatcher.
#[allow(dead_code)]
pub fn kiss_modem(port: Port) -> KissModem<RecordingDispatcher> {
    KissModem::new(
        port,
        RecordingDispatcher::default(),
        ModeHandle::new(CliMode::Kiss),
    )
}

/// Wrap already-stuffed bytes in delimiters: `[FEND][header][body][FEND]`.
#[allow(dead_code)]
pub fn raw_frame(header: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![0xC0, header];
    out.extend_from_slice(body);
    out.push(0xC0);
    out
}
