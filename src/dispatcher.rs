//! Packet dispatcher boundary.
//!
//! The modem hands validated Data frame payloads to a [`PacketDispatcher`], which
//! owns routing, scheduling and the radio. The binary uses [`QueueDispatcher`] to
//! push packets onto a tokio channel consumed by the radio task.

use log::warn;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::error::{Result, TncError};

/// Largest payload the radio accepts in one packet.
pub const MAX_PACKET_PAYLOAD: usize = 255;

/// Priority used for packets submitted from KISS Data frames.
pub const DATA_PRIORITY: u8 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    payload: Vec<u8>,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the packet contents with `raw`.
    pub fn read_from(&mut self, raw: &[u8]) -> Result<()> {
        if raw.len() > MAX_PACKET_PAYLOAD {
            return Err(TncError::PacketTooLarge {
                len: raw.len(),
                max: MAX_PACKET_PAYLOAD,
            });
        }
        self.payload.clear();
        self.payload.extend_from_slice(raw);
        Ok(())
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

pub trait PacketDispatcher {
    /// Get an empty packet, or `None` when the pool is exhausted.
    fn obtain_packet(&mut self) -> Option<Packet>;

    /// Fill `packet` from a raw payload.
    ///
    /// Oversized payloads are cut to [`MAX_PACKET_PAYLOAD`] so that truncated
    /// KISS frames still go out.
    fn populate_packet(&mut self, packet: &mut Packet, raw: &[u8]) -> Result<()> {
        let raw = if raw.len() > MAX_PACKET_PAYLOAD {
            warn!(
                "Payload of {} bytes exceeds packet limit, truncating to {}",
                raw.len(),
                MAX_PACKET_PAYLOAD
            );
            &raw[..MAX_PACKET_PAYLOAD]
        } else {
            raw
        };
        packet.read_from(raw)
    }

    /// Queue a populated packet for transmission after `delay_ms`.
    fn submit_packet(&mut self, packet: Packet, priority: u8, delay_ms: u32) -> Result<()>;
}

/// Packet queued for the radio.
#[derive(Debug, Clone)]
pub struct OutboundPacket {
    pub payload: Vec<u8>,
    pub priority: u8,
    pub delay: Duration,
    pub submitted_at: Instant,
}

impl OutboundPacket {
    /// Earliest instant the radio may key up for this packet.
    pub fn due_at(&self) -> Instant {
        self.submitted_at + self.delay
    }
}

/// Dispatcher that forwards packets over an unbounded tokio channel.
pub struct QueueDispatcher {
    tx: mpsc::UnboundedSender<OutboundPacket>,
}

impl QueueDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<OutboundPacket>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundPacket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl PacketDispatcher for QueueDispatcher {
    fn obtain_packet(&mut self) -> Option<Packet> {
        if self.tx.is_closed() {
            return None;
        }
        Some(Packet::new())
    }

    fn submit_packet(&mut self, packet: Packet, priority: u8, delay_ms: u32) -> Result<()> {
        self.tx
            .send(OutboundPacket {
                payload: packet.into_payload(),
                priority,
                delay: Duration::from_millis(delay_ms as u64),
                submitted_at: Instant::now(),
            })
            .map_err(|_| TncError::DispatcherClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_rejects_oversize_payload() {
        let mut p = Packet::new();
        assert!(p.read_from(&[0u8; MAX_PACKET_PAYLOAD]).is_ok());
        assert!(matches!(
            p.read_from(&[0u8; MAX_PACKET_PAYLOAD + 1]),
            Err(TncError::PacketTooLarge { .. })
        ));
        assert_eq!(p.len(), MAX_PACKET_PAYLOAD);
    }

    #[test]
    fn populate_truncates_instead_of_failing() {
        let (mut d, _rx) = QueueDispatcher::channel();
        let mut p = d.obtain_packet().expect("packet");
        d.populate_packet(&mut p, &[7u8; 400]).expect("populate");
        assert_eq!(p.len(), MAX_PACKET_PAYLOAD);
    }

    #[tokio::test]
    async fn queue_dispatcher_forwards_packets() {
        let (mut d, mut rx) = QueueDispatcher::channel();
        let mut p = d.obtain_packet().unwrap();
        d.populate_packet(&mut p, b"hello").unwrap();
        d.submit_packet(p, DATA_PRIORITY, 500).unwrap();

        let out = rx.recv().await.expect("packet");
        assert_eq!(out.payload, b"hello");
        assert_eq!(out.priority, DATA_PRIORITY);
        assert_eq!(out.delay, Duration::from_millis(500));
        assert!(out.due_at() >= out.submitted_at);
    }

    #[test]
    fn closed_queue_yields_no_packets() {
        let (mut d, rx) = QueueDispatcher::channel();
        drop(rx);
        assert!(d.obtain_packet().is_none());
        assert!(matches!(
            d.submit_packet(Packet::new(), DATA_PRIORITY, 0),
            Err(TncError::DispatcherClosed)
        ));
    }
}
