//! KISS modem: deframer plus command routing.
//!
//! One modem instance serves one configured port. Frames for the global port are
//! inspected for the Return command; frames for any other port are ignored.

use log::{debug, info, trace, warn};

use super::vendor::{radio_stats_payload, SignalReport, VendorCommand};
use super::{
    encode_frame, split_header, Command, KissDeframer, Port, CMD_BUF_LEN_MAX, VENDOR_ERROR,
};
use crate::dispatcher::{PacketDispatcher, DATA_PRIORITY};
use crate::error::Result;
use crate::logutil::hex_snippet;
use crate::mode::ModeHandle;
use crate::stats::{RadioStats, StatsSnapshot};
use crate::transport::{ByteSink, Transport};

/// Line written to the host when the modem hands the link back to the CLI.
pub const RETURN_NOTICE: &[u8] = b"  -> Exiting KISS mode and returning to CLI mode.\r\n";

pub struct KissModem<D> {
    port: Port,
    deframer: KissDeframer,
    reply_capacity: usize,
    tx_delay_ms: u32,
    signal_reporting: bool,
    dispatcher: D,
    mode: ModeHandle,
    stats: RadioStats,
}

impl<D: PacketDispatcher> KissModem<D> {
    pub fn new(port: Port, dispatcher: D, mode: ModeHandle) -> Self {
        Self::with_capacity(port, dispatcher, mode, CMD_BUF_LEN_MAX, CMD_BUF_LEN_MAX)
    }

    pub fn with_capacity(
        port: Port,
        dispatcher: D,
        mode: ModeHandle,
        command_capacity: usize,
        reply_capacity: usize,
    ) -> Self {
        Self {
            port,
            deframer: KissDeframer::new(command_capacity),
            reply_capacity,
            tx_delay_ms: 0,
            signal_reporting: false,
            dispatcher,
            mode,
            stats: RadioStats::new(),
        }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn set_port(&mut self, port: Port) {
        self.port = port;
    }

    pub fn tx_delay_ms(&self) -> u32 {
        self.tx_delay_ms
    }

    pub fn signal_reporting(&self) -> bool {
        self.signal_reporting
    }

    pub fn mode(&self) -> &ModeHandle {
        &self.mode
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn deframer(&self) -> &KissDeframer {
        &self.deframer
    }

    pub fn stats_mut(&mut self) -> &mut RadioStats {
        &mut self.stats
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.deframer.counters())
    }

    /// Drop any partial frame and pending escape.
    pub fn reset(&mut self) {
        self.deframer.reset();
    }

    /// Frame a payload for the host, on `port` or the modem's own port.
    pub fn encode(&self, command: Command, port: Option<Port>, payload: &[u8]) -> Vec<u8> {
        encode_frame(
            command,
            port.unwrap_or(self.port),
            payload,
            self.reply_capacity,
        )
    }

    /// One polling tick: consume everything the transport has ready.
    ///
    /// Stops early when a frame hands the link back to the CLI so the remaining
    /// bytes are left for it. Returns the number of frames routed.
    pub fn service<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<usize> {
        let mut routed = 0;
        while transport.available()? > 0 {
            let Some(b) = transport.read_byte()? else {
                break;
            };
            if let Some(frame) = self.deframer.feed(b) {
                self.route(0, &frame, transport)?;
                routed += 1;
                if !self.mode.is_kiss() {
                    break;
                }
            }
        }
        Ok(routed)
    }

    /// Interpret one completed command buffer.
    pub fn route<W: ByteSink + ?Sized>(
        &mut self,
        sender_timestamp: u32,
        frame: &[u8],
        sink: &mut W,
    ) -> Result<()> {
        let Some((&head, data)) = frame.split_first() else {
            return Ok(());
        };
        let (port, command) = split_header(head);
        self.stats.inc_routed();

        if port.is_global() && command == Command::Return {
            self.deframer.reset();
            self.mode.return_to_cli();
            info!("Exiting KISS mode and returning to CLI mode");
            sink.write_bytes(RETURN_NOTICE)?;
            return Ok(());
        }

        if port != self.port {
            trace!("Ignoring {:?} frame for {}", command, port);
            self.stats.inc_unaddressed();
            return Ok(());
        }

        debug!("KISS {:?} on {} ({} data bytes)", command, port, data.len());
        match command {
            Command::TxDelay => {
                if !data.is_empty() {
                    // 10ms units, sent as decimal text
                    self.tx_delay_ms = parse_ascii_decimal(data).saturating_mul(10);
                    debug!("TX delay set to {}ms", self.tx_delay_ms);
                }
            }
            Command::Data => {
                if frame.len() > 1 {
                    self.submit_data(sender_timestamp, data);
                }
            }
            Command::Vendor => {
                if frame.len() > 1 {
                    self.route_vendor(sender_timestamp, data, sink)?;
                }
            }
            Command::Persist | Command::SlotTime | Command::TxTail | Command::FullDuplex => {
                trace!("{:?} not supported, ignoring", command);
            }
            Command::Return | Command::Unknown(_) => {}
        }
        Ok(())
    }

    /// Handle `[sub-command][vendor data...]` from a Vendor frame.
    pub fn route_vendor<W: ByteSink + ?Sized>(
        &mut self,
        _sender_timestamp: u32,
        vendor_data: &[u8],
        sink: &mut W,
    ) -> Result<()> {
        let Some((&sub, args)) = vendor_data.split_first() else {
            return Ok(());
        };
        let reply = match VendorCommand::from(sub) {
            VendorCommand::GetRadioStats => radio_stats_payload(&self.stats()),
            VendorCommand::SignalReporting => {
                self.signal_reporting = args.first().is_some_and(|&b| b != 0);
                info!(
                    "Signal reporting {}",
                    if self.signal_reporting { "enabled" } else { "disabled" }
                );
                vec![sub, self.signal_reporting as u8]
            }
            VendorCommand::Unknown(code) => {
                debug!("Unknown vendor command {:02x}", code);
                vec![VENDOR_ERROR]
            }
        };
        let out = self.encode(Command::Vendor, None, &reply);
        sink.write_bytes(&out)?;
        Ok(())
    }

    /// Forward a packet heard on the radio to the host as a Data frame.
    ///
    /// With signal reporting on, a SignalReport vendor frame goes out first.
    pub fn forward_received<W: ByteSink + ?Sized>(
        &mut self,
        raw: &[u8],
        rssi: f32,
        snr: f32,
        port: Option<Port>,
        sink: &mut W,
    ) -> Result<()> {
        self.stats.inc_rx();
        if self.signal_reporting {
            let report = SignalReport {
                timestamp_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
                rssi,
                snr,
                pkt_len: u16::try_from(raw.len()).unwrap_or(u16::MAX),
            };
            let out = self.encode(Command::Vendor, port, &report.to_payload());
            sink.write_bytes(&out)?;
        }
        let out = self.encode(Command::Data, port, raw);
        trace!("RX {} bytes -> host: {}", raw.len(), hex_snippet(raw, 32));
        sink.write_bytes(&out)?;
        Ok(())
    }

    fn submit_data(&mut self, _sender_timestamp: u32, payload: &[u8]) {
        let Some(mut packet) = self.dispatcher.obtain_packet() else {
            warn!("No packet available, dropping {} byte Data frame", payload.len());
            return;
        };
        if let Err(e) = self.dispatcher.populate_packet(&mut packet, payload) {
            warn!("Failed to populate packet: {}", e);
            return;
        }
        match self
            .dispatcher
            .submit_packet(packet, DATA_PRIORITY, self.tx_delay_ms)
        {
            Ok(()) => self.stats.inc_tx(),
            Err(e) => warn!("Failed to submit packet: {}", e),
        }
    }
}

/// Parse leading decimal text the way C's `atoi` does.
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit, garbage yields 0. Negative values clamp to 0 and large values
/// saturate at `u32::MAX`.
pub fn parse_ascii_decimal(data: &[u8]) -> u32 {
    let mut rest = data;
    while let Some((&b, tail)) = rest.split_first() {
        if !b.is_ascii_whitespace() {
            break;
        }
        rest = tail;
    }
    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };
    let value = rest
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u32, |acc, &b| {
            acc.saturating_mul(10).saturating_add((b - b'0') as u32)
        });
    if negative {
        0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atoi_semantics() {
        assert_eq!(parse_ascii_decimal(b"50"), 50);
        assert_eq!(parse_ascii_decimal(b"  7ms"), 7);
        assert_eq!(parse_ascii_decimal(b"+12"), 12);
        assert_eq!(parse_ascii_decimal(b"-3"), 0);
        assert_eq!(parse_ascii_decimal(b"abc"), 0);
        assert_eq!(parse_ascii_decimal(b"\x32"), 2);
        assert_eq!(parse_ascii_decimal(b"99999999999"), u32::MAX);
    }
}
