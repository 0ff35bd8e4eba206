//! Vendor (command 0x6) sub-commands and their reply payloads.
//!
//! Every multi-byte field is big-endian.
//!
//! ```text
//! GetRadioStats reply  [0x01][noise:i8][rx:u32][tx:u32][airtime_s:u32][uptime_s:u32]
//! SignalReporting ack  [0x80][enabled:u8]
//! SignalReport         [0x80][timestamp_ms:u64][rssi:i16][snr_q:i8][pkt_len:u16]
//! unknown sub-command  [0xFF]
//! ```

use crate::stats::StatsSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VendorCommand {
    /// Report radio counters; takes no arguments.
    GetRadioStats,
    /// Toggle per-packet SNR/RSSI reports; next byte non-zero enables.
    SignalReporting,
    Unknown(u8),
}

impl From<u8> for VendorCommand {
    fn from(value: u8) -> Self {
        match value {
            0x01 => VendorCommand::GetRadioStats,
            0x80 => VendorCommand::SignalReporting,
            other => VendorCommand::Unknown(other),
        }
    }
}

impl From<VendorCommand> for u8 {
    fn from(cmd: VendorCommand) -> u8 {
        match cmd {
            VendorCommand::GetRadioStats => 0x01,
            VendorCommand::SignalReporting => 0x80,
            VendorCommand::Unknown(n) => n,
        }
    }
}

pub const RADIO_STATS_LEN: usize = 18;
pub const SIGNAL_REPORT_LEN: usize = 14;

/// Encode a stats snapshot as a GetRadioStats reply payload.
pub fn radio_stats_payload(stats: &StatsSnapshot) -> Vec<u8> {
    let mut out = Vec::with_capacity(RADIO_STATS_LEN);
    out.push(VendorCommand::GetRadioStats.into());
    out.push(stats.noise_floor as u8);
    out.extend_from_slice(&stats.rx_count.to_be_bytes());
    out.extend_from_slice(&stats.tx_count.to_be_bytes());
    out.extend_from_slice(&clamp_u32(stats.tx_airtime_secs).to_be_bytes());
    out.extend_from_slice(&clamp_u32(stats.uptime_secs).to_be_bytes());
    out
}

fn clamp_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Per-packet signal quality sent ahead of a received Data frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalReport {
    pub timestamp_ms: u64,
    pub rssi: f32,
    pub snr: f32,
    pub pkt_len: u16,
}

impl SignalReport {
    pub fn to_payload(&self) -> Vec<u8> {
        let rssi = self.rssi.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        // quarter-dB units, the same resolution LoRa radios report SNR in
        let snr = (self.snr * 4.0).round().clamp(i8::MIN as f32, i8::MAX as f32) as i8;
        let mut out = Vec::with_capacity(SIGNAL_REPORT_LEN);
        out.push(VendorCommand::SignalReporting.into());
        out.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        out.extend_from_slice(&rssi.to_be_bytes());
        out.push(snr as u8);
        out.extend_from_slice(&self.pkt_len.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_command_codes() {
        assert_eq!(VendorCommand::from(0x01), VendorCommand::GetRadioStats);
        assert_eq!(VendorCommand::from(0x80), VendorCommand::SignalReporting);
        assert_eq!(VendorCommand::from(0x7F), VendorCommand::Unknown(0x7F));
        assert_eq!(u8::from(VendorCommand::Unknown(0x42)), 0x42);
    }

    #[test]
    fn stats_payload_layout() {
        let snap = StatsSnapshot {
            noise_floor: -110,
            rx_count: 0x0102_0304,
            tx_count: 7,
            tx_airtime_secs: 12,
            uptime_secs: u64::MAX,
            ..Default::default()
        };
        let p = radio_stats_payload(&snap);
        assert_eq!(p.len(), RADIO_STATS_LEN);
        assert_eq!(p[0], 0x01);
        assert_eq!(p[1] as i8, -110);
        assert_eq!(&p[2..6], &[1, 2, 3, 4]);
        assert_eq!(&p[6..10], &[0, 0, 0, 7]);
        assert_eq!(&p[10..14], &[0, 0, 0, 12]);
        assert_eq!(&p[14..18], &[0xFF; 4]);
    }

    #[test]
    fn signal_report_layout() {
        let report = SignalReport {
            timestamp_ms: 1,
            rssi: -97.6,
            snr: -7.25,
            pkt_len: 300,
        };
        let p = report.to_payload();
        assert_eq!(p.len(), SIGNAL_REPORT_LEN);
        assert_eq!(p[0], 0x80);
        assert_eq!(&p[1..9], &1u64.to_be_bytes());
        assert_eq!(i16::from_be_bytes([p[9], p[10]]), -98);
        assert_eq!(p[11] as i8, -29);
        assert_eq!(u16::from_be_bytes([p[12], p[13]]), 300);
    }
}
