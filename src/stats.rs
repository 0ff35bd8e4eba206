//! Radio and framing counters.
//!
//! Owned by the modem instance (no process-wide statics) and reported to the host
//! through the GetRadioStats vendor command.
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::kiss::DeframerCounters;

#[derive(Debug, Clone)]
pub struct RadioStats {
    started: Instant,
    noise_floor: i8,
    rx_count: u32,
    tx_count: u32,
    tx_airtime: Duration,
    frames_routed: u64,
    frames_unaddressed: u64,
}

impl Default for RadioStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            noise_floor: 0,
            rx_count: 0,
            tx_count: 0,
            tx_airtime: Duration::ZERO,
            frames_routed: 0,
            frames_unaddressed: 0,
        }
    }

    pub fn inc_rx(&mut self) {
        self.rx_count = self.rx_count.wrapping_add(1);
    }

    pub fn inc_tx(&mut self) {
        self.tx_count = self.tx_count.wrapping_add(1);
    }

    /// Hook for the radio driver, which measures airtime and reports it after each
    /// send through [`KissModem::stats_mut`](crate::kiss::KissModem::stats_mut).
    /// Without a driver attached the reported airtime stays at zero.
    pub fn add_tx_airtime(&mut self, airtime: Duration) {
        self.tx_airtime = self.tx_airtime.saturating_add(airtime);
    }

    /// Driver hook, like [`RadioStats::add_tx_airtime`]; 0 until a driver reports.
    pub fn set_noise_floor(&mut self, dbm: i8) {
        self.noise_floor = dbm;
    }

    pub fn inc_routed(&mut self) {
        self.frames_routed += 1;
    }

    pub fn inc_unaddressed(&mut self) {
        self.frames_unaddressed += 1;
    }

    pub fn snapshot(&self, framing: DeframerCounters) -> StatsSnapshot {
        StatsSnapshot {
            noise_floor: self.noise_floor,
            rx_count: self.rx_count,
            tx_count: self.tx_count,
            tx_airtime_secs: self.tx_airtime.as_secs(),
            uptime_secs: self.started.elapsed().as_secs(),
            frames_routed: self.frames_routed,
            frames_unaddressed: self.frames_unaddressed,
            frames_aborted: framing.aborted,
            dropped_escapes: framing.dropped_escapes,
            frames_truncated: framing.truncated,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub noise_floor: i8,
    pub rx_count: u32,
    pub tx_count: u32,
    pub tx_airtime_secs: u64,
    pub uptime_secs: u64,
    pub frames_routed: u64,
    pub frames_unaddressed: u64,
    pub frames_aborted: u64,
    pub dropped_escapes: u64,
    pub frames_truncated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut stats = RadioStats::new();
        stats.inc_rx();
        stats.inc_tx();
        stats.inc_tx();
        stats.add_tx_airtime(Duration::from_millis(1500));
        stats.add_tx_airtime(Duration::from_millis(600));
        stats.set_noise_floor(-118);

        let framing = DeframerCounters {
            aborted: 2,
            ..Default::default()
        };
        let snap = stats.snapshot(framing);
        assert_eq!(snap.rx_count, 1);
        assert_eq!(snap.tx_count, 2);
        assert_eq!(snap.tx_airtime_secs, 2);
        assert_eq!(snap.noise_floor, -118);
        assert_eq!(snap.frames_aborted, 2);
    }

    #[test]
    fn snapshot_serializes_for_logs() {
        let mut stats = RadioStats::new();
        stats.inc_rx();
        stats.set_noise_floor(-110);
        let json = serde_json::to_value(stats.snapshot(DeframerCounters::default())).unwrap();
        assert_eq!(json["rx_count"], 1);
        assert_eq!(json["noise_floor"], -110);
        assert_eq!(json["frames_truncated"], 0);
    }
}
