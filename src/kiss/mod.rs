//! # KISS TNC Protocol Module
//!
//! This module implements the KISS (Keep It Simple, Stupid) framing used between a
//! host controller and the TNC over a single serial link. One serial link carries
//! several logical radio ports; each frame names its target port in the high nibble
//! of the header byte.
//!
//! ## Wire Format
//!
//! ```text
//! [FEND][header][stuffed payload...][FEND]
//!
//! header  = (port << 4) | command
//! FEND    = 0xC0   frame delimiter
//! FESC    = 0xDB   escape
//! TFEND   = 0xDC   escaped FEND
//! TFESC   = 0xDD   escaped FESC
//! ```
//!
//! Vendor frames (command 0x6) carry `[sub-command][vendor data...]`.
//!
//! ## Components
//!
//! - [`frame`] - byte-stuffing encoder with a hard output capacity
//! - [`deframer`] - resumable byte-at-a-time decoder with bounded memory
//! - [`modem`] - command router, vendor sub-router and radio-to-host forwarding
//! - [`vendor`] - payload encodings for vendor replies
//!
//! See <https://www.ax25.net/kiss.aspx> for the classic protocol description.

use std::fmt;

use crate::error::{Result, TncError};

pub mod deframer;
pub mod frame;
pub mod modem;
pub mod vendor;

pub use deframer::{DeframerCounters, KissDeframer};
pub use frame::{encode_frame, try_encode_frame, FrameWriter};
pub use modem::KissModem;
pub use vendor::{SignalReport, VendorCommand};

pub const FEND: u8 = 0xC0; // frame delimiter
pub const FESC: u8 = 0xDB;
pub const TFEND: u8 = 0xDC;
pub const TFESC: u8 = 0xDD;

pub const PORT_MASK: u8 = 0xF0;
pub const CMD_MASK: u8 = 0x0F;

/// Command buffer size used by the reference firmware.
pub const CMD_BUF_LEN_MAX: usize = 500;

/// Sentinel payload returned for vendor sub-commands the TNC does not know.
pub const VENDOR_ERROR: u8 = 0xFF;

/// Logical KISS port (one nibble).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port(u8);

impl Port {
    pub const LORA: Port = Port(0x0);
    pub const GPS: Port = Port(0x1);
    pub const BLE: Port = Port(0x2);
    pub const WIFI: Port = Port(0x3);
    /// Broadcast channel understood by every modem regardless of its own port.
    pub const GLOBAL: Port = Port(0xF);

    /// Build a port from a raw value, rejecting anything wider than a nibble.
    pub fn new(value: u8) -> Result<Self> {
        if value > 0x0F {
            return Err(TncError::InvalidPort(value));
        }
        Ok(Port(value))
    }

    /// Port a modem may be configured for. The global channel is reserved.
    pub fn assignable(value: u8) -> Result<Self> {
        match Port::new(value)? {
            Port::GLOBAL => Err(TncError::InvalidPort(value)),
            port => Ok(port),
        }
    }

    pub fn from_nibble(value: u8) -> Self {
        Port(value & 0x0F)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_global(self) -> bool {
        self == Port::GLOBAL
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Port::LORA => write!(f, "lora(0)"),
            Port::GPS => write!(f, "gps(1)"),
            Port::BLE => write!(f, "ble(2)"),
            Port::WIFI => write!(f, "wifi(3)"),
            Port::GLOBAL => write!(f, "global(15)"),
            Port(n) => write!(f, "port({})", n),
        }
    }
}

/// Low nibble of the header byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Data,
    TxDelay,
    Persist,
    SlotTime,
    TxTail,
    FullDuplex,
    Vendor,
    Return,
    Unknown(u8),
}

impl Command {
    pub fn from_nibble(value: u8) -> Self {
        match value & CMD_MASK {
            0x0 => Command::Data,
            0x1 => Command::TxDelay,
            0x2 => Command::Persist,
            0x3 => Command::SlotTime,
            0x4 => Command::TxTail,
            0x5 => Command::FullDuplex,
            0x6 => Command::Vendor,
            0xF => Command::Return,
            other => Command::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Command::Data => 0x0,
            Command::TxDelay => 0x1,
            Command::Persist => 0x2,
            Command::SlotTime => 0x3,
            Command::TxTail => 0x4,
            Command::FullDuplex => 0x5,
            Command::Vendor => 0x6,
            Command::Return => 0xF,
            Command::Unknown(n) => n & CMD_MASK,
        }
    }
}

/// Pack a port and command into a header byte.
pub fn header(port: Port, command: Command) -> u8 {
    ((port.value() << 4) & PORT_MASK) | (command.code() & CMD_MASK)
}

/// Split a header byte into its port and command.
pub fn split_header(byte: u8) -> (Port, Command) {
    (
        Port::from_nibble((byte & PORT_MASK) >> 4),
        Command::from_nibble(byte & CMD_MASK),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packs_port_high_nibble() {
        assert_eq!(header(Port::LORA, Command::Data), 0x00);
        assert_eq!(header(Port::BLE, Command::Vendor), 0x26);
        assert_eq!(header(Port::GLOBAL, Command::Return), 0xFF);
    }

    #[test]
    fn split_header_recovers_parts() {
        assert_eq!(split_header(0x31), (Port::WIFI, Command::TxDelay));
        assert_eq!(split_header(0xFF), (Port::GLOBAL, Command::Return));
        assert_eq!(split_header(0x07), (Port::LORA, Command::Unknown(7)));
    }

    #[test]
    fn global_port_is_not_assignable() {
        assert!(Port::assignable(0).is_ok());
        assert!(Port::assignable(14).is_ok());
        assert!(matches!(
            Port::assignable(15),
            Err(TncError::InvalidPort(15))
        ));
        assert!(matches!(Port::new(16), Err(TncError::InvalidPort(16))));
    }
}
