//! # MeshTNC - KISS TNC for LoRa Mesh Radios
//!
//! MeshTNC lets a host computer drive a LoRa mesh radio as a KISS TNC. One serial
//! link carries several logical ports; frames are delimited with `0xC0` and
//! byte-stuffed so payloads may contain any byte value.
//!
//! ## Features
//!
//! - **KISS Codec**: Bounded, resumable deframer and capacity-checked encoder.
//! - **Command Routing**: TxDelay, Data and Return commands plus vendor extensions.
//! - **Vendor Extensions**: Radio statistics and per-packet SNR/RSSI reporting.
//! - **Mode Switching**: Shared CLI/KISS flag so a text console and the modem can share one port.
//! - **Serial Transport**: Non-blocking `serialport` backend and an in-memory transport for tests.
//!
//! ## Quick Start
//!
//! ```rust
//! use meshtnc::dispatcher::QueueDispatcher;
//! use meshtnc::kiss::{KissModem, Port};
//! use meshtnc::mode::{CliMode, ModeHandle};
//! use meshtnc::transport::MemoryTransport;
//!
//! let (dispatcher, mut packets) = QueueDispatcher::channel();
//! let mode = ModeHandle::new(CliMode::Kiss);
//! let mut modem = KissModem::new(Port::LORA, dispatcher, mode);
//!
//! let mut link = MemoryTransport::new();
//! link.push_rx(&[0xC0, 0x00, b'h', b'i', 0xC0]);
//! modem.service(&mut link).unwrap();
//!
//! let packet = packets.try_recv().unwrap();
//! assert_eq!(packet.payload, b"hi");
//! ```
//!
//! ## Module Organization
//!
//! - [`kiss`] - framing, deframing and command routing
//! - [`dispatcher`] - packet hand-off to the radio side
//! - [`transport`] - serial link abstraction
//! - [`mode`] - shared CLI/KISS mode flag
//! - [`host`] - polling loop tying transport, CLI and modem together
//! - [`config`] - configuration management and validation
//! - [`stats`] - radio and framing counters
//!
//! ## Architecture
//!
//! ```text
//! serial bytes ─▶ KissDeframer ─▶ command router ─▶ PacketDispatcher ─▶ radio
//!                                       │
//!                                       └─▶ encoder ─▶ serial (vendor replies)
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod kiss;
pub mod logutil;
pub mod mode;
pub mod stats;
pub mod transport;

pub use error::{Result, TncError};
