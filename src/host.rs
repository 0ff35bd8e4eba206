//! Serial host loop.
//!
//! Owns the transport and the modem and decides, tick by tick, whether incoming
//! bytes go to the KISS modem or to the line-based CLI. Only the handful of CLI
//! commands needed to manage KISS mode are understood here.

use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::dispatcher::PacketDispatcher;
use crate::error::Result;
use crate::kiss::{KissModem, Port};
use crate::logutil::{escape_serial, hex_snippet};
use crate::transport::Transport;

/// A packet heard on the radio, waiting to be reported to the host.
#[derive(Debug, Clone)]
pub struct ReceivedPacket {
    pub raw: Vec<u8>,
    pub rssi: f32,
    pub snr: f32,
    /// Report on this port instead of the modem's own (e.g. BLE sightings).
    pub port: Option<Port>,
}

pub struct TncHost<T, D> {
    transport: T,
    modem: KissModem<D>,
    line: Vec<u8>,
    line_capacity: usize,
}

impl<T: Transport, D: PacketDispatcher> TncHost<T, D> {
    pub fn new(transport: T, modem: KissModem<D>) -> Self {
        let line_capacity = modem.deframer().capacity();
        Self {
            transport,
            modem,
            line: Vec::new(),
            line_capacity,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn modem(&self) -> &KissModem<D> {
        &self.modem
    }

    pub fn modem_mut(&mut self) -> &mut KissModem<D> {
        &mut self.modem
    }

    /// Process everything currently waiting on the transport.
    pub fn tick(&mut self) -> Result<()> {
        loop {
            if self.modem.mode().is_kiss() {
                self.modem.service(&mut self.transport)?;
                if self.modem.mode().is_kiss() {
                    return Ok(());
                }
            } else if !self.service_cli()? {
                return Ok(());
            }
        }
    }

    /// Report a received radio packet to the host in whichever mode is active.
    pub fn forward_received(&mut self, packet: &ReceivedPacket) -> Result<()> {
        if self.modem.mode().is_kiss() {
            return self.modem.forward_received(
                &packet.raw,
                packet.rssi,
                packet.snr,
                packet.port,
                &mut self.transport,
            );
        }
        self.modem.stats_mut().inc_rx();
        let line = format!(
            "{},RXLOG,{:.2},{:.2},{}\r\n",
            chrono::Utc::now().timestamp(),
            packet.rssi,
            packet.snr,
            hex_snippet(&packet.raw, packet.raw.len())
        );
        self.transport.write_bytes(line.as_bytes())?;
        Ok(())
    }

    /// Run until `shutdown` flips to true.
    pub async fn run(
        mut self,
        poll_interval: Duration,
        mut received: mpsc::UnboundedReceiver<ReceivedPacket>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        info!("Starting TNC host loop on {}", self.modem.port());
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Host loop received shutdown signal");
                        break;
                    }
                }
                Some(packet) = received.recv() => {
                    if let Err(e) = self.forward_received(&packet) {
                        warn!("Failed to forward received packet: {}", e);
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        error!("Serial error: {} - continuing operation", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }

        match serde_json::to_string(&self.modem.stats()) {
            Ok(json) => info!("TNC host loop shutting down, stats: {}", json),
            Err(e) => warn!("TNC host loop shutting down, stats unavailable: {}", e),
        }
        Ok(())
    }

    /// Feed waiting bytes to the line editor. Returns true once KISS mode is entered.
    fn service_cli(&mut self) -> Result<bool> {
        while self.transport.available()? > 0 {
            let Some(b) = self.transport.read_byte()? else {
                break;
            };
            if b == b'\r' || b == b'\n' {
                if self.line.is_empty() {
                    continue;
                }
                let line = std::mem::take(&mut self.line);
                debug!("CLI: {}", escape_serial(&line));
                self.handle_line(&String::from_utf8_lossy(&line))?;
                if self.modem.mode().is_kiss() {
                    return Ok(true);
                }
            } else if self.line.len() < self.line_capacity {
                self.line.push(b);
            }
        }
        Ok(false)
    }

    fn handle_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        let reply = match line {
            "serial mode kiss" => {
                self.modem.reset();
                self.modem.mode().enter_kiss();
                "OK".to_string()
            }
            "get kiss port" => format!("> {}", self.modem.port().value()),
            _ => match line.strip_prefix("set kiss port ") {
                Some(arg) => match arg.trim().parse::<u8>().map(Port::assignable) {
                    Ok(Ok(port)) => {
                        self.modem.set_port(port);
                        info!("KISS port set to {}", port);
                        "OK".to_string()
                    }
                    _ => "Error: invalid port".to_string(),
                },
                None => "Error: unknown command".to_string(),
            },
        };
        self.transport.write_bytes(format!("{}\r\n", reply).as_bytes())?;
        Ok(())
    }
}
