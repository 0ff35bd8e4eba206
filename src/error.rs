use thiserror::Error;

/// Errors surfaced by the TNC outside of the framing path.
///
/// Malformed KISS input never produces one of these; the deframer recovers
/// locally and keeps going.
#[derive(Debug, Error)]
pub enum TncError {
    /// Wrapper around IO errors from the transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around serial port errors.
    #[cfg(feature = "serial")]
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// Returned by the checked encoder when the output buffer cannot hold the frame.
    #[error("insufficient capacity: need {needed} bytes, have {available}")]
    InsufficientCapacity { needed: usize, available: usize },

    /// Port numbers are a single nibble; 0xF is reserved for the global channel.
    #[error("invalid kiss port: {0}")]
    InvalidPort(u8),

    /// Payload does not fit into a radio packet.
    #[error("packet too large: {len} bytes (max {max})")]
    PacketTooLarge { len: usize, max: usize },

    /// The packet dispatcher is gone and cannot accept more packets.
    #[error("dispatcher closed")]
    DispatcherClosed,

    /// Invalid configuration values.
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TncError>;
