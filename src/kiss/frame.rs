//! KISS frame encoder.
//!
//! Output is bounded by a caller supplied capacity. The plain encoder truncates the
//! payload silently when it runs out of room; [`try_encode_frame`] reports the
//! shortfall instead.

use super::{header, Command, Port, FEND, FESC, TFEND, TFESC};
use crate::error::{Result, TncError};

/// Incremental writer for a single frame with a hard capacity.
///
/// One byte of capacity is held back for the closing delimiter from the moment the
/// frame is opened, so [`FrameWriter::finish`] can always close the frame.
#[derive(Debug)]
pub struct FrameWriter {
    buf: Vec<u8>,
    capacity: usize,
    truncated: bool,
}

impl FrameWriter {
    /// Open a frame. Returns `None` if `capacity` cannot hold an empty frame.
    pub fn open(command: Command, port: Port, capacity: usize) -> Option<Self> {
        if capacity < 3 {
            return None;
        }
        let mut buf = Vec::with_capacity(capacity);
        buf.push(FEND);
        buf.push(header(port, command));
        Some(Self {
            buf,
            capacity,
            truncated: false,
        })
    }

    /// Bytes still available for payload, excluding the reserved closing delimiter.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len() - 1
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Append one payload byte, stuffing it if needed.
    ///
    /// A plain byte needs one byte of room, a stuffed byte two, both on top of the
    /// reserved closing delimiter. Once a byte is refused the writer stays
    /// truncated and refuses everything after it.
    pub fn push(&mut self, byte: u8) -> bool {
        let stuffed = match byte {
            FEND => Some(TFEND),
            FESC => Some(TFESC),
            _ => None,
        };
        let needed = if stuffed.is_some() { 2 } else { 1 };
        if self.truncated || self.remaining() < needed {
            self.truncated = true;
            return false;
        }
        match stuffed {
            Some(transposed) => {
                self.buf.push(FESC);
                self.buf.push(transposed);
            }
            None => self.buf.push(byte),
        }
        true
    }

    /// Append as much of `payload` as fits; returns the number of payload bytes taken.
    pub fn extend(&mut self, payload: &[u8]) -> usize {
        payload.iter().take_while(|&&b| self.push(b)).count()
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.buf.push(FEND);
        self.buf
    }
}

/// Number of bytes a full encoding of `payload` occupies.
pub fn encoded_len(payload: &[u8]) -> usize {
    3 + payload
        .iter()
        .map(|&b| if b == FEND || b == FESC { 2 } else { 1 })
        .sum::<usize>()
}

/// Frame `payload` for `port`, never producing more than `capacity` bytes.
///
/// A payload that does not fit is cut short without any signal other than the
/// shorter output. A capacity below three bytes yields an empty vector.
pub fn encode_frame(command: Command, port: Port, payload: &[u8], capacity: usize) -> Vec<u8> {
    match FrameWriter::open(command, port, capacity) {
        Some(mut writer) => {
            writer.extend(payload);
            writer.finish()
        }
        None => Vec::new(),
    }
}

/// Like [`encode_frame`] but fails instead of truncating.
pub fn try_encode_frame(
    command: Command,
    port: Port,
    payload: &[u8],
    capacity: usize,
) -> Result<Vec<u8>> {
    let needed = encoded_len(payload);
    if needed > capacity {
        return Err(TncError::InsufficientCapacity {
            needed,
            available: capacity,
        });
    }
    Ok(encode_frame(command, port, payload, needed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuffs_reserved_bytes() {
        let out = encode_frame(Command::Data, Port::LORA, &[0x01, FEND, FESC, 0x02], 64);
        assert_eq!(
            out,
            vec![FEND, 0x00, 0x01, FESC, TFEND, FESC, TFESC, 0x02, FEND]
        );
    }

    #[test]
    fn transposed_bytes_pass_through() {
        let out = encode_frame(Command::Data, Port::LORA, &[TFEND, TFESC], 64);
        assert_eq!(out, vec![FEND, 0x00, TFEND, TFESC, FEND]);
    }

    #[test]
    fn header_uses_port_override() {
        let out = encode_frame(Command::Vendor, Port::BLE, &[0xFF], 16);
        assert_eq!(out, vec![FEND, 0x26, 0xFF, FEND]);
    }

    #[test]
    fn truncates_silently_within_capacity() {
        let payload = [0x41u8; 32];
        let out = encode_frame(Command::Data, Port::LORA, &payload, 10);
        assert!(out.len() <= 10);
        assert_eq!(out.first(), Some(&FEND));
        assert_eq!(out.last(), Some(&FEND));
        assert_eq!(out.len(), 10);
        assert_eq!(&out[2..out.len() - 1], &[0x41; 7]);
    }

    #[test]
    fn stuffed_byte_needs_two_bytes_of_room() {
        // room for one more plain byte but not for an escape pair
        let out = encode_frame(Command::Data, Port::LORA, &[0x41, 0x42, FEND], 6);
        assert_eq!(out, vec![FEND, 0x00, 0x41, 0x42, FEND]);
        let out = encode_frame(Command::Data, Port::LORA, &[0x41, 0x42, 0x43], 6);
        assert_eq!(out, vec![FEND, 0x00, 0x41, 0x42, 0x43, FEND]);
    }

    #[test]
    fn never_splits_an_escape_pair() {
        let payload = [0x41, FEND, FEND, FEND];
        for cap in 3..12 {
            let out = encode_frame(Command::Data, Port::LORA, &payload, cap);
            assert!(out.len() <= cap, "cap {} produced {}", cap, out.len());
            let body = &out[2..out.len() - 1];
            assert_ne!(body.last(), Some(&FESC), "dangling escape at cap {}", cap);
        }
    }

    #[test]
    fn tiny_capacity_yields_nothing() {
        assert!(encode_frame(Command::Data, Port::LORA, &[1, 2], 2).is_empty());
        assert_eq!(
            encode_frame(Command::Data, Port::LORA, &[1, 2], 3),
            vec![FEND, 0x00, FEND]
        );
    }

    #[test]
    fn checked_encoder_reports_shortfall() {
        let err = try_encode_frame(Command::Data, Port::LORA, &[FEND; 4], 8).unwrap_err();
        match err {
            TncError::InsufficientCapacity { needed, available } => {
                assert_eq!(needed, 11);
                assert_eq!(available, 8);
            }
            other => panic!("unexpected error {other:?}"),
        }
        let ok = try_encode_frame(Command::Data, Port::LORA, &[1, 2, 3], 8).unwrap();
        assert_eq!(ok.len(), encoded_len(&[1, 2, 3]));
    }

    #[test]
    fn checked_encoder_uses_exact_fit() {
        let out = try_encode_frame(Command::Data, Port::LORA, &[1, 2, FESC], 7).unwrap();
        assert_eq!(out, vec![FEND, 0x00, 1, 2, FESC, TFESC, FEND]);
    }

    #[test]
    fn writer_exposes_remaining_capacity() {
        let mut w = FrameWriter::open(Command::Data, Port::LORA, 6).unwrap();
        assert_eq!(w.remaining(), 3);
        assert!(w.push(0x10));
        assert!(w.push(0x11));
        assert_eq!(w.remaining(), 1);
        assert!(!w.push(FESC));
        assert!(w.is_truncated());
        assert!(!w.push(0x12));
        assert_eq!(w.finish(), vec![FEND, 0x00, 0x10, 0x11, FEND]);
    }
}
