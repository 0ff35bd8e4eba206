//! Incremental KISS deframer.
//!
//! Bytes are fed one at a time as they arrive from the serial link and completed
//! command buffers (header byte + unstuffed payload) come back out. All state lives
//! in the struct so a frame may span any number of reads.

use log::{debug, trace, warn};

use super::{CMD_BUF_LEN_MAX, FEND, FESC, TFEND, TFESC};
use crate::logutil::hex_snippet;

/// Running totals of framing anomalies seen by a deframer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeframerCounters {
    pub frames: u64,
    /// Frames thrown away by a double escape.
    pub aborted: u64,
    /// Escaped bytes that were neither TFEND nor TFESC.
    pub dropped_escapes: u64,
    /// Frames dispatched early because the buffer filled up.
    pub truncated: u64,
}

#[derive(Debug)]
pub struct KissDeframer {
    buf: Vec<u8>,
    capacity: usize,
    esc: bool,
    counters: DeframerCounters,
}

impl Default for KissDeframer {
    fn default() -> Self {
        Self::new(CMD_BUF_LEN_MAX)
    }
}

impl KissDeframer {
    /// Create a deframer whose command buffer holds `capacity` bytes.
    ///
    /// The last slot is never filled: a buffer reaching `capacity - 1` bytes is
    /// dispatched as if a delimiter had arrived. Capacities below 2 are raised to 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buf: Vec::with_capacity(capacity - 1),
            capacity,
            esc: false,
            counters: DeframerCounters::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_escaped(&self) -> bool {
        self.esc
    }

    pub fn counters(&self) -> DeframerCounters {
        self.counters
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.esc = false;
    }

    /// Push one byte, returning the command buffer if this byte completed a frame.
    pub fn feed(&mut self, b: u8) -> Option<Vec<u8>> {
        match b {
            FESC => {
                if self.esc {
                    // double escape: aborted transmission
                    debug!("KISS abort after {} bytes (double FESC)", self.buf.len());
                    self.counters.aborted += 1;
                    self.reset();
                } else {
                    self.esc = true;
                }
                return None;
            }
            FEND => {
                if self.buf.is_empty() {
                    return None;
                }
                self.esc = false;
                return Some(self.take_frame());
            }
            TFESC => {
                if self.esc {
                    self.buf.push(FESC);
                    self.esc = false;
                } else {
                    self.buf.push(TFESC);
                }
            }
            TFEND => {
                if self.esc {
                    self.buf.push(FEND);
                    self.esc = false;
                } else {
                    self.buf.push(TFEND);
                }
            }
            _ => {
                if self.esc {
                    trace!("KISS dropped unknown escaped byte {:02x}", b);
                    self.counters.dropped_escapes += 1;
                    self.esc = false;
                } else {
                    self.buf.push(b);
                }
            }
        }

        if self.buf.len() >= self.capacity - 1 {
            warn!(
                "KISS command buffer full ({} bytes), dispatching truncated frame",
                self.buf.len()
            );
            self.counters.truncated += 1;
            self.esc = false;
            return Some(self.take_frame());
        }
        None
    }

    /// Feed a whole chunk, collecting every frame it completes in arrival order.
    pub fn drain(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        data.iter().filter_map(|&b| self.feed(b)).collect()
    }

    fn take_frame(&mut self) -> Vec<u8> {
        self.counters.frames += 1;
        let frame = std::mem::replace(&mut self.buf, Vec::with_capacity(self.capacity - 1));
        trace!("KISS frame {} bytes: {}", frame.len(), hex_snippet(&frame, 32));
        frame
    }
}
