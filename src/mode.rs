//! Shared serial mode flag.
//!
//! The serial link is either driven by the text CLI or by the KISS modem. Both
//! sides hold a clone of the same [`ModeHandle`]; the modem only ever moves it back
//! to [`CliMode::Cli`] (Return command on the global port).
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::info;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CliMode {
    #[default]
    Cli,
    Kiss,
}

impl CliMode {
    fn as_u8(self) -> u8 {
        match self {
            CliMode::Cli => 0,
            CliMode::Kiss => 1,
        }
    }

    fn from_u8(v: u8) -> Self {
        if v == 1 {
            CliMode::Kiss
        } else {
            CliMode::Cli
        }
    }
}

impl fmt::Display for CliMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliMode::Cli => write!(f, "CLI"),
            CliMode::Kiss => write!(f, "KISS"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModeHandle {
    inner: Arc<AtomicU8>,
}

impl ModeHandle {
    pub fn new(mode: CliMode) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(mode.as_u8())),
        }
    }

    pub fn get(&self) -> CliMode {
        CliMode::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// Set the mode, returning the previous one.
    pub fn set(&self, mode: CliMode) -> CliMode {
        let prev = CliMode::from_u8(self.inner.swap(mode.as_u8(), Ordering::AcqRel));
        if prev != mode {
            info!("Serial mode {} -> {}", prev, mode);
        }
        prev
    }

    pub fn is_kiss(&self) -> bool {
        self.get() == CliMode::Kiss
    }

    pub fn enter_kiss(&self) {
        self.set(CliMode::Kiss);
    }

    pub fn return_to_cli(&self) {
        self.set(CliMode::Cli);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = ModeHandle::default();
        let b = a.clone();
        assert_eq!(a.get(), CliMode::Cli);
        b.enter_kiss();
        assert!(a.is_kiss());
        assert_eq!(a.set(CliMode::Cli), CliMode::Kiss);
        assert_eq!(b.get(), CliMode::Cli);
    }
}
