//! Shared WiFi link state.
//!
//! The radio adapter writes it (possibly from the ESP-IDF event-loop task);
//! the config store resets it when credentials change and the mode manager
//! reads it to decide whether a USB switch interrupts a connection attempt.

use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Connection state of the WiFi link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WifiState {
    /// Nothing attempted yet (or credentials just inserted).
    Idle = 0,
    Connecting = 1,
    Connected = 2,
    /// Dropped, or credentials of the current network changed.
    Disconnected = 3,
    /// Hosting the access point.
    Adhoc = 4,
    Error = 5,
}

impl WifiState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Disconnected,
            4 => Self::Adhoc,
            5 => Self::Error,
            _ => Self::Idle,
        }
    }
}

/// Cloneable handle onto one link state cell.
#[derive(Debug, Clone, Default)]
pub struct LinkState(Arc<AtomicU8>);

impl LinkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> WifiState {
        WifiState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: WifiState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub fn is_connecting(&self) -> bool {
        self.get() == WifiState::Connecting
    }
}
