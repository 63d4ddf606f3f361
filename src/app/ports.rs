//! Port traits: the hexagonal boundary between the configuration core and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ConfigStore / ModeManager / CommandDispatcher
//! ```
//!
//! Driven adapters (NVS, WiFi radio, restart timer, serial reply channel,
//! mDNS advertiser) implement these traits.  The core consumes them via
//! generics, so it never touches ESP-IDF directly.

use crate::app::link::WifiState;
use crate::config::{DeviceMode, MdnsConfig, TrackerConfig};

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: core ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Flat, typed key-value persistence within a single namespace.
///
/// Reads return `Ok(None)` when the key is absent.  Reading a key with a
/// different type than it was written with is an error, mirroring ESP-IDF
/// NVS semantics.
///
/// The backing handle is opened on demand and released by [`end`]; the
/// next access reopens it.
///
/// [`end`]: StoragePort::end
pub trait StoragePort {
    /// Select (and open) the namespace.  Returns whether it opened.
    fn begin(&mut self, namespace: &str) -> bool;

    fn get_str(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn get_i32(&self, key: &str) -> Result<Option<i32>, StorageError>;
    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError>;
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError>;

    fn put_str(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), StorageError>;
    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError>;
    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError>;

    /// Erase every key in the namespace.
    fn clear(&mut self) -> Result<(), StorageError>;

    /// Release the open handle.
    fn end(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: core → WiFi driver)
// ───────────────────────────────────────────────────────────────

/// The WiFi radio as seen by the configuration core.
pub trait RadioPort {
    /// Start the radio for `mode` (station for `Wifi`, access point for `Ap`).
    fn begin(&mut self, config: &TrackerConfig, mode: DeviceMode);

    /// Drop the current association.  `force` also powers the radio down.
    fn disconnect(&mut self, force: bool);

    /// Advance a connection attempt started by [`begin`](Self::begin) and
    /// report the link.  Never blocks; `now_ms` drives per-network timeouts.
    fn poll(&mut self, now_ms: u64) -> WifiState;
}

// ───────────────────────────────────────────────────────────────
// Restart port (driven adapter: core → timer facility)
// ───────────────────────────────────────────────────────────────

/// Deferred, one-shot device restart.
pub trait RestartPort {
    /// Request a restart `delay_ms` from now.  Never blocks.
    fn schedule_restart(&mut self, delay_ms: u32);
}

/// Callback invoked by the [`RestartScheduler`](crate::restart::RestartScheduler)
/// once a pending restart falls due.
pub trait RestartDelegate {
    fn on_restart_due(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Reply port (driven adapter: core → transport)
// ───────────────────────────────────────────────────────────────

/// Outbound side of the command transport.
pub trait ReplyPort {
    fn send_line(&mut self, line: &str);
}

// ───────────────────────────────────────────────────────────────
// Advertiser port (driven adapter: core → mDNS responder)
// ───────────────────────────────────────────────────────────────

pub trait AdvertiserPort {
    fn start(&mut self, mdns: &MdnsConfig);
    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The namespace could not be opened.
    NotOpen,
    /// The key exists but holds a value of another type.
    TypeMismatch,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotOpen => write!(f, "namespace not open"),
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
