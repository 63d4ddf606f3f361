//! Mode manager: holder of the current operating mode and the WiFi
//! credentials flag.
//!
//! Constructed once by the composition root from the loaded configuration
//! and handed out by `&mut`; it is deliberately not `Clone`, so there is
//! only ever one.
//!
//! ```text
//!            ┌──────────── enter(USB) ─────────────┐
//!            │  radio.disconnect(true) first        ▼
//!   WIFI ◀──▶ AP ──────────────────────────────▶  USB
//!     ▲       ▲                                     │
//!     └───────┴──── enter(WIFI | AP | AUTO) ────────┘
//! ```
//!
//! `AUTO` is only ever a request; it resolves to `WIFI` or `AP` from the
//! credentials flag before it becomes current.

use log::info;

use crate::config::{DeviceMode, DeviceModeConfig};

use super::link::LinkState;
use super::ports::{RadioPort, StoragePort};
use super::store::ConfigStore;

/// What a call to [`ModeManager::enter`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: DeviceMode,
    pub to: DeviceMode,
    /// `false` only when a connection attempt was abandoned by switching
    /// to USB; the forced disconnect already tears the stack down.
    pub restart_required: bool,
}

#[derive(Debug)]
pub struct ModeManager {
    mode: DeviceMode,
    has_wifi_credentials: bool,
    link: LinkState,
}

impl ModeManager {
    pub fn new(initial: &DeviceModeConfig, link: LinkState) -> Self {
        let mode = initial.mode.resolve(initial.has_wifi_credentials);
        info!(
            "ModeManager: starting in {:?} (credentials={})",
            mode, initial.has_wifi_credentials
        );
        Self {
            mode,
            has_wifi_credentials: initial.has_wifi_credentials,
            link,
        }
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// Record `mode` without persisting it.  `AUTO` is resolved first.
    pub fn set_mode(&mut self, mode: DeviceMode) {
        self.mode = mode.resolve(self.has_wifi_credentials);
    }

    pub fn has_wifi_credentials(&self) -> bool {
        self.has_wifi_credentials
    }

    /// Update the credentials flag and persist it through `store`.
    pub fn set_has_wifi_credentials<S: StoragePort>(
        &mut self,
        has_credentials: bool,
        store: &mut ConfigStore<S>,
    ) {
        self.has_wifi_credentials = has_credentials;
        store.set_has_wifi_credentials(has_credentials, true);
    }

    /// Switch to `target`, persisting the new mode.
    ///
    /// Leaving WIFI/AP for USB force-disconnects the radio before the new
    /// mode is recorded.  The connecting check is taken before that
    /// disconnect, since the disconnect itself moves the link state.
    pub fn enter<S: StoragePort>(
        &mut self,
        target: DeviceMode,
        store: &mut ConfigStore<S>,
        radio: &mut impl RadioPort,
    ) -> ModeTransition {
        let from = self.mode;
        let to = target.resolve(self.has_wifi_credentials);
        let was_connecting = self.link.is_connecting();

        let leaving_radio = to == DeviceMode::Usb && from.uses_radio();
        if leaving_radio {
            info!("ModeManager: {:?} -> USB, disconnecting radio", from);
            radio.disconnect(true);
        }

        self.mode = to;
        store.set_device_mode(to, true);
        info!("ModeManager: mode {:?} -> {:?}", from, to);

        ModeTransition {
            from,
            to,
            restart_required: !(leaving_radio && was_connecting),
        }
    }
}
