//! Command dispatcher: turns command documents into store and mode
//! mutations.
//!
//! ```text
//!  transport ──Value──▶ handle_commands ──▶ Command::from_value ──▶ execute
//!                              │                                      │
//!                              │                    ConfigStore ◀─────┤
//!                              │                    ModeManager ◀─────┤
//!                              │                    RestartPort ◀─────┘
//!                              └──▶ ConfigStore::save  (once per batch)
//! ```
//!
//! Malformed commands are dropped with a log line and never reach the
//! sender; the batch carries on with the next element.

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::config::{DeviceMode, DEFAULT_MDNS_SERVICE};
use crate::error::{CommandError, Error};

use super::commands::{Command, PONG};
use super::mode::ModeManager;
use super::ports::{RadioPort, ReplyPort, RestartPort, StoragePort};
use super::store::ConfigStore;

/// Delay between a mode-changing command and the restart it triggers.
pub const RESTART_DELAY_MS: u32 = 2000;

/// Per-batch tally, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Commands that parsed and were executed (including `None`).
    pub executed: usize,
    /// Commands dropped as malformed.
    pub dropped: usize,
}

pub struct CommandDispatcher<R, T, P> {
    radio: R,
    restart: T,
    reply: P,
}

impl<R: RadioPort, T: RestartPort, P: ReplyPort> CommandDispatcher<R, T, P> {
    pub fn new(radio: R, restart: T, reply: P) -> Self {
        Self {
            radio,
            restart,
            reply,
        }
    }

    /// Process every element of `document["commands"]`, then save the
    /// whole configuration once.
    ///
    /// A document without a `commands` array is rejected before anything
    /// is touched, and nothing is saved.
    pub fn handle_commands<S: StoragePort>(
        &mut self,
        document: &Value,
        store: &mut ConfigStore<S>,
        modes: &mut ModeManager,
    ) -> Result<BatchReport, CommandError> {
        let Some(commands) = document.get("commands").and_then(Value::as_array) else {
            error!("CommandDispatcher: document not supported, lacks commands field");
            return Err(CommandError::MissingCommands);
        };

        let mut report = BatchReport::default();
        for value in commands {
            if self.handle_command(value, store, modes) {
                report.executed += 1;
            } else {
                report.dropped += 1;
            }
        }

        store.save();
        debug!(
            "CommandDispatcher: batch done ({} executed, {} dropped)",
            report.executed, report.dropped
        );
        Ok(report)
    }

    /// Parse and execute a single command.  Returns `false` if it was
    /// dropped as malformed.
    pub fn handle_command<S: StoragePort>(
        &mut self,
        value: &Value,
        store: &mut ConfigStore<S>,
        modes: &mut ModeManager,
    ) -> bool {
        match Command::from_value(value) {
            Ok(command) => {
                self.execute(command, store, modes);
                true
            }
            Err(e) => {
                warn!("CommandDispatcher: dropping malformed command: {}", Error::from(e));
                false
            }
        }
    }

    pub fn execute<S: StoragePort>(
        &mut self,
        command: Command,
        store: &mut ConfigStore<S>,
        modes: &mut ModeManager,
    ) {
        debug!("CommandDispatcher: {}", command.name());
        match command {
            Command::SetWifi {
                network_name,
                ssid,
                password,
            } => {
                // Channel and power 0 leave the choice to the radio.
                if let Err(e) = store.set_wifi_config(&network_name, &ssid, &password, 0, 0, false)
                {
                    warn!("CommandDispatcher: network '{}' not stored: {}", network_name, Error::from(e));
                }
                modes.set_has_wifi_credentials(true, store);
                modes.enter(DeviceMode::Wifi, store, &mut self.radio);
                info!("CommandDispatcher: switching to WiFi mode after receiving credentials");
                self.restart.schedule_restart(RESTART_DELAY_MS);
            }
            Command::SetMdns { hostname } => {
                store.set_mdns_config(&hostname, DEFAULT_MDNS_SERVICE, false);
            }
            Command::Ping => self.reply.send_line(PONG),
            Command::SwitchMode { mode } => {
                let transition = modes.enter(mode, store, &mut self.radio);
                if transition.restart_required {
                    self.restart.schedule_restart(RESTART_DELAY_MS);
                } else {
                    info!("CommandDispatcher: connection attempt abandoned, no restart");
                }
            }
            Command::WipeWifiCreds => {
                let names: Vec<String> = store.networks().iter().map(|n| n.name.clone()).collect();
                for name in &names {
                    store.delete_wifi_config(name, false);
                }
                modes.set_has_wifi_credentials(false, store);
                modes.enter(DeviceMode::Usb, store, &mut self.radio);
                info!("CommandDispatcher: switching to USB mode after wiping credentials");
                self.restart.schedule_restart(RESTART_DELAY_MS);
            }
            Command::None => debug!("CommandDispatcher: ignoring unknown command"),
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn restart(&self) -> &T {
        &self.restart
    }

    pub fn restart_mut(&mut self) -> &mut T {
        &mut self.restart
    }

    pub fn reply(&self) -> &P {
        &self.reply
    }
}
