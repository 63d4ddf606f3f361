//! Network bring-up at boot.
//!
//! ```text
//!   ┌───────┐        ┌──────┐  settled  ┌────────────┐        ┌───────────┐
//!   │ Radio │───────▶│ Link │──────────▶│ Advertiser │───────▶│ NetworkUp │
//!   └───┬───┘        └──┬───┘           └─────┬──────┘        └───────────┘
//!       │ USB     USB │  │ Error              │ USB
//!       ▼             ▼  ▼                    ▼
//!    UsbOnly   Aborted(Link) LinkFailed  Aborted(Advertiser)
//! ```
//!
//! The sequence is stepped from the main loop so serial commands are still
//! serviced between stages.  The `Link` stage polls the radio once per step
//! and stays put while it is still connecting.  Before every stage the
//! current mode is checked again; a switch to USB in the meantime
//! force-disconnects the radio and stops the sequence.

use log::{info, warn};

use crate::config::{DeviceMode, TrackerConfig};

use super::link::WifiState;
use super::mode::ModeManager;
use super::ports::{AdvertiserPort, RadioPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStage {
    Radio,
    Link,
    Advertiser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStatus {
    /// More to do; `stage` runs on the next step.
    Pending(BootStage),
    /// USB mode at boot; no network brought up.
    UsbOnly,
    /// Switched to USB before `stage` could finish.
    Aborted(BootStage),
    /// The radio gave up; nothing is advertised.
    LinkFailed,
    NetworkUp,
}

impl BootStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

#[derive(Debug)]
pub struct NetworkBoot {
    status: BootStatus,
}

impl Default for NetworkBoot {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkBoot {
    pub fn new() -> Self {
        Self {
            status: BootStatus::Pending(BootStage::Radio),
        }
    }

    pub fn status(&self) -> BootStatus {
        self.status
    }

    /// Run the next stage.  Never blocks.  Once finished, further calls
    /// return the final status without side effects.
    pub fn step(
        &mut self,
        modes: &ModeManager,
        config: &TrackerConfig,
        radio: &mut impl RadioPort,
        advertiser: &mut impl AdvertiserPort,
        now_ms: u64,
    ) -> BootStatus {
        let BootStatus::Pending(stage) = self.status else {
            return self.status;
        };
        let mode = modes.mode();

        self.status = if mode == DeviceMode::Usb {
            radio.disconnect(true);
            if stage == BootStage::Radio {
                info!("Boot: USB mode, network stays down");
                BootStatus::UsbOnly
            } else {
                warn!("Boot: switched to USB during {:?}, aborting bring-up", stage);
                BootStatus::Aborted(stage)
            }
        } else {
            match stage {
                BootStage::Radio => {
                    info!("Boot: starting radio in {:?} mode", mode);
                    radio.begin(config, mode);
                    BootStatus::Pending(BootStage::Link)
                }
                BootStage::Link => match radio.poll(now_ms) {
                    WifiState::Connecting => BootStatus::Pending(BootStage::Link),
                    WifiState::Error => {
                        warn!("Boot: radio failed in {:?} mode", mode);
                        BootStatus::LinkFailed
                    }
                    state => {
                        info!("Boot: link settled as {:?}", state);
                        BootStatus::Pending(BootStage::Advertiser)
                    }
                },
                BootStage::Advertiser => {
                    info!("Boot: advertising '{}'", config.mdns.hostname);
                    advertiser.start(&config.mdns);
                    BootStatus::NetworkUp
                }
            }
        };
        self.status
    }
}
