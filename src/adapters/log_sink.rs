//! Log-based config listener.
//!
//! Implements [`ConfigListener`] by writing a one-line summary of every
//! configuration change to the ESP-IDF logger (which goes to UART /
//! USB-CDC in production).  Secrets are never logged.

use log::info;

use crate::app::events::ConfigEvent;
use crate::app::hub::ConfigListener;
use crate::config::TrackerConfig;

/// Listener that logs every [`ConfigEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogConfigListener;

impl LogConfigListener {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigListener for LogConfigListener {
    fn on_config_event(&mut self, event: ConfigEvent, config: &TrackerConfig) {
        match event {
            ConfigEvent::ConfigLoaded => {
                info!(
                    "CONFIG | loaded | mode={:?} creds={} networks={} host={}",
                    config.device_mode.mode,
                    config.device_mode.has_wifi_credentials,
                    config.networks.len(),
                    config.mdns.hostname,
                );
            }
            ConfigEvent::DeviceConfigUpdated => {
                info!("CONFIG | device | login={} port={}", config.device.login, config.device.port);
            }
            ConfigEvent::MdnsConfigUpdated => {
                info!("CONFIG | mdns | {}.local ({})", config.mdns.hostname, config.mdns.service);
            }
            ConfigEvent::CameraConfigUpdated => {
                let c = &config.camera;
                info!(
                    "CONFIG | camera | vflip={} href={} framesize={} quality={} brightness={}",
                    c.vflip, c.href, c.framesize, c.quality, c.brightness
                );
            }
            ConfigEvent::NetworksConfigUpdated => {
                info!(
                    "CONFIG | networks | {} stored, ap='{}' ch={}",
                    config.networks.len(),
                    config.ap_network.ssid,
                    config.ap_network.channel
                );
            }
            ConfigEvent::WifiTxPowerUpdated => {
                info!("CONFIG | txpower | {}", config.tx_power.power);
            }
            ConfigEvent::DeviceModeUpdated => {
                info!(
                    "CONFIG | mode | {:?} creds={}",
                    config.device_mode.mode, config.device_mode.has_wifi_credentials
                );
            }
        }
    }
}
