//! mDNS service advertisement adapter.
//!
//! Advertises `<hostname>.local` with a `_<service>._tcp` record on the
//! streaming port.  Uses the ESP-IDF mDNS component on ESP-IDF and is a
//! no-op on simulation targets.
//!
//! Boot code starts it through [`AdvertiserPort`] once the radio is up.
//! It also listens for configuration changes: a new hostname is picked up
//! immediately, re-registering if already advertising.

use log::info;

use crate::app::events::ConfigEvent;
use crate::app::hub::ConfigListener;
use crate::app::ports::AdvertiserPort;
use crate::config::{MdnsConfig, TrackerConfig};

#[allow(dead_code)]
const MDNS_SERVICE_PROTO: &str = "_tcp";
/// Port the camera stream is served on.
pub const MDNS_SERVICE_PORT: u16 = 80;

/// mDNS advertisement adapter.
#[derive(Debug, Default)]
pub struct MdnsAdapter {
    config: MdnsConfig,
    active: bool,
}

impl MdnsAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether mDNS is currently advertising.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn hostname(&self) -> &str {
        &self.config.hostname
    }

    fn advertise(&mut self) {
        self.platform_start();
        self.active = true;
        info!(
            "mDNS: advertising {}.local → _{}._tcp:{}",
            self.config.hostname, self.config.service, MDNS_SERVICE_PORT
        );
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&self) {
        use esp_idf_svc::sys::*;

        let mut hostname_buf = [0u8; 32];
        let hb = self.config.hostname.as_bytes();
        let hl = hb.len().min(31);
        hostname_buf[..hl].copy_from_slice(&hb[..hl]);

        // "_" + service + NUL
        let mut svc_buf = [0u8; 34];
        svc_buf[0] = b'_';
        let sb = self.config.service.as_bytes();
        let sl = sb.len().min(32);
        svc_buf[1..=sl].copy_from_slice(&sb[..sl]);

        // SAFETY: every pointer is NUL-terminated and outlives the call.
        unsafe {
            let ret = mdns_init();
            if ret != ESP_OK as i32 {
                log::error!("mDNS: mdns_init failed ({})", ret);
                return;
            }
            mdns_hostname_set(hostname_buf.as_ptr() as *const _);
            mdns_instance_name_set(hostname_buf.as_ptr() as *const _);
            mdns_service_add(
                core::ptr::null(),
                svc_buf.as_ptr() as *const _,
                b"_tcp\0".as_ptr() as *const _,
                MDNS_SERVICE_PORT,
                core::ptr::null_mut(),
                0,
            );
            mdns_service_txt_item_set(
                svc_buf.as_ptr() as *const _,
                b"_tcp\0".as_ptr() as *const _,
                b"version\0".as_ptr() as *const _,
                concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const _,
            );
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&self) {
        info!(
            "mDNS(sim): registered {}.local _{}.{}:{} v={}",
            self.config.hostname,
            self.config.service,
            MDNS_SERVICE_PROTO,
            MDNS_SERVICE_PORT,
            env!("CARGO_PKG_VERSION")
        );
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&self) {
        unsafe {
            esp_idf_svc::sys::mdns_free();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&self) {
        info!("mDNS(sim): unregistered");
    }
}

impl AdvertiserPort for MdnsAdapter {
    /// Start advertising `mdns`.  Call after the radio is up.
    fn start(&mut self, mdns: &MdnsConfig) {
        if self.active && self.config == *mdns {
            return;
        }
        if self.active {
            self.platform_stop();
        }
        self.config = mdns.clone();
        self.advertise();
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("mDNS: stopped");
    }
}

impl ConfigListener for MdnsAdapter {
    fn on_config_event(&mut self, event: ConfigEvent, config: &TrackerConfig) {
        match event {
            ConfigEvent::ConfigLoaded => self.config = config.mdns.clone(),
            ConfigEvent::MdnsConfigUpdated if self.active => {
                info!("mDNS: hostname changed to '{}'", config.mdns.hostname);
                self.start(&config.mdns);
            }
            ConfigEvent::MdnsConfigUpdated => self.config = config.mdns.clone(),
            _ => {}
        }
    }
}
