//! Config store: sole owner of the [`TrackerConfig`] aggregate.
//!
//! Translates between the structured in-memory form and the flat NVS key
//! layout, and routes every mutation through one place so listeners see a
//! consistent view.
//!
//! ```text
//!   setter ──▶ TrackerConfig ──(notify)──▶ section save ──▶ StoragePort
//!                                     └──▶ NotificationHub ──▶ listeners
//! ```
//!
//! ## Key layout
//!
//! | Section  | Keys                                                         |
//! |----------|--------------------------------------------------------------|
//! | device   | `OTALogin` `OTAPassword` `OTAPort`                           |
//! | mdns     | `hostname` `service`                                         |
//! | tx power | `txpower`                                                    |
//! | networks | `networkCount`, then `name{i}` `ssid{i}` `pass{i}` `channel{i}` `txpower{i}` |
//! | ap       | `apSSID` `apPass` `apChannel` `apAdhoc`                      |
//! | camera   | `vflip` `href` `framesize` `quality` `brightness`            |
//! | mode     | `mode` `has_wifi_creds`                                      |
//!
//! Storage failures never propagate: reads fall back to the compiled-in
//! default, writes are logged and otherwise ignored.

use core::fmt::Write as _;

use log::{debug, error, info, warn};

use crate::config::{
    ApNetwork, CameraConfig, DeviceConfig, DeviceMode, DeviceModeConfig, MdnsConfig,
    TrackerConfig, TxPower, WifiNetwork, DEFAULT_AP_CHANNEL, DEFAULT_BRIGHTNESS,
    DEFAULT_FRAMESIZE, DEFAULT_HREF, DEFAULT_MDNS_HOSTNAME, DEFAULT_MDNS_SERVICE,
    DEFAULT_OTA_LOGIN, DEFAULT_OTA_PASSWORD, DEFAULT_OTA_PORT, DEFAULT_PARTITION,
    DEFAULT_QUALITY, DEFAULT_TX_POWER, DEFAULT_VFLIP, MAX_NETWORKS,
};
use crate::error::StoreError;

use super::events::ConfigEvent;
use super::hub::{ConfigListener, NotificationHub};
use super::link::{LinkState, WifiState};
use super::ports::{StorageError, StoragePort};

const KEY_OTA_LOGIN: &str = "OTALogin";
const KEY_OTA_PASSWORD: &str = "OTAPassword";
const KEY_OTA_PORT: &str = "OTAPort";
const KEY_HOSTNAME: &str = "hostname";
const KEY_SERVICE: &str = "service";
const KEY_TX_POWER: &str = "txpower";
const KEY_NETWORK_COUNT: &str = "networkCount";
const KEY_AP_SSID: &str = "apSSID";
const KEY_AP_PASS: &str = "apPass";
const KEY_AP_CHANNEL: &str = "apChannel";
const KEY_AP_ADHOC: &str = "apAdhoc";
const KEY_VFLIP: &str = "vflip";
const KEY_HREF: &str = "href";
const KEY_FRAMESIZE: &str = "framesize";
const KEY_QUALITY: &str = "quality";
const KEY_BRIGHTNESS: &str = "brightness";
const KEY_MODE: &str = "mode";
const KEY_HAS_WIFI_CREDS: &str = "has_wifi_creds";

// Per-network key prefixes, suffixed with the slot index.
const PREFIX_NAME: &str = "name";
const PREFIX_SSID: &str = "ssid";
const PREFIX_PASS: &str = "pass";
const PREFIX_CHANNEL: &str = "channel";
const PREFIX_POWER: &str = "txpower";

/// Outcome of a successful [`ConfigStore::set_wifi_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkUpsert {
    /// An entry with the same name was overwritten in place.
    Updated,
    /// A new entry was appended.
    Added,
}

pub struct ConfigStore<S: StoragePort> {
    storage: S,
    config: TrackerConfig,
    hub: NotificationHub,
    link: LinkState,
    name: String,
    mdns_name: String,
    loaded: bool,
}

impl<S: StoragePort> ConfigStore<S> {
    /// `name` is the NVS namespace, `mdns_name` the default mDNS hostname.
    /// Empty values fall back to the compiled-in defaults at
    /// [`init_config`](Self::init_config).
    pub fn new(storage: S, name: &str, mdns_name: &str, link: LinkState) -> Self {
        Self {
            storage,
            config: TrackerConfig::default(),
            hub: NotificationHub::new(),
            link,
            name: name.into(),
            mdns_name: mdns_name.into(),
            loaded: false,
        }
    }

    /// Register a listener for configuration changes.
    pub fn attach(&mut self, listener: impl ConfigListener + 'static) {
        self.hub.attach(listener);
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Open the namespace and reset every section except the network list
    /// and tx power to its default.
    pub fn init_config(&mut self) {
        if self.name.is_empty() {
            error!("ConfigStore: config name is empty, using '{}'", DEFAULT_PARTITION);
            self.name = DEFAULT_PARTITION.into();
        }
        let opened = self.storage.begin(&self.name);
        info!("ConfigStore: namespace '{}' opened={}", self.name, opened);

        if self.mdns_name.is_empty() {
            warn!("ConfigStore: mDNS name is empty, using '{}'", DEFAULT_MDNS_HOSTNAME);
            self.mdns_name = DEFAULT_MDNS_HOSTNAME.into();
        }

        self.config.device = DeviceConfig::default();
        self.config.mdns = MdnsConfig {
            hostname: self.mdns_name.clone(),
            service: DEFAULT_MDNS_SERVICE.into(),
        };
        self.config.ap_network = ApNetwork::default();
        self.config.camera = CameraConfig::default();
        self.config.device_mode = DeviceModeConfig::default();
    }

    /// Populate the aggregate from storage.  Runs once per process; later
    /// calls are logged and ignored.
    pub fn load(&mut self) {
        debug!("ConfigStore: loading");
        if self.loaded {
            warn!("ConfigStore: already loaded, ignoring");
            return;
        }

        self.init_config();

        self.config.device = DeviceConfig {
            login: self.read_str(KEY_OTA_LOGIN, DEFAULT_OTA_LOGIN),
            password: self.read_str(KEY_OTA_PASSWORD, DEFAULT_OTA_PASSWORD),
            port: self.read_i32(KEY_OTA_PORT, DEFAULT_OTA_PORT),
        };

        self.config.mdns = MdnsConfig {
            hostname: self.read_str(KEY_HOSTNAME, &self.mdns_name),
            service: self.read_str(KEY_SERVICE, DEFAULT_MDNS_SERVICE),
        };

        self.config.tx_power = TxPower {
            power: self.read_u8(KEY_TX_POWER, DEFAULT_TX_POWER),
        };

        self.config.networks = self.load_networks();

        self.config.ap_network = ApNetwork {
            ssid: self.read_str(KEY_AP_SSID, ""),
            password: self.read_str(KEY_AP_PASS, ""),
            channel: self.read_u8(KEY_AP_CHANNEL, DEFAULT_AP_CHANNEL),
            adhoc: self.read_bool(KEY_AP_ADHOC, false),
        };

        self.config.camera = CameraConfig {
            vflip: self.read_i32(KEY_VFLIP, DEFAULT_VFLIP.into()) as u8,
            href: self.read_i32(KEY_HREF, DEFAULT_HREF.into()) as u8,
            framesize: self.read_i32(KEY_FRAMESIZE, DEFAULT_FRAMESIZE.into()) as u8,
            quality: self.read_i32(KEY_QUALITY, DEFAULT_QUALITY.into()) as u8,
            brightness: self.read_i32(KEY_BRIGHTNESS, DEFAULT_BRIGHTNESS.into()) as u8,
        };

        let raw_mode = self.read_i32(KEY_MODE, DeviceMode::Auto.as_i32());
        let mode = DeviceMode::from_i32(raw_mode).unwrap_or_else(|| {
            warn!("ConfigStore: stored mode {} unknown, treating as AUTO", raw_mode);
            DeviceMode::Auto
        });
        let has_wifi_credentials = self.read_bool(KEY_HAS_WIFI_CREDS, false);
        self.config.device_mode = DeviceModeConfig {
            mode: mode.resolve(has_wifi_credentials),
            has_wifi_credentials,
        };
        info!(
            "ConfigStore: loaded mode={:?} has_wifi_credentials={} networks={}",
            self.config.device_mode.mode,
            has_wifi_credentials,
            self.config.networks.len()
        );

        self.loaded = true;
        self.notify(ConfigEvent::ConfigLoaded);
    }

    fn load_networks(&self) -> heapless::Vec<WifiNetwork, MAX_NETWORKS> {
        let stored = self.read_i32(KEY_NETWORK_COUNT, 0);
        let count = stored.clamp(0, MAX_NETWORKS as i32) as usize;
        if count as i32 != stored {
            warn!(
                "ConfigStore: stored networkCount {} out of range, reading {}",
                stored, count
            );
        }

        let mut networks = heapless::Vec::new();
        for i in 0..count {
            let network = WifiNetwork {
                name: self.read_str(&indexed_key(PREFIX_NAME, i), ""),
                ssid: self.read_str(&indexed_key(PREFIX_SSID, i), ""),
                password: self.read_str(&indexed_key(PREFIX_PASS, i), ""),
                channel: self.read_u8(&indexed_key(PREFIX_CHANNEL, i), 0),
                power: self.read_u8(&indexed_key(PREFIX_POWER, i), 0),
            };
            if networks.iter().any(|n: &WifiNetwork| n.name == network.name) {
                warn!("ConfigStore: duplicate network '{}' in slot {}, skipped", network.name, i);
                continue;
            }
            // Cannot overflow: count is clamped to capacity.
            let _ = networks.push(network);
        }
        networks
    }

    /// Persist every section, then release the storage handle.
    pub fn save(&mut self) {
        debug!("ConfigStore: saving");
        self.device_config_save();
        self.mdns_config_save();
        self.camera_config_save();
        self.wifi_config_save();
        self.wifi_tx_power_config_save();
        self.device_mode_config_save();
        self.storage.end();
    }

    /// Erase the namespace.  Defaults are not repopulated; call
    /// [`init_config`](Self::init_config) afterwards.
    pub fn reset(&mut self) -> crate::error::Result<()> {
        warn!("ConfigStore: resetting namespace '{}'", self.name);
        self.storage.clear()?;
        Ok(())
    }

    // ── Section saves ─────────────────────────────────────────

    pub fn device_config_save(&mut self) {
        let device = &self.config.device;
        write_logged(KEY_OTA_PASSWORD, self.storage.put_str(KEY_OTA_PASSWORD, &device.password));
        write_logged(KEY_OTA_LOGIN, self.storage.put_str(KEY_OTA_LOGIN, &device.login));
        write_logged(KEY_OTA_PORT, self.storage.put_i32(KEY_OTA_PORT, device.port));
    }

    pub fn mdns_config_save(&mut self) {
        let mdns = &self.config.mdns;
        write_logged(KEY_HOSTNAME, self.storage.put_str(KEY_HOSTNAME, &mdns.hostname));
        write_logged(KEY_SERVICE, self.storage.put_str(KEY_SERVICE, &mdns.service));
    }

    pub fn camera_config_save(&mut self) {
        let cam = self.config.camera;
        for (key, value) in [
            (KEY_VFLIP, cam.vflip),
            (KEY_HREF, cam.href),
            (KEY_FRAMESIZE, cam.framesize),
            (KEY_QUALITY, cam.quality),
            (KEY_BRIGHTNESS, cam.brightness),
        ] {
            write_logged(key, self.storage.put_i32(key, value.into()));
        }
    }

    /// Persist the client networks and the access-point profile.
    pub fn wifi_config_save(&mut self) {
        let networks = &self.config.networks;
        write_logged(
            KEY_NETWORK_COUNT,
            self.storage.put_i32(KEY_NETWORK_COUNT, networks.len() as i32),
        );
        for (i, net) in networks.iter().enumerate() {
            let key = indexed_key(PREFIX_NAME, i);
            write_logged(&key, self.storage.put_str(&key, &net.name));
            let key = indexed_key(PREFIX_SSID, i);
            write_logged(&key, self.storage.put_str(&key, &net.ssid));
            let key = indexed_key(PREFIX_PASS, i);
            write_logged(&key, self.storage.put_str(&key, &net.password));
            let key = indexed_key(PREFIX_CHANNEL, i);
            write_logged(&key, self.storage.put_u32(&key, net.channel.into()));
            let key = indexed_key(PREFIX_POWER, i);
            write_logged(&key, self.storage.put_u32(&key, net.power.into()));
        }

        let ap = &self.config.ap_network;
        write_logged(KEY_AP_SSID, self.storage.put_str(KEY_AP_SSID, &ap.ssid));
        write_logged(KEY_AP_PASS, self.storage.put_str(KEY_AP_PASS, &ap.password));
        write_logged(KEY_AP_CHANNEL, self.storage.put_u32(KEY_AP_CHANNEL, ap.channel.into()));
        write_logged(KEY_AP_ADHOC, self.storage.put_bool(KEY_AP_ADHOC, ap.adhoc));
        info!("ConfigStore: wifi config saved ({} networks)", networks.len());
    }

    pub fn wifi_tx_power_config_save(&mut self) {
        let power = self.config.tx_power.power;
        write_logged(KEY_TX_POWER, self.storage.put_u32(KEY_TX_POWER, power.into()));
    }

    pub fn device_mode_config_save(&mut self) {
        let mode = self.config.device_mode;
        write_logged(KEY_MODE, self.storage.put_i32(KEY_MODE, mode.mode.as_i32()));
        write_logged(
            KEY_HAS_WIFI_CREDS,
            self.storage.put_bool(KEY_HAS_WIFI_CREDS, mode.has_wifi_credentials),
        );
        info!(
            "ConfigStore: device mode saved mode={:?} has_wifi_credentials={}",
            mode.mode, mode.has_wifi_credentials
        );
    }

    // ── Setters ───────────────────────────────────────────────

    pub fn set_device_config(&mut self, login: &str, password: &str, port: i32, notify: bool) {
        debug!("ConfigStore: updating device config");
        self.config.device = DeviceConfig {
            login: login.into(),
            password: password.into(),
            port,
        };
        if notify {
            self.device_config_save();
            self.notify(ConfigEvent::DeviceConfigUpdated);
        }
    }

    pub fn set_mdns_config(&mut self, hostname: &str, service: &str, notify: bool) {
        debug!("ConfigStore: updating mDNS config");
        self.config.mdns = MdnsConfig {
            hostname: hostname.into(),
            service: service.into(),
        };
        if notify {
            self.mdns_config_save();
            self.notify(ConfigEvent::MdnsConfigUpdated);
        }
    }

    pub fn set_camera_config(&mut self, camera: CameraConfig, notify: bool) {
        debug!("ConfigStore: updating camera config");
        self.config.camera = camera;
        if notify {
            self.camera_config_save();
            self.notify(ConfigEvent::CameraConfigUpdated);
        }
    }

    /// Upsert a client network keyed by `name`.
    ///
    /// An existing entry is overwritten in place; otherwise the entry is
    /// appended if a slot is free.  With every slot taken and no match the
    /// list is left untouched and [`StoreError::NetworksFull`] is returned
    /// without persisting or notifying.
    pub fn set_wifi_config(
        &mut self,
        name: &str,
        ssid: &str,
        password: &str,
        channel: u8,
        power: u8,
        notify: bool,
    ) -> Result<NetworkUpsert, StoreError> {
        let outcome = if let Some(existing) =
            self.config.networks.iter_mut().find(|n| n.name == name)
        {
            info!("ConfigStore: found network '{}', updating", name);
            existing.ssid = ssid.into();
            existing.password = password.into();
            existing.channel = channel;
            existing.power = power;
            NetworkUpsert::Updated
        } else {
            let network = WifiNetwork {
                name: name.into(),
                ssid: ssid.into(),
                password: password.into(),
                channel,
                power,
            };
            if self.config.networks.push(network).is_err() {
                warn!(
                    "ConfigStore: {} networks stored, '{}' not added",
                    MAX_NETWORKS, name
                );
                return Err(StoreError::NetworksFull);
            }
            info!("ConfigStore: added network '{}'", name);
            NetworkUpsert::Added
        };

        if notify {
            self.link.set(match outcome {
                NetworkUpsert::Updated => WifiState::Disconnected,
                NetworkUpsert::Added => WifiState::Idle,
            });
            self.wifi_config_save();
            self.notify(ConfigEvent::NetworksConfigUpdated);
        }
        Ok(outcome)
    }

    /// Remove every network named `name`.  Returns how many were removed.
    pub fn delete_wifi_config(&mut self, name: &str, notify: bool) -> usize {
        let before = self.config.networks.len();
        self.config.networks.retain(|n| n.name != name);
        let removed = before - self.config.networks.len();
        if removed == 0 {
            debug!("ConfigStore: no network named '{}' to delete", name);
        } else {
            info!("ConfigStore: deleted network '{}'", name);
        }

        if notify {
            self.wifi_config_save();
            self.notify(ConfigEvent::NetworksConfigUpdated);
        }
        removed
    }

    pub fn set_ap_wifi_config(
        &mut self,
        ssid: &str,
        password: &str,
        channel: u8,
        adhoc: bool,
        notify: bool,
    ) {
        debug!("ConfigStore: updating access point config");
        self.config.ap_network = ApNetwork {
            ssid: ssid.into(),
            password: password.into(),
            channel,
            adhoc,
        };
        if notify {
            self.link.set(WifiState::Idle);
            self.wifi_config_save();
            self.notify(ConfigEvent::NetworksConfigUpdated);
        }
    }

    pub fn set_wifi_tx_power(&mut self, power: u8, notify: bool) {
        debug!("ConfigStore: updating wifi tx power");
        self.config.tx_power.power = power;
        if notify {
            self.wifi_tx_power_config_save();
            self.notify(ConfigEvent::WifiTxPowerUpdated);
        }
    }

    /// Record and persist the operating mode.  The `mode` key is written
    /// regardless of `notify`.
    pub fn set_device_mode(&mut self, mode: DeviceMode, notify: bool) {
        self.config.device_mode.mode = mode;
        write_logged(KEY_MODE, self.storage.put_i32(KEY_MODE, mode.as_i32()));
        info!("ConfigStore: mode set to {:?}", mode);
        if notify {
            self.notify(ConfigEvent::DeviceModeUpdated);
        }
    }

    /// Record and persist the credentials flag.  The key is written
    /// regardless of `notify`.
    pub fn set_has_wifi_credentials(&mut self, has_credentials: bool, notify: bool) {
        self.config.device_mode.has_wifi_credentials = has_credentials;
        write_logged(
            KEY_HAS_WIFI_CREDS,
            self.storage.put_bool(KEY_HAS_WIFI_CREDS, has_credentials),
        );
        info!("ConfigStore: wifi credentials present={}", has_credentials);
        if notify {
            self.notify(ConfigEvent::DeviceModeUpdated);
        }
    }

    /// `Wifi` when credentials are stored, otherwise `Ap`.
    pub fn determine_mode(&self) -> DeviceMode {
        self.config.device_mode.determine_mode()
    }

    // ── Read-only views ───────────────────────────────────────

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn device(&self) -> &DeviceConfig {
        &self.config.device
    }

    pub fn camera(&self) -> &CameraConfig {
        &self.config.camera
    }

    pub fn networks(&self) -> &[WifiNetwork] {
        &self.config.networks
    }

    pub fn ap_network(&self) -> &ApNetwork {
        &self.config.ap_network
    }

    pub fn mdns(&self) -> &MdnsConfig {
        &self.config.mdns
    }

    pub fn tx_power(&self) -> &TxPower {
        &self.config.tx_power
    }

    pub fn device_mode(&self) -> &DeviceModeConfig {
        &self.config.device_mode
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn link(&self) -> &LinkState {
        &self.link
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    // ── Internal ──────────────────────────────────────────────

    fn notify(&mut self, event: ConfigEvent) {
        self.hub.notify_all(event, &self.config);
    }

    fn read_str(&self, key: &str, default: &str) -> String {
        or_default(key, self.storage.get_str(key)).unwrap_or_else(|| default.to_owned())
    }

    fn read_i32(&self, key: &str, default: i32) -> i32 {
        or_default(key, self.storage.get_i32(key)).unwrap_or(default)
    }

    fn read_u8(&self, key: &str, default: u8) -> u8 {
        or_default(key, self.storage.get_u32(key)).map_or(default, |v| v as u8)
    }

    fn read_bool(&self, key: &str, default: bool) -> bool {
        or_default(key, self.storage.get_bool(key)).unwrap_or(default)
    }
}

/// Collapse a storage read into "value or fall back", logging failures.
fn or_default<T>(key: &str, read: Result<Option<T>, StorageError>) -> Option<T> {
    match read {
        Ok(value) => value,
        Err(e) => {
            warn!("ConfigStore: read '{}' failed ({}), using default", key, e);
            None
        }
    }
}

fn write_logged(key: &str, result: Result<(), StorageError>) {
    if let Err(e) = result {
        warn!("ConfigStore: write '{}' failed ({})", key, e);
    }
}

fn indexed_key(prefix: &str, index: usize) -> heapless::String<16> {
    let mut s = heapless::String::new();
    let _ = write!(s, "{}{}", prefix, index);
    s
}
