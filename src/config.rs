//! Tracker configuration data model.
//!
//! [`TrackerConfig`] is the root aggregate persisted by the
//! [`ConfigStore`](crate::app::store::ConfigStore).  Every section has a
//! compiled-in default used at first boot and as the per-key fallback
//! when a value is missing from NVS.

use serde::{Deserialize, Serialize};

/// Maximum number of stored client networks.
pub const MAX_NETWORKS: usize = 3;

/// NVS namespace used when no partition name is configured.
pub const DEFAULT_PARTITION: &str = "openiris";
/// mDNS hostname used when none is configured.
pub const DEFAULT_MDNS_HOSTNAME: &str = "openiristracker";
/// mDNS service name; also the fixed service set by `SET_MDNS`.
pub const DEFAULT_MDNS_SERVICE: &str = "openiristracker";

pub const DEFAULT_OTA_LOGIN: &str = "openiris";
pub const DEFAULT_OTA_PASSWORD: &str = "12345678";
pub const DEFAULT_OTA_PORT: i32 = 3232;

/// 52 quarter-dBm steps = 13 dBm.
pub const DEFAULT_TX_POWER: u8 = 52;
pub const DEFAULT_AP_CHANNEL: u8 = 1;

// Camera tuning (framesize 4 = 240x240).
pub const DEFAULT_VFLIP: u8 = 0;
pub const DEFAULT_HREF: u8 = 0;
pub const DEFAULT_FRAMESIZE: u8 = 4;
pub const DEFAULT_QUALITY: u8 = 7;
pub const DEFAULT_BRIGHTNESS: u8 = 2;

// ---------------------------------------------------------------------------
// Device mode
// ---------------------------------------------------------------------------

/// Top-level operating posture of the device.
///
/// Discriminants are the values persisted under the `mode` key and carried
/// by the `SWITCH_MODE` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum DeviceMode {
    Usb = 0,
    Wifi = 1,
    Ap = 2,
    /// Resolve to `Wifi` or `Ap` from the credentials flag.  Never current.
    Auto = 3,
}

impl DeviceMode {
    pub fn from_i32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Usb),
            1 => Some(Self::Wifi),
            2 => Some(Self::Ap),
            3 => Some(Self::Auto),
            _ => None,
        }
    }

    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether the radio is in use in this mode.
    pub const fn uses_radio(self) -> bool {
        matches!(self, Self::Wifi | Self::Ap)
    }

    /// Resolve `Auto` against the credentials flag; other modes pass through.
    pub const fn resolve(self, has_wifi_credentials: bool) -> Self {
        match self {
            Self::Auto if has_wifi_credentials => Self::Wifi,
            Self::Auto => Self::Ap,
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Remote-management (OTA) credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub login: String,
    pub password: String,
    pub port: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            login: DEFAULT_OTA_LOGIN.into(),
            password: DEFAULT_OTA_PASSWORD.into(),
            port: DEFAULT_OTA_PORT,
        }
    }
}

/// Image tuning parameters handed to the camera sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub vflip: u8,
    pub href: u8,
    pub framesize: u8,
    pub quality: u8,
    pub brightness: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            vflip: DEFAULT_VFLIP,
            href: DEFAULT_HREF,
            framesize: DEFAULT_FRAMESIZE,
            quality: DEFAULT_QUALITY,
            brightness: DEFAULT_BRIGHTNESS,
        }
    }
}

/// A client network the device may associate with.  `name` is the lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub name: String,
    pub ssid: String,
    pub password: String,
    pub channel: u8,
    pub power: u8,
}

/// The access-point profile hosted when running in AP mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApNetwork {
    pub ssid: String,
    pub password: String,
    pub channel: u8,
    pub adhoc: bool,
}

impl Default for ApNetwork {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            channel: DEFAULT_AP_CHANNEL,
            adhoc: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdnsConfig {
    pub hostname: String,
    pub service: String,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_MDNS_HOSTNAME.into(),
            service: DEFAULT_MDNS_SERVICE.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPower {
    pub power: u8,
}

impl Default for TxPower {
    fn default() -> Self {
        Self {
            power: DEFAULT_TX_POWER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceModeConfig {
    pub mode: DeviceMode,
    pub has_wifi_credentials: bool,
}

impl Default for DeviceModeConfig {
    fn default() -> Self {
        Self {
            mode: DeviceMode::Auto,
            has_wifi_credentials: false,
        }
    }
}

impl DeviceModeConfig {
    /// `Wifi` when credentials are stored, otherwise `Ap`.
    pub const fn determine_mode(&self) -> DeviceMode {
        DeviceMode::Auto.resolve(self.has_wifi_credentials)
    }
}

// ---------------------------------------------------------------------------
// Root aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub device: DeviceConfig,
    pub camera: CameraConfig,
    pub networks: heapless::Vec<WifiNetwork, MAX_NETWORKS>,
    pub ap_network: ApNetwork,
    pub mdns: MdnsConfig,
    pub tx_power: TxPower,
    pub device_mode: DeviceModeConfig,
}
