//! Configuration change topics.
//!
//! The [`ConfigStore`](super::store::ConfigStore) broadcasts one of these
//! through the [`NotificationHub`](super::hub::NotificationHub) whenever a
//! section is loaded or changed.  Listeners on the other side (mDNS,
//! camera, logging) decide how to react.

/// Named category of configuration mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigEvent {
    /// The whole aggregate was populated from storage at boot.
    ConfigLoaded,
    DeviceConfigUpdated,
    MdnsConfigUpdated,
    CameraConfigUpdated,
    /// Client networks or the access-point profile changed.
    NetworksConfigUpdated,
    WifiTxPowerUpdated,
    /// Operating mode or the credentials flag changed.
    DeviceModeUpdated,
}
