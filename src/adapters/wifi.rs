//! WiFi radio adapter.
//!
//! Implements [`RadioPort`] and is the only writer of the shared
//! [`LinkState`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Network selection
//!
//! In WIFI mode the stored networks are tried in order; the first that
//! associates wins.  Entries with an invalid SSID or password are skipped.
//! Association is never waited on: [`begin`](RadioPort::begin) only starts
//! it and leaves the link in [`WifiState::Connecting`], and the main loop
//! drives it through [`poll`](RadioPort::poll).  A network that has not
//! come up within [`CONNECT_TIMEOUT_MS`] is dropped for the next one.  If
//! none associates the link ends in [`WifiState::Error`].
//!
//! In AP mode the access-point profile is hosted, with a fallback SSID when
//! none is stored.

use core::fmt;
use log::{error, info, warn};

use crate::app::link::{LinkState, WifiState};
use crate::app::ports::RadioPort;
use crate::config::{ApNetwork, DeviceMode, TrackerConfig, WifiNetwork};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
};

/// SSID hosted in AP mode when no access-point profile is stored.
pub const FALLBACK_AP_SSID: &str = "OpenIrisTracker";

/// How long one network may take to associate before the next is tried.
pub const CONNECT_TIMEOUT_MS: u64 = 15_000;

/// Range `esp_wifi_set_max_tx_power` accepts, in 0.25 dBm units.
const TX_POWER_RANGE: core::ops::RangeInclusive<u8> = 8..=84;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    /// The driver refused the configuration or failed to start.
    DriverError,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::DriverError => write!(f, "WiFi driver error"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(ConnectivityError::InvalidSsid);
    }
    if !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

/// Where the current network is in its association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Association {
    Pending,
    Up,
    Failed,
}

/// Station connection in flight.
#[derive(Debug)]
struct Attempt {
    ssid: String,
    /// Networks still to try, next one last.
    remaining: Vec<WifiNetwork>,
    tx_power: u8,
    /// Anchored on the first poll; `begin` has no clock.
    deadline_ms: Option<u64>,
}

pub struct WifiAdapter {
    link: LinkState,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    /// Simulation: SSIDs that refuse to associate.
    #[cfg(not(target_os = "espidf"))]
    unreachable: Vec<String>,
    /// Simulation: SSIDs that never finish associating.
    #[cfg(not(target_os = "espidf"))]
    stalled: Vec<String>,
    /// Simulation: SSID currently associated or hosted.
    #[cfg(not(target_os = "espidf"))]
    current: Option<String>,
    attempt: Option<Attempt>,
    /// Whether the radio is powered.
    started: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(link: LinkState, wifi: EspWifi<'static>) -> Self {
        Self {
            link,
            wifi,
            attempt: None,
            started: false,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(link: LinkState) -> Self {
        Self {
            link,
            unreachable: Vec::new(),
            stalled: Vec::new(),
            current: None,
            attempt: None,
            started: false,
        }
    }

    /// Simulation: make `ssid` fail to associate.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_unreachable(&mut self, ssid: &str) {
        self.unreachable.push(ssid.into());
    }

    /// Simulation: keep `ssid` associating until it times out.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_stalled(&mut self, ssid: &str) {
        self.stalled.push(ssid.into());
    }

    /// Simulation: SSID currently associated or hosted.
    #[cfg(not(target_os = "espidf"))]
    pub fn current_ssid(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    fn start_station(&mut self, config: &TrackerConfig) -> Result<(), ConnectivityError> {
        if config.networks.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        let mut candidates: Vec<WifiNetwork> = config
            .networks
            .iter()
            .filter(|network| {
                match validate_ssid(&network.ssid).and(validate_password(&network.password)) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("WiFi: skipping network '{}': {}", network.name, e);
                        false
                    }
                }
            })
            .cloned()
            .collect();
        candidates.reverse();
        self.connect_next(candidates, config.tx_power.power)
    }

    /// Start associating with the next network that the driver accepts.
    fn connect_next(
        &mut self,
        mut remaining: Vec<WifiNetwork>,
        tx_power: u8,
    ) -> Result<(), ConnectivityError> {
        while let Some(network) = remaining.pop() {
            info!("WiFi: connecting to '{}' ({})", network.ssid, network.name);
            match self.platform_connect(&network, tx_power) {
                Ok(()) => {
                    self.link.set(WifiState::Connecting);
                    self.attempt = Some(Attempt {
                        ssid: network.ssid,
                        remaining,
                        tx_power,
                        deadline_ms: None,
                    });
                    return Ok(());
                }
                Err(e) => warn!("WiFi: '{}' failed: {}", network.ssid, e),
            }
        }
        Err(ConnectivityError::ConnectionFailed)
    }

    fn start_access_point(&mut self, ap: &ApNetwork) -> Result<(), ConnectivityError> {
        let ssid = if ap.ssid.is_empty() {
            FALLBACK_AP_SSID
        } else {
            ap.ssid.as_str()
        };
        validate_ssid(ssid)?;
        validate_password(&ap.password)?;
        self.platform_host(ssid, &ap.password, ap.channel)?;
        self.link.set(WifiState::Adhoc);
        info!("WiFi: hosting '{}' on channel {}", ssid, ap.channel);
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    /// Configure the station and kick off association.  Returns as soon as
    /// the driver has accepted the request.
    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, network: &WifiNetwork, tx_power: u8) -> Result<(), ConnectivityError> {
        let client = ClientConfiguration {
            ssid: network.ssid.as_str().try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: network
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if network.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            // 0 lets the driver scan every channel.
            channel: (network.channel != 0).then_some(network.channel),
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|_| ConnectivityError::DriverError)?;
        if !self.started {
            self.wifi.start().map_err(|_| ConnectivityError::DriverError)?;
            self.started = true;
        }
        let power = if network.power == 0 { tx_power } else { network.power };
        // SAFETY: the driver is started; the call only writes a register.
        unsafe { esp_idf_svc::sys::esp_wifi_set_max_tx_power(driver_tx_power(power)) };
        self.wifi.connect().map_err(|_| ConnectivityError::ConnectionFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, network: &WifiNetwork, tx_power: u8) -> Result<(), ConnectivityError> {
        self.started = true;
        let power = if network.power == 0 { tx_power } else { network.power };
        info!(
            "WiFi(sim): associating with '{}' at tx power {}",
            network.ssid,
            driver_tx_power(power)
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_association(&mut self, _ssid: &str) -> Association {
        match self.wifi.is_up() {
            Ok(true) => Association::Up,
            Ok(false) => Association::Pending,
            Err(e) => {
                warn!("WiFi: link query failed: {:?}", e);
                Association::Failed
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_association(&mut self, ssid: &str) -> Association {
        if self.unreachable.iter().any(|s| s == ssid) {
            Association::Failed
        } else if self.stalled.iter().any(|s| s == ssid) {
            Association::Pending
        } else {
            self.current = Some(ssid.into());
            Association::Up
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_host(&mut self, ssid: &str, password: &str, channel: u8) -> Result<(), ConnectivityError> {
        let ap = AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: password.try_into().map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            channel,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::AccessPoint(ap))
            .map_err(|_| ConnectivityError::DriverError)?;
        self.wifi.start().map_err(|_| ConnectivityError::DriverError)?;
        self.started = true;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_host(&mut self, ssid: &str, _password: &str, _channel: u8) -> Result<(), ConnectivityError> {
        self.started = true;
        self.current = Some(ssid.into());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self, force: bool) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect failed: {:?}", e);
        }
        if force && self.started {
            if let Err(e) = self.wifi.stop() {
                warn!("WiFi: stop failed: {:?}", e);
            }
            self.started = false;
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self, force: bool) {
        self.current = None;
        if force {
            self.started = false;
        }
        info!("WiFi(sim): disconnected (force={})", force);
    }
}

/// Clamp a stored power byte into what the driver accepts.
fn driver_tx_power(power: u8) -> i8 {
    power.clamp(*TX_POWER_RANGE.start(), *TX_POWER_RANGE.end()) as i8
}

// ───────────────────────────────────────────────────────────────
// RadioPort
// ───────────────────────────────────────────────────────────────

impl RadioPort for WifiAdapter {
    fn begin(&mut self, config: &TrackerConfig, mode: DeviceMode) {
        self.attempt = None;
        let result = match mode {
            DeviceMode::Wifi => self.start_station(config),
            DeviceMode::Ap => self.start_access_point(&config.ap_network),
            DeviceMode::Usb | DeviceMode::Auto => {
                warn!("WiFi: begin called in {:?} mode, ignoring", mode);
                return;
            }
        };
        if let Err(e) = result {
            error!("WiFi: bring-up in {:?} mode failed: {}", mode, e);
            self.link.set(WifiState::Error);
        }
    }

    fn disconnect(&mut self, force: bool) {
        if let Some(attempt) = self.attempt.take() {
            info!("WiFi: abandoning connection to '{}'", attempt.ssid);
        }
        self.platform_disconnect(force);
        self.link.set(WifiState::Disconnected);
        info!("WiFi: disconnected");
    }

    fn poll(&mut self, now_ms: u64) -> WifiState {
        let Some(mut attempt) = self.attempt.take() else {
            return self.link.get();
        };
        let deadline = *attempt
            .deadline_ms
            .get_or_insert(now_ms.saturating_add(CONNECT_TIMEOUT_MS));

        match self.platform_association(&attempt.ssid) {
            Association::Up => {
                self.link.set(WifiState::Connected);
                info!("WiFi: connected to '{}'", attempt.ssid);
            }
            Association::Pending if now_ms < deadline => self.attempt = Some(attempt),
            outcome => {
                if outcome == Association::Pending {
                    warn!("WiFi: '{}' timed out", attempt.ssid);
                } else {
                    warn!("WiFi: '{}' refused association", attempt.ssid);
                }
                self.platform_disconnect(false);
                if let Err(e) = self.connect_next(attempt.remaining, attempt.tx_power) {
                    error!("WiFi: no network associated: {}", e);
                    self.link.set(WifiState::Error);
                }
            }
        }
        self.link.get()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
