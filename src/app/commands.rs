//! Inbound commands from the transport.
//!
//! A command document looks like
//!
//! ```json
//! { "commands": [ { "command": "SET_WIFI", "data": { "ssid": "x", "password": "y" } } ] }
//! ```
//!
//! Each element is parsed independently by [`Command::from_value`]; an
//! unrecognised `command` string parses to [`Command::None`].

use serde_json::Value;

use crate::config::DeviceMode;
use crate::error::CommandError;

/// Network name used by `SET_WIFI` when the sender gives none.
pub const DEFAULT_NETWORK_NAME: &str = "main";

/// Reply token emitted for `PING`.
pub const PONG: &str = "PONG";

/// A validated command ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store client credentials and switch to WiFi mode.
    SetWifi {
        network_name: String,
        ssid: String,
        password: String,
    },
    SetMdns {
        hostname: String,
    },
    Ping,
    SwitchMode {
        mode: DeviceMode,
    },
    /// Forget every client network and fall back to USB mode.
    WipeWifiCreds,
    /// Unknown or missing command name; accepted and ignored.
    None,
}

impl Command {
    /// Parse one element of the `commands` array.
    pub fn from_value(value: &Value) -> Result<Self, CommandError> {
        let Some(name) = value.get("command").and_then(Value::as_str) else {
            return Ok(Self::None);
        };

        match name {
            "SET_WIFI" => {
                let data = data_of(value)?;
                let ssid = str_field(data, "ssid")?;
                let password = str_field(data, "password")?;
                let network_name = data
                    .get("network_name")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_NETWORK_NAME);
                Ok(Self::SetWifi {
                    network_name: network_name.into(),
                    ssid: ssid.into(),
                    password: password.into(),
                })
            }
            "SET_MDNS" => {
                let hostname = str_field(data_of(value)?, "hostname")?;
                if hostname.is_empty() {
                    return Err(CommandError::InvalidField("hostname"));
                }
                Ok(Self::SetMdns {
                    hostname: hostname.into(),
                })
            }
            "PING" => Ok(Self::Ping),
            "SWITCH_MODE" => {
                let raw = data_of(value)?
                    .get("mode")
                    .and_then(Value::as_i64)
                    .ok_or(CommandError::InvalidField("mode"))?;
                let mode = i32::try_from(raw)
                    .ok()
                    .and_then(DeviceMode::from_i32)
                    .ok_or(CommandError::UnknownMode(raw))?;
                Ok(Self::SwitchMode { mode })
            }
            "WIPE_WIFI_CREDS" => Ok(Self::WipeWifiCreds),
            _ => Ok(Self::None),
        }
    }

    /// Wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetWifi { .. } => "SET_WIFI",
            Self::SetMdns { .. } => "SET_MDNS",
            Self::Ping => "PING",
            Self::SwitchMode { .. } => "SWITCH_MODE",
            Self::WipeWifiCreds => "WIPE_WIFI_CREDS",
            Self::None => "NONE",
        }
    }
}

fn data_of(value: &Value) -> Result<&Value, CommandError> {
    value
        .get("data")
        .filter(|d| d.is_object())
        .ok_or(CommandError::MissingData)
}

fn str_field<'a>(data: &'a Value, field: &'static str) -> Result<&'a str, CommandError> {
    data.get(field)
        .and_then(Value::as_str)
        .ok_or(CommandError::InvalidField(field))
}
