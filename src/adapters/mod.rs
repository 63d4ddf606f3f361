//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                       | Connects to              |
//! |-------------|----------------------------------|--------------------------|
//! | `log_sink`  | ConfigListener                   | Serial log output        |
//! | `mdns`      | AdvertiserPort, ConfigListener   | ESP-IDF mDNS responder   |
//! | `nvs`       | StoragePort                      | NVS / in-memory store    |
//! | `serial`    | ReplyPort (+ line framing)       | UART console             |
//! | `time`      |:                                | ESP32 system timer       |
//! | `wifi`      | RadioPort                        | ESP-IDF WiFi STA / AP    |

pub mod log_sink;
pub mod mdns;
pub mod nvs;
pub mod serial;
pub mod time;
pub mod wifi;
