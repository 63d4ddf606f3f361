//! Command dispatcher integration tests: full batches through the core
//! over mock adapters.

use crate::mock_hw::{MemStorage, RadioCall, Rig, Stored};
use camtracker::app::dispatcher::{BatchReport, RESTART_DELAY_MS};
use camtracker::app::events::ConfigEvent;
use camtracker::app::link::WifiState;
use camtracker::config::{DeviceMode, DEFAULT_MDNS_SERVICE};
use camtracker::error::CommandError;
use serde_json::json;

#[test]
fn set_wifi_stores_main_network_and_switches_mode() {
    let mut rig = Rig::new();
    let report = rig
        .dispatch(&json!({"commands":[{"command":"SET_WIFI","data":{"ssid":"x","password":"y"}}]}))
        .unwrap();
    assert_eq!(report, BatchReport { executed: 1, dropped: 0 });

    let net = rig.network("main").unwrap();
    assert_eq!(net.ssid, "x");
    assert_eq!(net.password, "y");
    assert_eq!((net.channel, net.power), (0, 0));
    assert!(rig.modes.has_wifi_credentials());
    assert!(rig.store.device_mode().has_wifi_credentials);
    assert_eq!(rig.modes.mode(), DeviceMode::Wifi);
    assert_eq!(rig.store.device_mode().mode, DeviceMode::Wifi);
    assert_eq!(rig.restarts(), [RESTART_DELAY_MS]);
}

#[test]
fn set_wifi_honours_network_name() {
    let mut rig = Rig::new();
    rig.dispatch(&json!({"commands":[
        {"command":"SET_WIFI","data":{"ssid":"a","password":"pw","network_name":"home"}}
    ]}))
    .unwrap();
    assert!(rig.network("home").is_some());
    assert!(rig.network("main").is_none());
}

#[test]
fn set_wifi_at_capacity_still_switches_mode() {
    let mut rig = Rig::new();
    for name in ["a", "b", "c"] {
        rig.store.set_wifi_config(name, name, "pw", 0, 0, false).unwrap();
    }
    rig.dispatch(&json!({"commands":[
        {"command":"SET_WIFI","data":{"ssid":"new","password":"pw","network_name":"fourth"}}
    ]}))
    .unwrap();
    assert_eq!(rig.store.networks().len(), 3);
    assert!(rig.network("fourth").is_none());
    assert_eq!(rig.modes.mode(), DeviceMode::Wifi);
    assert_eq!(rig.restarts().len(), 1);
}

#[test]
fn set_mdns_uses_fixed_service_without_notifying() {
    let mut rig = Rig::new();
    assert!(rig.dispatch_one(&json!({"command":"SET_MDNS","data":{"hostname":"eye-left"}})));
    assert_eq!(rig.store.mdns().hostname, "eye-left");
    assert_eq!(rig.store.mdns().service, DEFAULT_MDNS_SERVICE);
    assert!(rig.events().is_empty());
    assert!(rig.restarts().is_empty());
}

#[test]
fn malformed_set_mdns_changes_nothing() {
    let mut rig = Rig::new();
    let before = rig.store.mdns().clone();
    let writes = rig.writes();

    assert!(!rig.dispatch_one(&json!({"command":"SET_MDNS","data":{}})));
    assert_eq!(*rig.store.mdns(), before);
    assert_eq!(rig.writes(), writes);
    assert!(rig.events().is_empty());
}

#[test]
fn ping_replies_pong_and_mutates_nothing() {
    let mut rig = Rig::new();
    let before = rig.store.config().clone();
    rig.dispatch_one(&json!({"command":"PING"}));
    assert_eq!(rig.dispatcher.reply().lines, ["PONG".to_string()]);
    assert_eq!(*rig.store.config(), before);
    assert!(rig.restarts().is_empty());
}

#[test]
fn switch_mode_schedules_restart() {
    let mut rig = Rig::new();
    assert_eq!(rig.modes.mode(), DeviceMode::Ap);

    rig.dispatch(&json!({"commands":[{"command":"SWITCH_MODE","data":{"mode":0}}]}))
        .unwrap();
    assert_eq!(rig.modes.mode(), DeviceMode::Usb);
    assert_eq!(rig.radio_calls(), [RadioCall::Disconnect { force: true }]);
    assert_eq!(rig.restarts(), [RESTART_DELAY_MS]);
    assert!(rig.events().contains(&ConfigEvent::DeviceModeUpdated));
}

#[test]
fn switch_to_usb_while_connecting_skips_restart() {
    let mut rig = Rig::new();
    rig.link.set(WifiState::Connecting);

    rig.dispatch(&json!({"commands":[{"command":"SWITCH_MODE","data":{"mode":0}}]}))
        .unwrap();
    assert_eq!(rig.modes.mode(), DeviceMode::Usb);
    assert_eq!(rig.radio_calls(), [RadioCall::Disconnect { force: true }]);
    assert!(rig.restarts().is_empty());
}

#[test]
fn switch_to_auto_resolves_from_credentials() {
    let storage = MemStorage::new()
        .with("mode", Stored::I32(0))
        .with("has_wifi_creds", Stored::Bool(true));
    let mut rig = Rig::with_storage(storage);
    assert_eq!(rig.modes.mode(), DeviceMode::Usb);

    rig.dispatch_one(&json!({"command":"SWITCH_MODE","data":{"mode":3}}));
    assert_eq!(rig.modes.mode(), DeviceMode::Wifi);
    assert_eq!(rig.store.storage().get("mode"), Some(&Stored::I32(1)));
}

#[test]
fn switch_mode_rejects_unknown_value() {
    let mut rig = Rig::new();
    assert!(!rig.dispatch_one(&json!({"command":"SWITCH_MODE","data":{"mode":7}})));
    assert!(!rig.dispatch_one(&json!({"command":"SWITCH_MODE","data":{"mode":"0"}})));
    assert!(!rig.dispatch_one(&json!({"command":"SWITCH_MODE"})));
    assert_eq!(rig.modes.mode(), DeviceMode::Ap);
    assert!(rig.restarts().is_empty());
}

#[test]
fn wipe_clears_networks_and_falls_back_to_usb() {
    let mut rig = Rig::new();
    for name in ["a", "b", "c"] {
        rig.store.set_wifi_config(name, name, "pw", 0, 0, false).unwrap();
    }
    rig.modes.set_has_wifi_credentials(true, &mut rig.store);
    rig.events.borrow_mut().clear();

    rig.dispatch(&json!({"commands":[{"command":"WIPE_WIFI_CREDS"}]})).unwrap();
    assert!(rig.store.networks().is_empty());
    assert!(!rig.modes.has_wifi_credentials());
    assert!(!rig.store.device_mode().has_wifi_credentials);
    assert_eq!(rig.modes.mode(), DeviceMode::Usb);
    assert_eq!(rig.restarts(), [RESTART_DELAY_MS]);
    // Deletions are silent; only the mode manager's updates notify.
    assert!(!rig.events().contains(&ConfigEvent::NetworksConfigUpdated));
    // The batch save persisted the empty list.
    assert_eq!(rig.store.storage().get("networkCount"), Some(&Stored::I32(0)));
}

#[test]
fn wipe_on_empty_store_still_switches() {
    let mut rig = Rig::new();
    rig.dispatch(&json!({"commands":[{"command":"WIPE_WIFI_CREDS"}]})).unwrap();
    assert!(rig.store.networks().is_empty());
    assert_eq!(rig.modes.mode(), DeviceMode::Usb);
    assert_eq!(rig.restarts().len(), 1);
}

#[test]
fn missing_commands_array_touches_nothing() {
    let mut rig = Rig::new();
    let writes = rig.writes();
    let ends = rig.store.storage().ends;

    assert_eq!(
        rig.dispatch(&json!({"command":"PING"})),
        Err(CommandError::MissingCommands)
    );
    assert_eq!(
        rig.dispatch(&json!({"commands":"PING"})),
        Err(CommandError::MissingCommands)
    );
    assert_eq!(rig.writes(), writes);
    assert_eq!(rig.store.storage().ends, ends);
    assert!(rig.dispatcher.reply().lines.is_empty());
}

#[test]
fn batch_skips_bad_commands_and_saves_once() {
    let mut rig = Rig::new();
    let ends = rig.store.storage().ends;

    let report = rig
        .dispatch(&json!({"commands":[
            {"command":"SET_WIFI","data":{"ssid":"x"}},
            {"command":"FLY"},
            {"command":"SET_MDNS","data":{"hostname":"cam"}},
            {"command":"PING"}
        ]}))
        .unwrap();
    assert_eq!(report, BatchReport { executed: 3, dropped: 1 });
    assert!(rig.store.networks().is_empty());
    assert_eq!(rig.store.storage().get("hostname"), Some(&Stored::Str("cam".into())));
    assert_eq!(rig.store.storage().ends, ends + 1);
    assert_eq!(rig.dispatcher.reply().lines.len(), 1);
}

#[test]
fn empty_batch_still_saves() {
    let mut rig = Rig::new();
    let ends = rig.store.storage().ends;
    let report = rig.dispatch(&json!({"commands":[]})).unwrap();
    assert_eq!(report, BatchReport::default());
    assert_eq!(rig.store.storage().ends, ends + 1);
}

#[test]
fn overlapping_restarts_are_all_requested() {
    // The dispatcher asks for each; collapsing them is the timer's job.
    let mut rig = Rig::new();
    rig.dispatch(&json!({"commands":[
        {"command":"SWITCH_MODE","data":{"mode":1}},
        {"command":"WIPE_WIFI_CREDS"}
    ]}))
    .unwrap();
    assert_eq!(rig.restarts(), [RESTART_DELAY_MS, RESTART_DELAY_MS]);
    assert_eq!(rig.modes.mode(), DeviceMode::Usb);
}
