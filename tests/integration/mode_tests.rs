//! Mode manager and boot sequence integration tests.

use crate::mock_hw::{MemStorage, MockReply, MockRestart, RadioCall, Rig, Stored};
use camtracker::adapters::wifi::WifiAdapter;
use camtracker::app::boot::{BootStage, BootStatus, NetworkBoot};
use camtracker::app::dispatcher::CommandDispatcher;
use camtracker::app::link::{LinkState, WifiState};
use camtracker::app::mode::ModeManager;
use camtracker::app::ports::AdvertiserPort;
use camtracker::app::store::ConfigStore;
use camtracker::config::{DeviceMode, MdnsConfig};
use serde_json::json;

#[derive(Default)]
struct MockAdvertiser {
    started: Vec<String>,
}

impl AdvertiserPort for MockAdvertiser {
    fn start(&mut self, mdns: &MdnsConfig) {
        self.started.push(mdns.hostname.clone());
    }
    fn stop(&mut self) {}
}

fn rig_in(mode: DeviceMode, creds: bool) -> Rig {
    Rig::with_storage(
        MemStorage::new()
            .with("mode", Stored::I32(mode.as_i32()))
            .with("has_wifi_creds", Stored::Bool(creds)),
    )
}

#[test]
fn manager_starts_from_loaded_mode() {
    assert_eq!(rig_in(DeviceMode::Usb, false).modes.mode(), DeviceMode::Usb);
    assert_eq!(rig_in(DeviceMode::Auto, true).modes.mode(), DeviceMode::Wifi);
    assert_eq!(rig_in(DeviceMode::Auto, false).modes.mode(), DeviceMode::Ap);
}

#[test]
fn disconnect_happens_before_mode_is_recorded() {
    let mut rig = rig_in(DeviceMode::Wifi, true);
    let Rig {
        store,
        modes,
        dispatcher,
        ..
    } = &mut rig;

    let t = modes.enter(DeviceMode::Usb, store, dispatcher.radio_mut());
    assert_eq!(t.from, DeviceMode::Wifi);
    assert_eq!(dispatcher.radio().calls, [RadioCall::Disconnect { force: true }]);
    assert_eq!(store.storage().get("mode"), Some(&Stored::I32(0)));
}

#[test]
fn connecting_signal_only_matters_when_leaving_radio() {
    let mut rig = rig_in(DeviceMode::Wifi, true);
    rig.link.set(WifiState::Connecting);
    let Rig {
        store,
        modes,
        dispatcher,
        ..
    } = &mut rig;

    // WIFI -> AP while connecting still restarts.
    let t = modes.enter(DeviceMode::Ap, store, dispatcher.radio_mut());
    assert!(t.restart_required);
    assert!(dispatcher.radio().calls.is_empty());

    // AP -> USB while connecting does not.
    let t = modes.enter(DeviceMode::Usb, store, dispatcher.radio_mut());
    assert!(!t.restart_required);
}

#[test]
fn set_mode_does_not_persist() {
    let mut rig = rig_in(DeviceMode::Wifi, true);
    let writes = rig.writes();
    rig.modes.set_mode(DeviceMode::Usb);
    assert_eq!(rig.modes.mode(), DeviceMode::Usb);
    assert_eq!(rig.writes(), writes);
    assert_eq!(rig.store.device_mode().mode, DeviceMode::Wifi);
}

fn boot_to_end(rig: &mut Rig, adv: &mut MockAdvertiser) -> BootStatus {
    let mut boot = NetworkBoot::new();
    for t in 0..50 {
        let status = boot.step(&rig.modes, rig.store.config(), rig.dispatcher.radio_mut(), adv, t);
        if status.is_finished() {
            return status;
        }
    }
    boot.status()
}

#[test]
fn boot_in_wifi_mode_brings_up_network() {
    let mut rig = rig_in(DeviceMode::Wifi, true);
    rig.dispatcher.radio_mut().connecting_polls = 2;
    let mut adv = MockAdvertiser::default();
    assert_eq!(boot_to_end(&mut rig, &mut adv), BootStatus::NetworkUp);
    assert_eq!(rig.radio_calls(), [RadioCall::Begin(DeviceMode::Wifi)]);
    assert_eq!(adv.started, ["openiristracker".to_string()]);
}

#[test]
fn usb_command_mid_boot_aborts_bring_up() {
    let mut rig = rig_in(DeviceMode::Ap, false);
    let mut adv = MockAdvertiser::default();
    let mut boot = NetworkBoot::new();

    boot.step(&rig.modes, rig.store.config(), rig.dispatcher.radio_mut(), &mut adv, 0);
    rig.dispatch_one(&json!({"command":"SWITCH_MODE","data":{"mode":0}}));
    let status = boot.step(&rig.modes, rig.store.config(), rig.dispatcher.radio_mut(), &mut adv, 20);

    assert_eq!(status, BootStatus::Aborted(BootStage::Link));
    assert!(adv.started.is_empty());
    assert_eq!(
        rig.radio_calls(),
        [
            RadioCall::Begin(DeviceMode::Ap),
            RadioCall::Disconnect { force: true },
            RadioCall::Disconnect { force: true },
        ]
    );
}

#[test]
fn usb_switch_abandons_association_in_flight() {
    let link = LinkState::new();
    let storage = MemStorage::new()
        .with("mode", Stored::I32(DeviceMode::Wifi.as_i32()))
        .with("has_wifi_creds", Stored::Bool(true));
    let mut store = ConfigStore::new(storage, "openiris", "openiristracker", link.clone());
    store.load();
    store.set_wifi_config("main", "SlowNet", "password1", 0, 0, false).unwrap();
    let mut modes = ModeManager::new(store.device_mode(), link.clone());

    let mut radio = WifiAdapter::new(link.clone());
    radio.set_stalled("SlowNet");
    let mut dispatcher =
        CommandDispatcher::new(radio, MockRestart::default(), MockReply::default());
    let mut adv = MockAdvertiser::default();
    let mut boot = NetworkBoot::new();

    // The loop keeps turning while the radio associates.
    boot.step(&modes, store.config(), dispatcher.radio_mut(), &mut adv, 0);
    assert_eq!(link.get(), WifiState::Connecting);
    assert_eq!(
        boot.step(&modes, store.config(), dispatcher.radio_mut(), &mut adv, 20),
        BootStatus::Pending(BootStage::Link)
    );
    assert_eq!(link.get(), WifiState::Connecting);

    dispatcher
        .handle_commands(
            &json!({"commands":[{"command":"SWITCH_MODE","data":{"mode":0}}]}),
            &mut store,
            &mut modes,
        )
        .unwrap();
    assert_eq!(modes.mode(), DeviceMode::Usb);
    assert!(dispatcher.restart().requests.is_empty());
    assert!(!dispatcher.radio().is_started());
    assert_eq!(link.get(), WifiState::Disconnected);

    assert_eq!(
        boot.step(&modes, store.config(), dispatcher.radio_mut(), &mut adv, 40),
        BootStatus::Aborted(BootStage::Link)
    );
    assert!(adv.started.is_empty());
    assert_eq!(link.get(), WifiState::Disconnected);
}
