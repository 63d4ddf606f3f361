//! Fuzz target: serial line framing and command dispatch
//!
//! Pushes arbitrary bytes through the console line framer and runs every
//! complete line that parses as JSON through the command dispatcher over
//! the host storage, radio, restart and reply backends.  The network list
//! must stay within capacity with unique names whatever arrives.
//!
//! cargo fuzz run fuzz_command_batch

#![no_main]

use camtracker::adapters::nvs::NvsAdapter;
use camtracker::adapters::serial::{parse_line, ConsoleReply, LineFramer};
use camtracker::adapters::wifi::WifiAdapter;
use camtracker::app::dispatcher::CommandDispatcher;
use camtracker::app::link::LinkState;
use camtracker::app::mode::ModeManager;
use camtracker::app::store::ConfigStore;
use camtracker::config::MAX_NETWORKS;
use camtracker::restart::RestartScheduler;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(storage) = NvsAdapter::new() else {
        return;
    };
    let link = LinkState::new();
    let mut store = ConfigStore::new(storage, "fuzz", "tracker", link.clone());
    store.load();
    let mut modes = ModeManager::new(store.device_mode(), link.clone());
    let mut dispatcher = CommandDispatcher::new(
        WifiAdapter::new(link),
        RestartScheduler::new(),
        ConsoleReply::new(),
    );
    let mut framer = LineFramer::new();

    for &byte in data {
        let Some(document) = framer.push(byte).and_then(parse_line) else {
            continue;
        };
        let _ = dispatcher.handle_commands(&document, &mut store, &mut modes);

        let nets = store.networks();
        assert!(nets.len() <= MAX_NETWORKS);
        for (i, a) in nets.iter().enumerate() {
            assert!(nets[i + 1..].iter().all(|b| b.name != a.name));
        }
        assert_eq!(store.device_mode().mode, modes.mode());
    }
});
