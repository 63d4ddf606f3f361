//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full history
//! without touching flash, radio or UART.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use camtracker::app::dispatcher::{BatchReport, CommandDispatcher};
use camtracker::app::events::ConfigEvent;
use camtracker::app::hub::ConfigListener;
use camtracker::app::link::{LinkState, WifiState};
use camtracker::app::mode::ModeManager;
use camtracker::app::ports::{RadioPort, ReplyPort, RestartPort, StorageError, StoragePort};
use camtracker::app::store::ConfigStore;
use camtracker::config::{DeviceMode, TrackerConfig, WifiNetwork};
use camtracker::error::CommandError;
use serde_json::Value;

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Stored {
    Str(String),
    I32(i32),
    U32(u32),
    Bool(bool),
}

/// In-memory storage with write counting and failure injection.
#[derive(Debug, Default)]
pub struct MemStorage {
    pub values: HashMap<String, Stored>,
    pub writes: usize,
    pub ends: usize,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: Stored) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Stored> {
        self.values.get(key)
    }

    fn read<T>(&self, key: &str, f: impl FnOnce(&Stored) -> Option<T>) -> Result<Option<T>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::IoError);
        }
        match self.values.get(key) {
            None => Ok(None),
            Some(v) => f(v).map(Some).ok_or(StorageError::TypeMismatch),
        }
    }

    fn write(&mut self, key: &str, value: Stored) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.writes += 1;
        self.values.insert(key.into(), value);
        Ok(())
    }
}

impl StoragePort for MemStorage {
    fn begin(&mut self, _namespace: &str) -> bool {
        !self.fail_reads
    }

    fn get_str(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.read(key, |v| match v {
            Stored::Str(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn get_i32(&self, key: &str) -> Result<Option<i32>, StorageError> {
        self.read(key, |v| match v {
            Stored::I32(n) => Some(*n),
            _ => None,
        })
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError> {
        self.read(key, |v| match v {
            Stored::U32(n) => Some(*n),
            _ => None,
        })
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        self.read(key, |v| match v {
            Stored::Bool(b) => Some(*b),
            _ => None,
        })
    }

    fn put_str(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write(key, Stored::Str(value.into()))
    }

    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), StorageError> {
        self.write(key, Stored::I32(value))
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        self.write(key, Stored::U32(value))
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        self.write(key, Stored::Bool(value))
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.values.clear();
        Ok(())
    }

    fn end(&mut self) {
        self.ends += 1;
    }
}

// ── Radio ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    Begin(DeviceMode),
    Disconnect { force: bool },
}

/// Records begin/disconnect calls.  Polls report `Connecting` while
/// `connecting_polls` lasts, then `Connected`.
#[derive(Debug, Default)]
pub struct MockRadio {
    pub calls: Vec<RadioCall>,
    pub connecting_polls: u32,
}

impl RadioPort for MockRadio {
    fn begin(&mut self, _config: &TrackerConfig, mode: DeviceMode) {
        self.calls.push(RadioCall::Begin(mode));
    }

    fn disconnect(&mut self, force: bool) {
        self.calls.push(RadioCall::Disconnect { force });
    }

    fn poll(&mut self, _now_ms: u64) -> WifiState {
        if self.connecting_polls > 0 {
            self.connecting_polls -= 1;
            WifiState::Connecting
        } else {
            WifiState::Connected
        }
    }
}

// ── Restart / reply ───────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockRestart {
    pub requests: Vec<u32>,
}

impl RestartPort for MockRestart {
    fn schedule_restart(&mut self, delay_ms: u32) {
        self.requests.push(delay_ms);
    }
}

#[derive(Debug, Default)]
pub struct MockReply {
    pub lines: Vec<String>,
}

impl ReplyPort for MockReply {
    fn send_line(&mut self, line: &str) {
        self.lines.push(line.into());
    }
}

// ── Listener ──────────────────────────────────────────────────

pub struct RecordingListener(pub Rc<RefCell<Vec<ConfigEvent>>>);

impl ConfigListener for RecordingListener {
    fn on_config_event(&mut self, event: ConfigEvent, _config: &TrackerConfig) {
        self.0.borrow_mut().push(event);
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Fully wired core over mock adapters.
pub struct Rig {
    pub store: ConfigStore<MemStorage>,
    pub modes: ModeManager,
    pub dispatcher: CommandDispatcher<MockRadio, MockRestart, MockReply>,
    pub link: LinkState,
    pub events: Rc<RefCell<Vec<ConfigEvent>>>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_storage(MemStorage::new())
    }

    /// Load `storage`, then start recording events.
    pub fn with_storage(storage: MemStorage) -> Self {
        let link = LinkState::new();
        let mut store = ConfigStore::new(storage, "openiris", "openiristracker", link.clone());
        store.load();
        let events = Rc::new(RefCell::new(Vec::new()));
        store.attach(RecordingListener(Rc::clone(&events)));
        let modes = ModeManager::new(store.device_mode(), link.clone());
        Self {
            store,
            modes,
            dispatcher: CommandDispatcher::new(
                MockRadio::default(),
                MockRestart::default(),
                MockReply::default(),
            ),
            link,
            events,
        }
    }

    pub fn dispatch(&mut self, document: &Value) -> Result<BatchReport, CommandError> {
        self.dispatcher
            .handle_commands(document, &mut self.store, &mut self.modes)
    }

    pub fn dispatch_one(&mut self, command: &Value) -> bool {
        self.dispatcher
            .handle_command(command, &mut self.store, &mut self.modes)
    }

    pub fn restarts(&self) -> &[u32] {
        &self.dispatcher.restart().requests
    }

    pub fn radio_calls(&self) -> &[RadioCall] {
        &self.dispatcher.radio().calls
    }

    pub fn network(&self, name: &str) -> Option<&WifiNetwork> {
        self.store.networks().iter().find(|n| n.name == name)
    }

    pub fn events(&self) -> Vec<ConfigEvent> {
        self.events.borrow().clone()
    }

    pub fn writes(&self) -> usize {
        self.store.storage().writes
    }
}
