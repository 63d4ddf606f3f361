//! Notification hub: synchronous fan-out of [`ConfigEvent`]s.
//!
//! ```text
//!  ConfigStore ──notify_all──▶ ┌─────────────────┐ ──▶ listener 0
//!                              │ NotificationHub │ ──▶ listener 1
//!                              └─────────────────┘ ──▶ ...
//! ```
//!
//! Listeners run inline on the caller's context, in registration order.
//! A slow listener stalls the mutation that triggered it; there is no
//! timeout.  Listeners live as long as the hub.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::TrackerConfig;

use super::events::ConfigEvent;

/// Capability to react to configuration changes.
///
/// `config` is a read-only view of the aggregate after the change.
pub trait ConfigListener {
    fn on_config_event(&mut self, event: ConfigEvent, config: &TrackerConfig);
}

/// Lets a listener be attached while its owner keeps a handle to it
/// (e.g. the mDNS advertiser, which boot code also drives directly).
impl<L: ConfigListener> ConfigListener for Rc<RefCell<L>> {
    fn on_config_event(&mut self, event: ConfigEvent, config: &TrackerConfig) {
        self.borrow_mut().on_config_event(event, config);
    }
}

/// Ordered registry of config listeners.
#[derive(Default)]
pub struct NotificationHub {
    listeners: Vec<Box<dyn ConfigListener>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.  Registration order is dispatch order.
    pub fn attach(&mut self, listener: impl ConfigListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Invoke every listener with `event`, in registration order.
    pub fn notify_all(&mut self, event: ConfigEvent, config: &TrackerConfig) {
        for listener in &mut self.listeners {
            listener.on_config_event(event, config);
        }
    }
}
