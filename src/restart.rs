//! Deferred restart timer.
//!
//! Command handlers ask for a restart a couple of seconds out so the reply
//! and the final `save()` land before the device goes down.  The main loop
//! drives the timer; when it falls due the [`RestartDelegate`] is invoked.
//!
//! ```text
//!  CommandDispatcher ──schedule_restart(2000)──▶ RestartScheduler
//!                                                     │ tick(now_ms)
//!  main loop ─────────────────────────────────────────┘
//!                                                     ▼
//!                                         RestartDelegate::on_restart_due
//! ```
//!
//! Only one restart is ever pending.  A new request replaces the previous
//! one, so the deadline is always that of the most recent request.

use crate::app::ports::{RestartDelegate, RestartPort};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// Requested, waiting for the next tick to anchor the deadline.
    Requested { delay_ms: u32 },
    Armed { deadline_ms: u64 },
}

/// One-shot restart timer.
#[derive(Debug, Default)]
pub struct RestartScheduler {
    pending: Option<Pending>,
}

impl RestartScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Advance the timer.  Call once per main-loop iteration.
    ///
    /// A request made since the last tick is anchored at `now_ms`.  Returns
    /// `true` if the restart fell due (and the delegate was invoked).
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn RestartDelegate) -> bool {
        match self.pending {
            None => false,
            Some(Pending::Requested { delay_ms }) => {
                let deadline_ms = now_ms.saturating_add(u64::from(delay_ms));
                debug!("RestartScheduler: armed for t={}ms", deadline_ms);
                self.pending = Some(Pending::Armed { deadline_ms });
                false
            }
            Some(Pending::Armed { deadline_ms }) if now_ms >= deadline_ms => {
                info!("RestartScheduler: restart due (t={}ms)", now_ms);
                self.pending = None;
                delegate.on_restart_due();
                true
            }
            Some(Pending::Armed { .. }) => false,
        }
    }
}

impl RestartPort for RestartScheduler {
    fn schedule_restart(&mut self, delay_ms: u32) {
        if self.pending.is_some() {
            debug!("RestartScheduler: replacing pending restart");
        }
        info!("RestartScheduler: restart in {}ms", delay_ms);
        self.pending = Some(Pending::Requested { delay_ms });
    }
}

/// Reboots the chip.
#[cfg(target_os = "espidf")]
pub struct SystemRestart;

#[cfg(target_os = "espidf")]
impl RestartDelegate for SystemRestart {
    fn on_restart_due(&mut self) {
        log::warn!("Restarting device");
        // SAFETY: esp_restart never returns; no Rust state needs unwinding.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }
}
