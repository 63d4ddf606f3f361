//! Millisecond uptime for the main loop's timers.
//!
//! Restart deadlines and association timeouts are bare `u64` millisecond
//! stamps read from [`MonotonicClock::uptime_ms`].  Only differences between
//! stamps matter, so each clock counts from the moment it was built.

/// Platform microsecond counter.  Never decreases.
#[cfg(target_os = "espidf")]
fn counter_us() -> u64 {
    // SAFETY: esp_timer is running before app_main is entered.
    let raw = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    u64::try_from(raw).unwrap_or(0)
}

#[cfg(not(target_os = "espidf"))]
fn counter_us() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = *EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin_us: u64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin_us: counter_us(),
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        counter_us().saturating_sub(self.origin_us) / 1_000
    }
}
