//! Camera tracker firmware: main entry point.
//!
//! Composition root: builds every adapter, wires them to the
//! configuration core and runs the single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NvsAdapter     WifiAdapter    MdnsAdapter     ConsoleReply    │
//! │  (Storage)      (Radio)        (Advertiser)    (Reply)         │
//! │  LineFramer     RestartScheduler  LogConfigListener            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │ ConfigStore · NotificationHub · ModeManager            │    │
//! │  │ CommandDispatcher · NetworkBoot                        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{FreeRtos, NON_BLOCK};
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::wifi::EspWifi;

use camtracker::adapters::log_sink::LogConfigListener;
use camtracker::adapters::mdns::MdnsAdapter;
use camtracker::adapters::nvs::NvsAdapter;
use camtracker::adapters::serial::{self, ConsoleReply, LineFramer};
use camtracker::adapters::time::MonotonicClock;
use camtracker::adapters::wifi::WifiAdapter;
use camtracker::app::boot::NetworkBoot;
use camtracker::app::dispatcher::CommandDispatcher;
use camtracker::app::link::LinkState;
use camtracker::app::mode::ModeManager;
use camtracker::app::store::ConfigStore;
use camtracker::config::{DEFAULT_MDNS_HOSTNAME, DEFAULT_PARTITION};
use camtracker::restart::{RestartScheduler, SystemRestart};

/// Main-loop period.  Bounds command latency and restart-timer jitter.
const LOOP_PERIOD_MS: u32 = 20;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CamTracker v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Configuration ──────────────────────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    let link = LinkState::new();

    let mdns = Rc::new(RefCell::new(MdnsAdapter::new()));
    let mut store = ConfigStore::new(nvs, DEFAULT_PARTITION, DEFAULT_MDNS_HOSTNAME, link.clone());
    store.attach(LogConfigListener::new());
    store.attach(Rc::clone(&mdns));
    store.load();

    // The one and only mode manager; handed out by &mut from here on.
    let mut modes = ModeManager::new(store.device_mode(), link.clone());

    // ── 3. Adapters ───────────────────────────────────────────
    // Non-blocking driver: association is polled by the boot sequence so
    // serial commands keep flowing while it is in flight.
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop, None)?;
    let wifi = WifiAdapter::new(link, esp_wifi);

    let uart = UartDriver::new(
        peripherals.uart0,
        peripherals.pins.gpio1,
        peripherals.pins.gpio3,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(115_200)),
    )?;

    let mut dispatcher = CommandDispatcher::new(wifi, RestartScheduler::new(), ConsoleReply::new());
    let mut framer = LineFramer::new();
    let mut boot = NetworkBoot::new();
    let mut restart = SystemRestart;
    let clock = MonotonicClock::new();

    info!("System ready in {:?} mode. Entering main loop.", modes.mode());

    // ── 4. Main loop ──────────────────────────────────────────
    let mut rx = [0u8; 256];
    loop {
        let n = match uart.read(&mut rx, NON_BLOCK) {
            Ok(n) => n,
            Err(e) => {
                warn!("Serial: read failed: {}", e);
                0
            }
        };
        for &byte in &rx[..n] {
            let Some(line) = framer.push(byte) else {
                continue;
            };
            let Some(document) = serial::parse_line(line) else {
                continue;
            };
            if let Err(e) = dispatcher.handle_commands(&document, &mut store, &mut modes) {
                warn!("Serial: batch rejected: {}", e);
            }
        }

        let now_ms = clock.uptime_ms();

        // Bring the network up one stage per iteration so commands (e.g. a
        // switch to USB) are still serviced in between.
        if !boot.status().is_finished() {
            let status = boot.step(
                &modes,
                store.config(),
                dispatcher.radio_mut(),
                &mut *mdns.borrow_mut(),
                now_ms,
            );
            if status.is_finished() {
                info!("Boot: network bring-up finished: {:?}", status);
            }
        }

        dispatcher.restart_mut().tick(now_ms, &mut restart);

        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
