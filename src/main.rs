//! PackLink accessory firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  SerialPacketTransport   LogEventSink   NvsAdapter   Clock   │
//! │  (UART1, framed)         (EventSink)    (LinkConfig)         │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │           AccessoryLink (pure logic)               │      │
//! │  │  Codec · Lifecycle FSM · Dispatch · Preferences    │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  STATE_BUS (pub/sub) ──▶ animation / UI tasks · SyncLed      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{debug, info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;

use packlink::adapters::log_sink::LogEventSink;
use packlink::adapters::nvs::NvsAdapter;
use packlink::adapters::serial::SerialPacketTransport;
use packlink::adapters::time::MonotonicClock;
use packlink::config::LinkConfig;
use packlink::drivers::sync_led::SyncLed;
use packlink::link::AccessoryLink;
use packlink::notify::STATE_BUS;
use packlink::status::StatusReport;

/// Hub link baud rate.
const HUB_BAUD: u32 = 9600;

/// Main-loop period.  Each iteration handles at most one inbound frame.
const POLL_INTERVAL_MS: u32 = 2;

/// How often the status document is written to the debug log.
const STATUS_INTERVAL_MS: u64 = 5_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PackLink accessory v{}           ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load link config from NVS (or defaults) ────────────
    let config = match NvsAdapter::new() {
        Ok(nvs) => nvs.load_config(),
        Err(e) => {
            warn!("NVS init failed ({}), running with default link config", e);
            LinkConfig::default()
        }
    };
    info!(
        "Link config: retry={}ms watchdog={}ms sync_window={}ms",
        config.initial_retry_ms, config.disconnect_timeout_ms, config.sync_window_ms
    );

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio16,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(HUB_BAUD)),
    )?;
    let mut led = SyncLed::new(PinDriver::output(peripherals.pins.gpio2)?);

    // ── 4. Link ───────────────────────────────────────────────
    let mut link = AccessoryLink::new(SerialPacketTransport::new(uart), config);
    let mut sink = LogEventSink::new();
    let clock = MonotonicClock::new();

    let mut last_connection = link.connection_state();
    let mut last_status = 0u64;

    info!("Entering poll loop ({} ms)", POLL_INTERVAL_MS);

    // ── 5. Poll loop ──────────────────────────────────────────
    loop {
        let now = clock.uptime_ms();
        let report = link.poll(now, &mut sink);
        let connection = link.connection_state();

        if report.changed() || connection != last_connection {
            STATE_BUS.publish(report.fields(), connection, link.state());
            last_connection = connection;
        }

        if let Err(e) = led.update(connection, now) {
            warn!("Sync LED write failed: {:?}", e);
        }

        if now.saturating_sub(last_status) >= STATUS_INTERVAL_MS {
            last_status = now;
            match StatusReport::capture(&link).to_json() {
                Ok(json) => debug!("STATUS | {}", json),
                Err(e) => warn!("STATUS | render failed: {}", e),
            }
        }

        FreeRtos::delay_ms(POLL_INTERVAL_MS);
    }
}
