//! ParcelBox firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter       FirebaseAdapter   NvsAdapter            │
//! │  (RC522 · HC-SR04 ·    (BackendPort)     (ConfigPort)          │
//! │   LCD · LEDs/buzzer)   WifiAdapter       LogEventSink          │
//! │                        (Connectivity)    (EventSink)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           SessionController (pure logic)               │    │
//! │  │  Session FSM · Capacity · Holds · Scheduler            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::Result;
use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriver, SpiDriverConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use parcelbox::adapters::device_id;
use parcelbox::adapters::entropy::HardwareRng;
use parcelbox::adapters::firebase::{FirebaseAdapter, FirebaseEndpoints};
use parcelbox::adapters::hardware::HardwareAdapter;
use parcelbox::adapters::log_sink::LogEventSink;
use parcelbox::adapters::nvs::NvsAdapter;
use parcelbox::adapters::time::MonotonicClock;
use parcelbox::adapters::wifi::{ConnectivityPort, WifiAdapter};
use parcelbox::app::ports::{BackendPort, ClockPort, ConfigPort};
use parcelbox::app::service::SessionController;
use parcelbox::config::{SystemConfig, SECRETS};
use parcelbox::drivers::hw_init;
use parcelbox::drivers::indicators::Indicators;
use parcelbox::drivers::lcd::Lcd1602;
use parcelbox::drivers::mfrc522::Mfrc522;
use parcelbox::drivers::ultrasonic::HcSr04;
use parcelbox::pins;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ParcelBox v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let config = match NvsAdapter::new() {
        Ok(nvs) => nvs.load().unwrap_or_else(|e| {
            warn!("Config: {}, using defaults", e);
            SystemConfig::default()
        }),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            SystemConfig::default()
        }
    };
    let dev_id = device_id::resolve(&config.device_id);
    info!("Device ID: {}", dev_id);

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let clock = MonotonicClock::new();
    hw_init::init_peripherals()?;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio25,
        peripherals.pins.gpio26,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUD_HZ)),
    )?;
    let mut lcd = Lcd1602::new(i2c, Delay::new_default(), pins::LCD_I2C_ADDR);
    if let Err(e) = lcd.init() {
        warn!("LCD init failed: {}", e);
    }

    let mut rfid_rst = PinDriver::output(peripherals.pins.gpio22)?;
    rfid_rst.set_high()?;
    let spi = SpiDriver::new(
        peripherals.spi3,
        peripherals.pins.gpio18,
        peripherals.pins.gpio23,
        Some(peripherals.pins.gpio19),
        &SpiDriverConfig::new(),
    )?;
    let spi = SpiDeviceDriver::new(
        spi,
        Some(peripherals.pins.gpio21),
        &SpiConfig::new().baudrate(Hertz(pins::RFID_SPI_BAUD_HZ)),
    )?;
    let mut reader = Mfrc522::new(spi);
    if let Err(e) = reader.init(&mut Delay::new_default()) {
        warn!("RC522 init failed: {}", e);
    }

    let ranger = HcSr04::new(
        PinDriver::output(peripherals.pins.gpio12)?,
        PinDriver::input(peripherals.pins.gpio14)?,
        Delay::new_default(),
        move || clock.uptime_us(),
    );

    let mut hw = HardwareAdapter::new(reader, ranger, lcd, Indicators::new(), HardwareRng::new());

    // ── 4. WiFi station ───────────────────────────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), None)?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sysloop)?, config.wifi_retry_ms);
    match wifi.set_credentials(SECRETS.wifi_ssid, SECRETS.wifi_password) {
        Ok(()) => {
            if let Err(e) = wifi.connect() {
                warn!("WiFi: {}, will keep retrying", e);
            }
        }
        Err(e) => warn!("WiFi: {}, running offline", e),
    }

    // ── 5. Firebase ───────────────────────────────────────────
    let endpoints = FirebaseEndpoints::from_secrets(&SECRETS);
    if !endpoints.is_configured() {
        warn!("Firebase: credentials missing, backend stays offline");
    }
    let mut firebase = FirebaseAdapter::new(endpoints, HTTP_TIMEOUT);
    if wifi.is_connected() {
        if let Err(e) = firebase.reconnect() {
            warn!("Firebase: {}", e);
        }
    }

    // ── 6. Controller ─────────────────────────────────────────
    let loop_interval_ms = config.loop_interval_ms;
    let mut sink = LogEventSink::new();
    let mut controller = SessionController::new(config, dev_id);
    controller.start(clock.now_ms(), wifi.is_connected(), &mut firebase, &mut hw, &mut sink);

    info!("System ready. Entering main loop.");

    // ── 7. Main loop ──────────────────────────────────────────
    loop {
        let now_ms = clock.now_ms();
        wifi.poll(now_ms);
        controller.tick(now_ms, wifi.is_connected(), &mut firebase, &mut hw, &mut sink);
        FreeRtos::delay_ms(loop_interval_ms);
    }
}
