//! GPIO / peripheral pin assignments for the ParcelBox controller board
//! (ESP32-WROOM-32 devkit).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// RFID reader (RC522, VSPI)
// ---------------------------------------------------------------------------

pub const SPI_SCK_GPIO: i32 = 18;
pub const SPI_MOSI_GPIO: i32 = 23;
pub const SPI_MISO_GPIO: i32 = 19;
/// RC522 chip select (SDA on most breakout boards).
pub const RFID_SS_GPIO: i32 = 21;
/// RC522 hard reset, held high while running.
pub const RFID_RST_GPIO: i32 = 22;
pub const RFID_SPI_BAUD_HZ: u32 = 4_000_000;

// ---------------------------------------------------------------------------
// Ultrasonic ranger (HC-SR04), mounted in the lid facing down
// ---------------------------------------------------------------------------

pub const ULTRASONIC_TRIG_GPIO: i32 = 12;
/// 5 V echo through a resistive divider.
pub const ULTRASONIC_ECHO_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 4;
pub const LED_GREEN_GPIO: i32 = 2;
pub const LED_RED_GPIO: i32 = 5;
/// LEDC timer frequency at boot; each tone retunes it.
pub const BUZZER_BASE_FREQ_HZ: u32 = 2_000;

// ---------------------------------------------------------------------------
// I²C bus (16x2 LCD with PCF8574 backpack)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 25;
pub const I2C_SCL_GPIO: i32 = 26;
pub const I2C_BAUD_HZ: u32 = 100_000;
pub const LCD_I2C_ADDR: u8 = 0x27;
