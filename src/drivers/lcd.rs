//! 16x2 character LCD driver (HD44780 behind a PCF8574 I2C backpack).
//!
//! The backpack maps its eight output bits onto the LCD bus:
//!
//! ```text
//!   P7 P6 P5 P4 | P3 | P2 | P1 | P0
//!   D7 D6 D5 D4 | BL | EN | RW | RS
//! ```
//!
//! Every byte goes out as two 4-bit nibbles, each latched by an EN pulse.
//! Generic over the `embedded-hal` 1.0 [`I2c`] and [`DelayNs`] traits, so the
//! same driver runs on `esp-idf-hal` and against mocks in host tests.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::DisplayPort;
use crate::display::{fit_line, Line, LCD_COLS};
use crate::error::DriverError;

const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_INCREMENT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;

/// DDRAM start address of each row.
const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub struct Lcd1602<I, D> {
    i2c: I,
    delay: D,
    addr: u8,
    /// Text currently on the glass, so unchanged frames are skipped.
    shown: Option<[Line; 2]>,
}

impl<I: I2c, D: DelayNs> Lcd1602<I, D> {
    pub fn new(i2c: I, delay: D, addr: u8) -> Self {
        Self {
            i2c,
            delay,
            addr,
            shown: None,
        }
    }

    /// Power-on sequence: force 8-bit mode three times, drop to 4-bit,
    /// then configure two lines with the cursor hidden.
    pub fn init(&mut self) -> Result<(), DriverError> {
        self.delay.delay_ms(50);
        for _ in 0..3 {
            self.pulse(0x30 | BACKLIGHT)?;
            self.delay.delay_ms(5);
        }
        self.pulse(0x20 | BACKLIGHT)?;
        self.delay.delay_ms(1);

        self.command(CMD_FUNCTION_4BIT_2LINE)?;
        self.command(CMD_DISPLAY_ON)?;
        self.command(CMD_ENTRY_INCREMENT)?;
        self.clear()?;
        info!("LCD: initialised at 0x{:02X}", self.addr);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), DriverError> {
        self.command(CMD_CLEAR)?;
        self.delay.delay_ms(2);
        self.shown = None;
        Ok(())
    }

    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), DriverError> {
        let offset = ROW_OFFSETS[usize::from(row.min(1))];
        self.command(CMD_SET_DDRAM | (offset + col.min(LCD_COLS as u8 - 1)))
    }

    fn write_row(&mut self, row: u8, text: &Line) -> Result<(), DriverError> {
        self.set_cursor(0, row)?;
        for &ch in text.as_bytes() {
            self.write_byte(ch, RS)?;
        }
        Ok(())
    }

    fn command(&mut self, cmd: u8) -> Result<(), DriverError> {
        self.write_byte(cmd, 0)
    }

    fn write_byte(&mut self, byte: u8, mode: u8) -> Result<(), DriverError> {
        self.pulse((byte & 0xF0) | mode | BACKLIGHT)?;
        self.pulse(((byte << 4) & 0xF0) | mode | BACKLIGHT)?;
        self.delay.delay_us(50);
        Ok(())
    }

    /// Put a nibble on the bus and latch it with an EN high→low edge.
    fn pulse(&mut self, data: u8) -> Result<(), DriverError> {
        self.i2c.write(self.addr, &[data | EN]).map_err(|_| DriverError::I2c)?;
        self.delay.delay_us(1);
        self.i2c.write(self.addr, &[data & !EN]).map_err(|_| DriverError::I2c)?;
        Ok(())
    }

    #[cfg(test)]
    fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c, D: DelayNs> DisplayPort for Lcd1602<I, D> {
    fn show(&mut self, line1: &str, line2: &str) {
        let frame = [fit_line(line1), fit_line(line2)];
        if self.shown.as_ref() == Some(&frame) {
            return;
        }
        let result = self
            .write_row(0, &frame[0])
            .and_then(|()| self.write_row(1, &frame[1]));
        match result {
            Ok(()) => self.shown = Some(frame),
            Err(e) => {
                warn!("LCD: write failed: {}", e);
                self.shown = None;
            }
        }
    }
}
