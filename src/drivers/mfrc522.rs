//! MFRC522 (RC522) RFID reader over SPI.
//!
//! Only what the locker needs: wake a card with REQA, then run one
//! cascade level of anticollision to read a 4-byte UID.  The card is not
//! selected or halted; it drops back to IDLE on the next REQA, so the
//! reader tracks the last UID to report each presentation once.
//!
//! ## Register access
//!
//! ```text
//!   write:  [ (reg << 1) & 0x7E , value ]
//!   read:   [ 0x80 | (reg << 1) , 0x00 ]  → value in byte 1
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use log::{debug, info, warn};

use crate::access::{code_from_uid, RfidCode};
use crate::app::ports::CardReaderPort;
use crate::error::DriverError;

// ── Registers ─────────────────────────────────────────────────

const COMMAND: u8 = 0x01;
const COM_IEN: u8 = 0x02;
const COM_IRQ: u8 = 0x04;
const ERROR: u8 = 0x06;
const FIFO_DATA: u8 = 0x09;
const FIFO_LEVEL: u8 = 0x0A;
const CONTROL: u8 = 0x0C;
const BIT_FRAMING: u8 = 0x0D;
const COLL: u8 = 0x0E;
const MODE: u8 = 0x11;
const TX_CONTROL: u8 = 0x14;
const TX_ASK: u8 = 0x15;
const T_MODE: u8 = 0x2A;
const T_PRESCALER: u8 = 0x2B;
const T_RELOAD_H: u8 = 0x2C;
const T_RELOAD_L: u8 = 0x2D;
const VERSION: u8 = 0x37;

// ── Commands ──────────────────────────────────────────────────

const PCD_IDLE: u8 = 0x00;
const PCD_TRANSCEIVE: u8 = 0x0C;
const PCD_SOFT_RESET: u8 = 0x0F;

const PICC_REQA: u8 = 0x26;
const PICC_SEL_CL1: u8 = 0x93;
/// NVB for an anticollision frame carrying no UID bits.
const NVB_ANTICOLL: u8 = 0x20;

/// ComIrqReg: RxIRq | IdleIRq.
const IRQ_DONE: u8 = 0x30;
/// ComIrqReg: TimerIRq.
const IRQ_TIMER: u8 = 0x01;
/// ErrorReg: BufferOvfl | CollErr | ParityErr | ProtocolErr.
const ERR_MASK: u8 = 0x1B;

/// ComIrqReg polls before a transceive is abandoned.  The chip timer
/// (~25 ms) fires well before this runs out.
const MAX_IRQ_POLLS: u16 = 2_000;

const FIFO_CAPACITY: usize = 16;

pub struct Mfrc522<S> {
    spi: S,
    last_uid: Option<[u8; 4]>,
}

impl<S: SpiDevice> Mfrc522<S> {
    pub fn new(spi: S) -> Self {
        Self { spi, last_uid: None }
    }

    /// Soft-reset the chip, program the receive timeout and switch the
    /// antenna on.  Returns the silicon version byte (0x91/0x92 for genuine
    /// parts, 0x88 for common clones).
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<u8, DriverError> {
        self.write_reg(COMMAND, PCD_SOFT_RESET)?;
        delay.delay_ms(50);

        // 6.78 MHz / (2*0x0D3E+1) ≈ 40 kHz tick, 30 ticks ≈ 25 ms timeout.
        self.write_reg(T_MODE, 0x8D)?;
        self.write_reg(T_PRESCALER, 0x3E)?;
        self.write_reg(T_RELOAD_L, 30)?;
        self.write_reg(T_RELOAD_H, 0)?;
        // Force 100% ASK, CRC preset 0x6363.
        self.write_reg(TX_ASK, 0x40)?;
        self.write_reg(MODE, 0x3D)?;

        let tx = self.read_reg(TX_CONTROL)?;
        if tx & 0x03 != 0x03 {
            self.write_reg(TX_CONTROL, tx | 0x03)?;
        }

        let version = self.read_reg(VERSION)?;
        if version == 0x00 || version == 0xFF {
            warn!("RC522: no answer on SPI (version=0x{:02X})", version);
            return Err(DriverError::Timeout);
        }
        info!("RC522: ready (version=0x{:02X})", version);
        Ok(version)
    }

    /// Read the UID of the card in the field, if any.
    pub fn read_uid(&mut self) -> Result<Option<[u8; 4]>, DriverError> {
        // REQA is a 7-bit short frame.
        let atqa = match self.transceive(&[PICC_REQA], 0x07) {
            Ok(atqa) => atqa,
            Err(DriverError::Timeout) => return Ok(None),
            Err(e) => return Err(e),
        };
        if atqa.len() != 2 {
            return Ok(None);
        }

        // Collisions are reported rather than resolved.
        self.write_reg(COLL, 0x80)?;
        let frame = self.transceive(&[PICC_SEL_CL1, NVB_ANTICOLL], 0x00)?;
        check_bcc(&frame).map(Some)
    }

    fn transceive(
        &mut self,
        data: &[u8],
        tx_last_bits: u8,
    ) -> Result<heapless::Vec<u8, FIFO_CAPACITY>, DriverError> {
        self.write_reg(COMMAND, PCD_IDLE)?;
        self.write_reg(COM_IEN, 0x77 | 0x80)?;
        self.write_reg(COM_IRQ, 0x7F)?;
        self.write_reg(FIFO_LEVEL, 0x80)?;
        for &byte in data {
            self.write_reg(FIFO_DATA, byte)?;
        }
        self.write_reg(BIT_FRAMING, tx_last_bits & 0x07)?;
        self.write_reg(COMMAND, PCD_TRANSCEIVE)?;
        // StartSend
        self.write_reg(BIT_FRAMING, 0x80 | (tx_last_bits & 0x07))?;

        let mut irq = 0;
        let mut done = false;
        for _ in 0..MAX_IRQ_POLLS {
            irq = self.read_reg(COM_IRQ)?;
            if irq & (IRQ_DONE | IRQ_TIMER) != 0 {
                done = true;
                break;
            }
        }
        self.write_reg(BIT_FRAMING, 0x00)?;

        if !done || irq & IRQ_TIMER != 0 {
            return Err(DriverError::Timeout);
        }
        if self.read_reg(ERROR)? & ERR_MASK != 0 {
            return Err(DriverError::Protocol);
        }

        let level = usize::from(self.read_reg(FIFO_LEVEL)?).min(FIFO_CAPACITY);
        let mut out = heapless::Vec::new();
        for _ in 0..level {
            let byte = self.read_reg(FIFO_DATA)?;
            let _ = out.push(byte);
        }
        // Partial last byte means a short frame we did not ask for.
        if self.read_reg(CONTROL)? & 0x07 != 0 {
            return Err(DriverError::Protocol);
        }
        Ok(out)
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), DriverError> {
        self.spi
            .write(&[(reg << 1) & 0x7E, value])
            .map_err(|_| DriverError::Spi)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, DriverError> {
        let mut buf = [0x80 | ((reg << 1) & 0x7E), 0x00];
        self.spi.transfer_in_place(&mut buf).map_err(|_| DriverError::Spi)?;
        Ok(buf[1])
    }
}

/// Validate a cascade-level-1 answer: four UID bytes followed by their XOR.
pub fn check_bcc(frame: &[u8]) -> Result<[u8; 4], DriverError> {
    let [a, b, c, d, bcc] = frame else {
        return Err(DriverError::Protocol);
    };
    if a ^ b ^ c ^ d != *bcc {
        return Err(DriverError::Protocol);
    }
    Ok([*a, *b, *c, *d])
}

impl<S: SpiDevice> CardReaderPort for Mfrc522<S> {
    fn poll_card(&mut self) -> Option<RfidCode> {
        match self.read_uid() {
            Ok(Some(uid)) if self.last_uid == Some(uid) => None,
            Ok(Some(uid)) => {
                self.last_uid = Some(uid);
                let code = code_from_uid(&uid);
                debug!("RC522: card {}", code);
                Some(code)
            }
            Ok(None) => {
                self.last_uid = None;
                None
            }
            Err(DriverError::Protocol) => {
                // Usually two cards in the field or a card leaving mid-frame.
                debug!("RC522: garbled answer ignored");
                None
            }
            Err(e) => {
                warn!("RC522: {}", e);
                self.last_uid = None;
                None
            }
        }
    }
}
