// Licensed under the Apache-2.0 license

//! HTC MicroP, the board microcontroller behind the keypad backlight, the
//! notification LED, the light sensor ADC and a bank of GPIOs.
//!
//! The MicroP speaks a command protocol: a write is a command byte followed
//! by up to [`MAX_PAYLOAD`] payload bytes; a read writes the command byte and
//! reads the response with a repeated start. Multi-byte values are big
//! endian.

use crate::board::MICROP_ADDR;
use crate::common::{Logger, NoOpLogger};
use crate::devices::DeviceError;
use crate::i2c::I2cMaster;
use crate::{log_debug, log_error};

/// Largest write block the MicroP accepts, command byte included.
pub const WRITE_BLOCK_SIZE: usize = 21;
pub const MAX_PAYLOAD: usize = WRITE_BLOCK_SIZE - 1;

/// Command bytes.
pub mod cmd {
    pub const READ_GPIO_STATUS: u8 = 0x10;
    pub const WRITE_LED_PWM: u8 = 0x25;
    pub const READ_VERSION: u8 = 0x30;
    pub const WRITE_GPO_LED_STATUS_EN: u8 = 0x40;
    pub const WRITE_GPO_LED_STATUS_DIS: u8 = 0x41;
    pub const WRITE_LED_CTRL: u8 = 0x51;
    pub const WRITE_READ_ADC_VALUE_REQ: u8 = 0x60;
    pub const READ_ADC_VALUE: u8 = 0x62;
    pub const WRITE_GPI_INT_CTL_EN: u8 = 0x80;
    pub const WRITE_GPI_INT_CTL_DIS: u8 = 0x81;
    pub const READ_GPI_INT_STATUS: u8 = 0x82;
}

/// ADC conversion request for the light sensor channel.
const ADC_REQUEST: [u8; 2] = [0x00, 0x01];
/// Keypad backlight fade timeout passed with every brightness change.
const KEYPAD_TIMEOUT: u8 = 5;
/// LED PWM channel mask of the keypad backlight.
const KEYPAD_PWM_MASK: u16 = 1 << 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LedMode {
    Off,
    Green,
    Amber,
}

impl LedMode {
    /// LED control block: colour enables followed by the default config.
    fn block(self) -> [u8; 7] {
        let (green, amber) = match self {
            LedMode::Off => (0x00, 0x00),
            LedMode::Green => (0x01, 0x00),
            LedMode::Amber => (0x00, 0x04),
        };
        [green, amber, 0x00, 0xFF, 0x00, 0x00, 0x00]
    }
}

type Result<T, E> = core::result::Result<T, DeviceError<E>>;

pub struct MicroP<I: I2cMaster, L: Logger = NoOpLogger> {
    i2c: I,
    addr: u8,
    logger: L,
    version: Option<u8>,
}

impl<I: I2cMaster> MicroP<I, NoOpLogger> {
    pub fn new(i2c: I) -> Self {
        Self::with_logger(i2c, NoOpLogger)
    }
}

impl<I: I2cMaster, L: Logger> MicroP<I, L> {
    pub fn with_logger(i2c: I, logger: L) -> Self {
        Self {
            i2c,
            addr: MICROP_ADDR,
            logger,
            version: None,
        }
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Firmware version read by the last successful [`probe`](Self::probe).
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    /// Read the firmware version to confirm the MicroP answers.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the version read fails.
    pub fn probe(&mut self) -> Result<u8, I::Error> {
        let mut data = [0u8; 2];
        if let Err(e) = self.read_register(cmd::READ_VERSION, &mut data) {
            self.version = None;
            log_error!(self.logger, "microp get version failed: {:?}", e);
            return Err(e);
        }
        let [version, _] = data;
        log_debug!(self.logger, "HTC MicroP {:#04x}", version);
        self.version = Some(version);
        Ok(version)
    }

    /// Send `cmd` followed by `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::PayloadTooLarge`] when `payload` exceeds
    /// [`MAX_PAYLOAD`], or [`DeviceError::Bus`] if the write fails.
    pub fn write_register(&mut self, cmd: u8, payload: &[u8]) -> Result<(), I::Error> {
        let len = payload.len();
        let mut block: heapless::Vec<u8, WRITE_BLOCK_SIZE> = heapless::Vec::new();
        block
            .push(cmd)
            .map_err(|_| DeviceError::PayloadTooLarge { len })?;
        block
            .extend_from_slice(payload)
            .map_err(|()| DeviceError::PayloadTooLarge { len })?;
        self.i2c
            .write(self.addr, &block)
            .map_err(DeviceError::Bus)
    }

    /// Issue `cmd` and read the response into `data`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the read fails.
    pub fn read_register(&mut self, cmd: u8, data: &mut [u8]) -> Result<(), I::Error> {
        self.i2c
            .read(self.addr, cmd, data)
            .map_err(DeviceError::Bus)
    }

    fn read_u16(&mut self, cmd: u8) -> Result<u16, I::Error> {
        let mut data = [0u8; 2];
        self.read_register(cmd, &mut data)?;
        Ok(u16::from_be_bytes(data))
    }

    fn write_u16(&mut self, cmd: u8, value: u16) -> Result<(), I::Error> {
        let result = self.write_register(cmd, &value.to_be_bytes());
        if let Err(e) = &result {
            log_error!(self.logger, "cmd {:#04x} mask {:#06x} failed: {:?}", cmd, value, e);
        }
        result
    }

    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the write fails.
    pub fn set_led_mode(&mut self, mode: LedMode) -> Result<(), I::Error> {
        self.write_register(cmd::WRITE_LED_CTRL, &mode.block())
    }

    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the write fails.
    pub fn set_keypad_brightness(&mut self, brightness: u8) -> Result<(), I::Error> {
        let [mask_hi, mask_lo] = KEYPAD_PWM_MASK.to_be_bytes();
        self.write_register(
            cmd::WRITE_LED_PWM,
            &[KEYPAD_TIMEOUT, brightness, mask_hi, mask_lo],
        )
    }

    /// Request a light sensor conversion and read the result.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the request or the read fails.
    pub fn read_adc(&mut self) -> Result<u16, I::Error> {
        if let Err(e) = self.write_register(cmd::WRITE_READ_ADC_VALUE_REQ, &ADC_REQUEST) {
            log_error!(self.logger, "request adc failed: {:?}", e);
            return Err(e);
        }
        self.read_u16(cmd::READ_ADC_VALUE)
    }

    /// GPIO input/output level bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the read fails.
    pub fn gpio_status(&mut self) -> Result<u16, I::Error> {
        self.read_u16(cmd::READ_GPIO_STATUS)
    }

    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the write fails.
    pub fn gpo_enable(&mut self, mask: u16) -> Result<(), I::Error> {
        self.write_u16(cmd::WRITE_GPO_LED_STATUS_EN, mask)
    }

    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the write fails.
    pub fn gpo_disable(&mut self, mask: u16) -> Result<(), I::Error> {
        self.write_u16(cmd::WRITE_GPO_LED_STATUS_DIS, mask)
    }

    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the write fails.
    pub fn interrupt_enable(&mut self, mask: u16) -> Result<(), I::Error> {
        self.write_u16(cmd::WRITE_GPI_INT_CTL_EN, mask)
    }

    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the write fails.
    pub fn interrupt_disable(&mut self, mask: u16) -> Result<(), I::Error> {
        self.write_u16(cmd::WRITE_GPI_INT_CTL_DIS, mask)
    }

    /// Pending GPI interrupt bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the read fails.
    pub fn interrupt_status(&mut self) -> Result<u16, I::Error> {
        self.read_u16(cmd::READ_GPI_INT_STATUS)
    }
}
