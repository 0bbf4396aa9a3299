// Licensed under the Apache-2.0 license

//! Maxim DS2746 battery monitor.
//!
//! Every measurement is a big-endian register pair, read one byte per
//! transaction as the part requires.

use crate::board::DS2746_ADDR;
use crate::devices::DeviceError;
use crate::i2c::I2cMaster;
use core::num::NonZeroU32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// DS2745 only.
    TemperatureMsb = 0x0A,
    TemperatureLsb = 0x0B,
    VoltageMsb = 0x0C,
    VoltageLsb = 0x0D,
    CurrentMsb = 0x0E,
    CurrentLsb = 0x0F,
}

/// Voltage LSB in microvolts, on the 12-bit left-justified reading.
const VOLTAGE_RES_UV: u32 = 2440;
/// Current accumulator resolution, scaled by the sense resistor.
const CURRENT_RES: i32 = 645;
/// Temperature LSB in millidegrees Celsius, on the 11-bit reading.
const TEMPERATURE_RES_MDEG: i32 = 125;

pub struct Ds2746<I: I2cMaster> {
    i2c: I,
    addr: u8,
}

impl<I: I2cMaster> Ds2746<I> {
    /// Gauge at its board address.
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, DS2746_ADDR)
    }

    pub fn with_address(i2c: I, addr: u8) -> Self {
        Self { i2c, addr }
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }

    /// Battery voltage in millivolts.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if either register read fails.
    pub fn voltage_mv(&mut self) -> Result<u32, DeviceError<I::Error>> {
        let raw = self.read_pair(Register::VoltageMsb, Register::VoltageLsb)?;
        Ok(u32::from(u16::from_be_bytes(raw) >> 4) * VOLTAGE_RES_UV / 1000)
    }

    /// Battery current for a sense resistor of `rsns_mohm` milliohms.
    /// Negative while discharging.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if either register read fails.
    pub fn current_ma(&mut self, rsns_mohm: NonZeroU32) -> Result<i32, DeviceError<I::Error>> {
        let raw = self.read_pair(Register::CurrentMsb, Register::CurrentLsb)?;
        let counts = i32::from(i16::from_be_bytes(raw) >> 2);
        let rsns = i32::try_from(rsns_mohm.get()).unwrap_or(i32::MAX);
        Ok(counts * CURRENT_RES / rsns)
    }

    /// Temperature in millidegrees Celsius.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if either register read fails.
    pub fn temperature(&mut self) -> Result<i32, DeviceError<I::Error>> {
        let raw = self.read_pair(Register::TemperatureMsb, Register::TemperatureLsb)?;
        Ok(i32::from(i16::from_be_bytes(raw) >> 5) * TEMPERATURE_RES_MDEG)
    }

    fn read_register(&mut self, reg: Register) -> Result<u8, DeviceError<I::Error>> {
        let mut byte = [0u8; 1];
        self.i2c
            .read(self.addr, reg as u8, &mut byte)
            .map_err(DeviceError::Bus)?;
        let [value] = byte;
        Ok(value)
    }

    fn read_pair(&mut self, msb: Register, lsb: Register) -> Result<[u8; 2], DeviceError<I::Error>> {
        Ok([self.read_register(msb)?, self.read_register(lsb)?])
    }
}
