// Licensed under the Apache-2.0 license

//! # I2C bus master traits
//!
//! Upward interface of the bus drivers, split the same way the hardware
//! splits: a core trait for bus-level housekeeping and a master trait for
//! the transfer operations consumed by the board device drivers.
//!
//! ```text
//! I2cHardwareCore (clock, recovery)
//!     └── I2cMaster (transfer, write, read, write_read, transaction_slice)
//! ```

use crate::i2c::message::Message;
use embedded_hal::i2c::{Operation, SevenBitAddress};
use fugit::HertzU32;

/// Bus-level operations every I2C master driver provides.
pub trait I2cHardwareCore {
    /// Hardware-specific error type that implements embedded-hal error traits
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Bus frequency produced by the programmed divider.
    fn bus_clock(&self) -> HertzU32;

    /// Free a bus left mid-transaction by a misbehaving slave.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus is still active after recovery, or the
    /// driver is not installed.
    fn recover_bus(&mut self) -> Result<(), Self::Error>;
}

/// I2C master operations. Addresses are 7 bits.
///
/// # Examples
///
/// ```rust,no_run
/// use htcleo_bsp::i2c::I2cMaster;
///
/// fn read_temperature<T: I2cMaster>(i2c: &mut T) -> Result<u16, T::Error> {
///     let mut data = [0u8; 2];
///     i2c.read(0x48, 0x00, &mut data)?;
///     Ok(u16::from_be_bytes(data))
/// }
/// ```
pub trait I2cMaster: I2cHardwareCore {
    /// Run `msgs` as one transaction, single attempt.
    ///
    /// Returns the number of messages fully transferred, which is less than
    /// `msgs.len()` if the bus stalled and was recovered mid-chain.
    ///
    /// # Errors
    ///
    /// Returns an error on a protocol fault, on a stuck bus that recovery
    /// could not free, on an invalid chain, or when the driver is not
    /// installed.
    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> Result<usize, Self::Error>;

    /// Write `bytes` to `addr`, retrying failed attempts.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt once retries are exhausted.
    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read `buffer.len()` bytes starting at register `reg` of `addr`,
    /// retrying failed attempts.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt once retries are exhausted.
    fn read(
        &mut self,
        addr: SevenBitAddress,
        reg: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Write `bytes` then read into `buffer` with a repeated start, retrying
    /// failed attempts.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt once retries are exhausted.
    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Execute embedded-hal operations against one address as a single
    /// transaction. Each operation becomes its own message.
    ///
    /// # Errors
    ///
    /// Returns an error if any operation fails or the chain is only partly
    /// transferred.
    fn transaction_slice(
        &mut self,
        addr: SevenBitAddress,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error>;
}

impl<T: I2cHardwareCore + ?Sized> I2cHardwareCore for &mut T {
    type Error = T::Error;

    fn bus_clock(&self) -> HertzU32 {
        (**self).bus_clock()
    }

    fn recover_bus(&mut self) -> Result<(), Self::Error> {
        (**self).recover_bus()
    }
}

impl<T: I2cMaster + ?Sized> I2cMaster for &mut T {
    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> Result<usize, Self::Error> {
        (**self).transfer(msgs)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write(addr, bytes)
    }

    fn read(
        &mut self,
        addr: SevenBitAddress,
        reg: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        (**self).read(addr, reg, buffer)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        (**self).write_read(addr, bytes, buffer)
    }

    fn transaction_slice(
        &mut self,
        addr: SevenBitAddress,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        (**self).transaction_slice(addr, ops_slice)
    }
}
