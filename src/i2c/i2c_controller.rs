// Licensed under the Apache-2.0 license

//! embedded-hal 1.0 front end for the bus master drivers.
//!
//! Lets generic `embedded_hal::i2c::I2c` device crates run on top of any
//! [`I2cMaster`]. A plain `read` becomes a single read message; `write` and
//! `write_read` keep the driver's retry behaviour.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::traits::I2cMaster;
use crate::log_error;
use embedded_hal::i2c::{Operation, SevenBitAddress};

pub struct I2cController<H: I2cMaster, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub logger: L,
}

impl<H: I2cMaster> I2cController<H, NoOpLogger> {
    pub fn new(hardware: H) -> Self {
        Self {
            hardware,
            logger: NoOpLogger,
        }
    }
}

impl<H: I2cMaster, L: Logger> I2cController<H, L> {
    pub fn with_logger(hardware: H, logger: L) -> Self {
        Self { hardware, logger }
    }

    pub fn into_inner(self) -> H {
        self.hardware
    }

    fn report<T>(
        &mut self,
        op: &str,
        addr: u8,
        result: Result<T, H::Error>,
    ) -> Result<T, H::Error> {
        if let Err(err) = &result {
            log_error!(self.logger, "{} {:#04x}: {:?}", op, addr, err);
        }
        result
    }
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::ErrorType for I2cController<H, L> {
    type Error = H::Error;
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::I2c for I2cController<H, L> {
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let result = self
            .hardware
            .transaction_slice(addr, &mut [Operation::Read(buffer)]);
        self.report("read", addr, result)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        let result = self.hardware.write(addr, bytes);
        self.report("write", addr, result)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let result = self.hardware.write_read(addr, bytes, buffer);
        self.report("write_read", addr, result)
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let result = self.hardware.transaction_slice(addr, operations);
        self.report("transaction", addr, result)
    }
}
