// Licensed under the Apache-2.0 license

//! Clients for the devices on the HTC Leo I2C bus.
//!
//! Each client owns (or mutably borrows) an [`I2cMaster`](crate::i2c::I2cMaster)
//! and inherits its retry behaviour.

pub mod ds2746;
pub mod microp;

pub use ds2746::Ds2746;
pub use microp::{LedMode, MicroP};

/// Failure of a device client.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceError<E> {
    /// The bus transfer failed.
    Bus(E),
    /// Command payload longer than the device accepts in one block.
    PayloadTooLarge { len: usize },
}

impl<E: core::fmt::Debug> core::fmt::Display for DeviceError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DeviceError::Bus(e) => write!(f, "bus error: {e:?}"),
            DeviceError::PayloadTooLarge { len } => write!(f, "payload of {len} bytes too large"),
        }
    }
}
