// Licensed under the Apache-2.0 license

//! MSM I2C bus master.
//!
//! The driver is layered leaves first: [`registers`] wraps the controller
//! window, [`transfer`] is the per-interrupt byte state machine,
//! [`recovery`] frees a wedged bus by bit-banging SCL, and [`msm_i2c`]
//! orchestrates a transaction around them. [`i2c_controller`] adapts any
//! [`I2cMaster`] to embedded-hal.

pub mod common;
pub mod i2c_controller;
pub mod message;
pub mod msm_i2c;
pub mod recovery;
pub mod registers;
#[cfg(test)]
pub(crate) mod sim;
pub mod traits;
pub mod transfer;

pub use common::{BusConfig, BusConfigBuilder, Error, Fault, I2cSpeed, Timeout};
pub use i2c_controller::I2cController;
pub use message::{Message, MessageBuf};
pub use msm_i2c::{I2cPlatform, MsmI2c};
pub use traits::{I2cHardwareCore, I2cMaster};
