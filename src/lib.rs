// Licensed under the Apache-2.0 license

// Enforce Copilot coding guidelines - prevent panic-prone patterns in production code only
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! Board support for the HTC Leo (Qualcomm QSD8250).
//!
//! The centrepiece is the MSM I2C bus master in [`i2c`]: an interrupt-driven
//! byte-transfer state machine with software bus recovery. The remaining
//! modules describe the platform capabilities that driver consumes (clock,
//! interrupt, GPIO) and the board devices that sit on the bus.

pub mod board;
pub mod common;
pub mod devices;
pub mod gpio;
pub mod i2c;
pub mod interrupt;
pub mod syscon;
pub mod tests;
