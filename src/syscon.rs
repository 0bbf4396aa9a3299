// Licensed under the Apache-2.0 license

//! Peripheral clock control.
//!
//! The QSD8250 clock tree is owned by a separate clock driver. Peripheral
//! drivers only see the capability below, keyed by an opaque clock id. Rates
//! are fixed by that driver; the I2C divider is programmed from the source
//! clock in [`BusConfig`](crate::i2c::BusConfig).

/// Opaque clock identifier understood by the platform clock driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClockId(pub u32);

/// Failure reported by the clock driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockError {
    /// The clock id is not known to the platform.
    UnknownClock,
}

/// Gating of a peripheral clock.
pub trait ClockControl {
    /// Ungate the clock.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::UnknownClock`] if `id` is not a platform clock.
    fn clk_enable(&mut self, id: ClockId) -> Result<(), ClockError>;

    /// Gate the clock. Gating an already gated clock is a no-op.
    fn clk_disable(&mut self, id: ClockId);
}

impl<T: ClockControl + ?Sized> ClockControl for &mut T {
    fn clk_enable(&mut self, id: ClockId) -> Result<(), ClockError> {
        (**self).clk_enable(id)
    }

    fn clk_disable(&mut self, id: ClockId) {
        (**self).clk_disable(id);
    }
}
