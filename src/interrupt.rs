// Licensed under the Apache-2.0 license

//! Interrupt line capability and the ISR-to-driver latch.
//!
//! Drivers in this crate never run their state machines inside the raw
//! interrupt vector. The vector only signals an [`IrqLatch`]; the driver that
//! owns the peripheral drains the latch through
//! [`InterruptControl::take_pending`] and runs its handler in its own
//! context, so exactly one actor ever mutates driver state.

use core::sync::atomic::{AtomicBool, Ordering};

/// Interrupt line number on the platform interrupt controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IrqNumber(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IrqError {
    /// The line already has an owner.
    AlreadyRegistered,
    /// The line does not exist on this controller.
    InvalidLine,
}

/// Interrupt controller operations for one peripheral line.
pub trait InterruptControl {
    /// Claim `irq` for the calling driver.
    ///
    /// # Errors
    ///
    /// Returns [`IrqError::AlreadyRegistered`] if the line is claimed.
    fn register_source(&mut self, irq: IrqNumber) -> Result<(), IrqError>;

    /// Release a claimed line.
    fn unregister_source(&mut self, irq: IrqNumber);

    fn enable_source(&mut self, irq: IrqNumber);

    fn disable_source(&mut self, irq: IrqNumber);

    /// Consume one pending event for `irq`. Returns `false` if none was raised.
    fn take_pending(&mut self, irq: IrqNumber) -> bool;
}

impl<T: InterruptControl + ?Sized> InterruptControl for &mut T {
    fn register_source(&mut self, irq: IrqNumber) -> Result<(), IrqError> {
        (**self).register_source(irq)
    }

    fn unregister_source(&mut self, irq: IrqNumber) {
        (**self).unregister_source(irq);
    }

    fn enable_source(&mut self, irq: IrqNumber) {
        (**self).enable_source(irq);
    }

    fn disable_source(&mut self, irq: IrqNumber) {
        (**self).disable_source(irq);
    }

    fn take_pending(&mut self, irq: IrqNumber) -> bool {
        (**self).take_pending(irq)
    }
}

/// Single-event latch shared between an interrupt vector and its driver.
///
/// Usable from a `static`: the vector calls [`IrqLatch::signal`], the driver
/// side calls [`IrqLatch::take`].
pub struct IrqLatch {
    raised: AtomicBool,
}

impl IrqLatch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Mark the interrupt as raised. Called from the vector.
    pub fn signal(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Consume the raised flag.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

impl Default for IrqLatch {
    fn default() -> Self {
        Self::new()
    }
}
