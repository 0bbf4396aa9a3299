// Licensed under the Apache-2.0 license

//! MSM I2C controller register window.
//!
//! The controller exposes a one-entry write FIFO, a one-entry read FIFO, a
//! clock divider, a status word and an interface-select register whose upper
//! bits mirror the raw SCL/SDA pad levels. Accesses have side effects on the
//! FIFOs, so callers must not reorder them.

use crate::i2c::common::Fault;
use bitflags::bitflags;
use embedded_hal::delay::DelayNs;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Register {
    WriteData = 0x00,
    ClockControl = 0x04,
    Status = 0x08,
    ReadData = 0x0c,
    InterfaceSelect = 0x10,
}

impl Register {
    #[must_use]
    pub const fn offset(self) -> usize {
        self as usize
    }
}

/// 32-bit access to the controller registers.
pub trait RegisterIo {
    fn read32(&mut self, reg: Register) -> u32;
    fn write32(&mut self, reg: Register, value: u32);
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    fn read32(&mut self, reg: Register) -> u32 {
        (**self).read32(reg)
    }

    fn write32(&mut self, reg: Register, value: u32) {
        (**self).write32(reg, value);
    }
}

/// Volatile access to a memory-mapped controller.
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the physical (identity mapped) address of an MSM I2C
    /// register block, and no other owner may access it while this handle
    /// exists.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn addr(&self, reg: Register) -> usize {
        self.base.wrapping_add(reg.offset())
    }
}

impl RegisterIo for Mmio {
    fn read32(&mut self, reg: Register) -> u32 {
        // SAFETY: `new` guarantees an exclusively owned register block.
        unsafe { core::ptr::read_volatile(self.addr(reg) as *const u32) }
    }

    fn write32(&mut self, reg: Register, value: u32) {
        // SAFETY: `new` guarantees an exclusively owned register block.
        unsafe { core::ptr::write_volatile(self.addr(reg) as *mut u32, value) }
    }
}

bitflags! {
    /// Controller status word.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Status: u32 {
        const WR_BUFFER_FULL = 1 << 0;
        const RD_BUFFER_FULL = 1 << 1;
        const BUS_ERROR = 1 << 2;
        const PACKET_NACKED = 1 << 3;
        const ARB_LOST = 1 << 4;
        const INVALID_WRITE = 1 << 5;
        const FAILED = 3 << 6;
        const BUS_ACTIVE = 1 << 8;
        const BUS_MASTER = 1 << 9;

        const ERROR_MASK = Self::BUS_ERROR.bits()
            | Self::PACKET_NACKED.bits()
            | Self::ARB_LOST.bits()
            | Self::INVALID_WRITE.bits()
            | Self::FAILED.bits();
    }
}

impl Status {
    #[must_use]
    pub fn is_busy(self) -> bool {
        self.contains(Status::BUS_ACTIVE)
    }

    /// Most specific protocol fault latched in this status word.
    #[must_use]
    pub fn fault(self) -> Option<Fault> {
        if !self.intersects(Status::ERROR_MASK) {
            None
        } else if self.contains(Status::PACKET_NACKED) {
            Some(Fault::Nack)
        } else if self.contains(Status::ARB_LOST) {
            Some(Fault::ArbitrationLost)
        } else if self.contains(Status::BUS_ERROR) {
            Some(Fault::BusError)
        } else if self.contains(Status::INVALID_WRITE) {
            Some(Fault::InvalidWrite)
        } else {
            Some(Fault::Failed)
        }
    }
}

bitflags! {
    /// Control bits of a write-FIFO word. Bits 0..=7 carry the data byte.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct WriteData: u32 {
        const ADDR_BYTE = 1 << 8;
        const LAST_BYTE = 1 << 9;
    }
}

pub const WRITE_DATA_BYTE_MASK: u32 = 0xff;

const INTF_SCL: u32 = 1 << 8;
const INTF_SDA: u32 = 1 << 9;

/// Raw pad levels seen by the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LineState {
    pub scl: bool,
    pub sda: bool,
}

/// Typed view over the controller registers.
pub struct I2cRegisters<R: RegisterIo> {
    io: R,
}

impl<R: RegisterIo> I2cRegisters<R> {
    pub fn new(io: R) -> Self {
        Self { io }
    }

    pub fn into_inner(self) -> R {
        self.io
    }

    pub fn write_fifo(&mut self, word: u32) {
        self.io.write32(Register::WriteData, word);
    }

    /// Write a FIFO word, first waiting out the SCL-low window.
    ///
    /// With SCL high there is enough slack before the controller's scheduled
    /// SCL release. With SCL low, writing immediately can make the controller
    /// release SCL too soon after pulling SDA low.
    pub fn write_fifo_paced<D: DelayNs>(&mut self, word: u32, delay: &mut D) {
        if !self.lines().scl {
            delay.delay_ns(6);
        }
        self.write_fifo(word);
    }

    pub fn read_fifo(&mut self) -> u8 {
        (self.io.read32(Register::ReadData) & WRITE_DATA_BYTE_MASK) as u8
    }

    pub fn status(&mut self) -> Status {
        Status::from_bits_retain(self.io.read32(Register::Status))
    }

    pub fn lines(&mut self) -> LineState {
        let intf = self.io.read32(Register::InterfaceSelect);
        LineState {
            scl: intf & INTF_SCL != 0,
            sda: intf & INTF_SDA != 0,
        }
    }

    pub fn set_clock_control(&mut self, value: u32) {
        self.io.write32(Register::ClockControl, value);
    }

    pub fn clock_control(&mut self) -> u32 {
        self.io.read32(Register::ClockControl)
    }

    #[cfg(test)]
    pub(crate) fn io_mut(&mut self) -> &mut R {
        &mut self.io
    }
}
