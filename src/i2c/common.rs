// Licensed under the Apache-2.0 license

//! Common types and constants for the MSM I2C driver modules.
//!
//! This module provides the bus configuration, the error taxonomy, and the
//! compiled-in poll and retry bounds shared by the state machine, the
//! recovery procedure and the orchestrator.

use crate::gpio::GpioPin;
use crate::interrupt::IrqNumber;
use crate::syscon::ClockId;
use fugit::{HertzU32, RateExtU32};

/// Iterations of the "bus not busy" poll before giving up.
pub const POLL_RETRIES: u32 = 200;
/// Poll iterations after which each further iteration waits [`POLL_BACKOFF_US`].
pub const POLL_BACKOFF_AFTER: u32 = 100;
pub const POLL_BACKOFF_US: u32 = 10;

/// Extra attempts `write` makes after the first one fails.
pub const WRITE_RETRY_TIMES: u32 = 10;
/// Extra attempts `read` makes after the first one fails.
pub const READ_RETRY_TIMES: u32 = 10;
pub const RETRY_DELAY_US: u32 = 10;

/// Clock pulses bit-banged on SCL while trying to free a stuck bus.
pub const RECOVERY_PULSES: u32 = 9;

/// Longest message chain accepted by the embedded-hal adapter.
pub const MAX_MESSAGES: usize = 8;

/// TCXO feeding the I2C core.
pub const DEFAULT_SOURCE_CLOCK_HZ: u32 = 19_200_000;

const MIN_BUS_HZ: u32 = 100_000;
const MAX_BUS_HZ: u32 = 400_000;
const HS_DIVIDER: u32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

impl I2cSpeed {
    #[must_use]
    pub fn rate(self) -> HertzU32 {
        (self as u32).Hz()
    }
}

/// Protocol failure latched by the controller status register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    BusError,
    Nack,
    ArbitrationLost,
    InvalidWrite,
    /// The controller's generic failure field was non-zero.
    Failed,
}

/// Why a transaction was declared timed out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Timeout {
    /// The state machine saw an error bit in the status register.
    Fault(Fault),
    /// The bus stayed active past the poll bound and recovery did not free it.
    BusBusy,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The driver is not installed, or the bus was stuck before the transfer
    /// could start and recovery failed.
    NotReady,
    TimedOut(Timeout),
    /// `probe` was called on an installed driver.
    AlreadyInstalled,
    /// Empty chain, address wider than 7 bits, or too many messages.
    Invalid,
    /// Fewer messages than requested went through.
    Incomplete { completed: usize, requested: usize },
    /// The peripheral clock could not be enabled.
    Clock,
    /// The interrupt line could not be claimed.
    Interrupt,
}

impl Error {
    /// The protocol fault behind this error, if any.
    #[must_use]
    pub fn fault(&self) -> Option<Fault> {
        match self {
            Error::TimedOut(Timeout::Fault(fault)) => Some(*fault),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotReady => f.write_str("i2c bus not ready"),
            Error::TimedOut(Timeout::Fault(fault)) => {
                write!(f, "i2c transfer timed out ({fault:?})")
            }
            Error::TimedOut(Timeout::BusBusy) => f.write_str("i2c bus stayed busy"),
            Error::AlreadyInstalled => f.write_str("i2c driver already installed"),
            Error::Invalid => f.write_str("invalid i2c message chain"),
            Error::Incomplete {
                completed,
                requested,
            } => write!(f, "i2c transfer incomplete ({completed}/{requested})"),
            Error::Clock => f.write_str("i2c clock unavailable"),
            Error::Interrupt => f.write_str("i2c interrupt unavailable"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            Error::TimedOut(Timeout::Fault(Fault::Nack)) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown)
            }
            Error::TimedOut(Timeout::Fault(Fault::ArbitrationLost)) => ErrorKind::ArbitrationLoss,
            Error::TimedOut(Timeout::Fault(Fault::BusError | Fault::InvalidWrite)) => {
                ErrorKind::Bus
            }
            Error::TimedOut(Timeout::BusBusy) => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

/// Static description of one I2C bus. Immutable once the driver is probed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusConfig {
    pub base: usize,
    pub clock: ClockId,
    pub irq: IrqNumber,
    pub scl: GpioPin,
    pub sda: GpioPin,
    pub bus_clock: HertzU32,
    pub source_clock: HertzU32,
}

impl BusConfig {
    /// Bus rate actually programmed: out-of-range requests fall back to 100 kHz.
    #[must_use]
    pub fn effective_bus_clock(&self) -> HertzU32 {
        let hz = self.bus_clock.to_Hz();
        if (MIN_BUS_HZ..=MAX_BUS_HZ).contains(&hz) {
            self.bus_clock
        } else {
            MIN_BUS_HZ.Hz()
        }
    }

    /// Value for the clock-control register.
    #[must_use]
    pub fn clock_control(&self) -> u32 {
        let src = self.source_clock.to_Hz();
        let target = self.effective_bus_clock().to_Hz();
        let fs_div = ((src / target) / 2).saturating_sub(3);
        ((HS_DIVIDER & 0x7) << 8) | (fs_div & 0xff)
    }

    /// Bus rate produced by a clock-control value.
    #[must_use]
    pub fn resulting_bus_clock(&self, clock_control: u32) -> HertzU32 {
        let fs_div = clock_control & 0xff;
        (self.source_clock.to_Hz() / (2 * (fs_div + 3))).Hz()
    }
}

pub struct BusConfigBuilder {
    base: usize,
    clock: ClockId,
    irq: IrqNumber,
    scl: GpioPin,
    sda: GpioPin,
    bus_clock: HertzU32,
    source_clock: HertzU32,
}

impl BusConfigBuilder {
    #[must_use]
    pub fn new(base: usize, clock: ClockId, irq: IrqNumber) -> Self {
        Self {
            base,
            clock,
            irq,
            scl: GpioPin(0),
            sda: GpioPin(0),
            bus_clock: I2cSpeed::Standard.rate(),
            source_clock: DEFAULT_SOURCE_CLOCK_HZ.Hz(),
        }
    }
    #[must_use]
    pub fn pins(mut self, scl: GpioPin, sda: GpioPin) -> Self {
        self.scl = scl;
        self.sda = sda;
        self
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.bus_clock = speed.rate();
        self
    }
    #[must_use]
    pub fn bus_clock(mut self, rate: HertzU32) -> Self {
        self.bus_clock = rate;
        self
    }
    #[must_use]
    pub fn source_clock(mut self, rate: HertzU32) -> Self {
        self.source_clock = rate;
        self
    }
    #[must_use]
    pub fn build(self) -> BusConfig {
        BusConfig {
            base: self.base,
            clock: self.clock,
            irq: self.irq,
            scl: self.scl,
            sda: self.sda,
            bus_clock: self.bus_clock,
            source_clock: self.source_clock,
        }
    }
}
