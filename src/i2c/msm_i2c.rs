// Licensed under the Apache-2.0 license

//! MSM I2C bus master driver.
//!
//! [`MsmI2c`] owns the register window, the platform capabilities and the
//! bus configuration. A transaction runs inside a bus session guard, which
//! ungates the clock and unmasks the interrupt on entry and undoes both when
//! dropped, whatever the outcome.
//!
//! Completion is observed by polling the bus-active bit. Each iteration
//! drains the interrupt latch, takes one status sample and, if an event was
//! raised or the sample carries an error, runs the transfer state machine on
//! that sample, so the state machine has a single mutator. Only iterations
//! in which no byte moved count toward the poll bound.

use crate::common::{Logger, NoOpLogger};
use crate::gpio::{GpioControl, PinMux};
use crate::i2c::common::{
    BusConfig, Error, Timeout, MAX_MESSAGES, POLL_BACKOFF_AFTER, POLL_BACKOFF_US, POLL_RETRIES,
    READ_RETRY_TIMES, RETRY_DELAY_US, WRITE_RETRY_TIMES,
};
use crate::i2c::message::Message;
use crate::i2c::recovery::{BusRecovery, RecoveryOutcome};
use crate::i2c::registers::{I2cRegisters, Mmio, RegisterIo};
use crate::i2c::traits::{I2cHardwareCore, I2cMaster};
use crate::i2c::transfer::Transfer;
use crate::interrupt::InterruptControl;
use crate::syscon::ClockControl;
use crate::{log_debug, log_error};
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Operation, SevenBitAddress};
use fugit::HertzU32;

/// Everything the bus master needs from the rest of the platform.
pub trait I2cPlatform: ClockControl + InterruptControl + GpioControl + PinMux + DelayNs {}

impl<T> I2cPlatform for T where T: ClockControl + InterruptControl + GpioControl + PinMux + DelayNs {}

pub struct MsmI2c<R: RegisterIo, P: I2cPlatform, L: Logger = NoOpLogger> {
    regs: I2cRegisters<R>,
    platform: P,
    config: BusConfig,
    installed: bool,
    logger: L,
}

impl<R: RegisterIo, P: I2cPlatform> MsmI2c<R, P, NoOpLogger> {
    pub fn new(io: R, platform: P, config: BusConfig) -> Self {
        Self::with_logger(io, platform, config, NoOpLogger)
    }
}

impl<P: I2cPlatform> MsmI2c<Mmio, P, NoOpLogger> {
    /// Driver for the controller mapped at `config.base`.
    ///
    /// # Safety
    ///
    /// `config.base` must address an MSM I2C register block that nothing else
    /// accesses for the lifetime of the driver.
    pub unsafe fn from_config(platform: P, config: BusConfig) -> Self {
        // SAFETY: forwarded from the caller.
        let io = unsafe { Mmio::new(config.base) };
        Self::new(io, platform, config)
    }
}

impl<R: RegisterIo, P: I2cPlatform, L: Logger> MsmI2c<R, P, L> {
    pub fn with_logger(io: R, platform: P, config: BusConfig, logger: L) -> Self {
        Self {
            regs: I2cRegisters::new(io),
            platform,
            config,
            installed: false,
            logger,
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Install the driver: program the clock divider and claim the interrupt.
    ///
    /// # Errors
    ///
    /// * [`Error::AlreadyInstalled`] if the driver is already installed; the
    ///   interrupt is not registered a second time.
    /// * [`Error::Clock`] / [`Error::Interrupt`] if a capability refuses.
    pub fn probe(&mut self) -> Result<(), Error> {
        if self.installed {
            log_error!(self.logger, "already installed");
            return Err(Error::AlreadyInstalled);
        }

        let BusConfig { clock, irq, .. } = self.config;
        self.platform.disable_source(irq);
        self.platform.set_mux_to_i2c(true);
        self.platform.clk_enable(clock).map_err(|_| Error::Clock)?;

        let clk_ctl = self.config.clock_control();
        self.regs.set_clock_control(clk_ctl);
        log_debug!(
            self.logger,
            "probe: clk_ctl {:#x}, {} Hz",
            clk_ctl,
            self.config.resulting_bus_clock(clk_ctl).to_Hz()
        );

        self.platform.clk_disable(clock);
        self.platform
            .register_source(irq)
            .map_err(|_| Error::Interrupt)?;
        self.installed = true;
        Ok(())
    }

    /// Uninstall the driver. A no-op when not installed.
    pub fn remove(&mut self) {
        if !self.installed {
            return;
        }
        let BusConfig { clock, irq, .. } = self.config;
        self.platform.disable_source(irq);
        self.platform.clk_disable(clock);
        self.platform.unregister_source(irq);
        self.platform.set_mux_to_i2c(false);
        self.installed = false;
    }

    fn ensure_installed(&mut self) -> Result<(), Error> {
        if self.installed {
            Ok(())
        } else {
            log_error!(self.logger, "called when driver is not installed");
            Err(Error::NotReady)
        }
    }

    fn session(&mut self) -> Result<BusSession<'_, R, P, L>, Error> {
        BusSession::open(
            &mut self.regs,
            &mut self.platform,
            &self.config,
            &mut self.logger,
        )
    }

    /// Run `msgs` up to `retries + 1` times until every message goes through.
    fn transfer_with_retry(
        &mut self,
        retries: u32,
        msgs: &mut [Message<'_>],
    ) -> Result<(), Error> {
        self.ensure_installed()?;
        let requested = msgs.len();
        let mut last = Error::NotReady;
        for attempt in 0..=retries {
            match self.transfer(msgs) {
                Ok(completed) if completed == requested => return Ok(()),
                Ok(completed) => {
                    last = Error::Incomplete {
                        completed,
                        requested,
                    };
                }
                Err(Error::Invalid) => return Err(Error::Invalid),
                Err(err) => last = err,
            }
            if attempt < retries {
                self.platform.delay_us(RETRY_DELAY_US);
                log_debug!(self.logger, "retry {} after: {}", attempt + 1, last);
            }
        }
        log_error!(self.logger, "giving up after {} attempts: {}", retries + 1, last);
        Err(last)
    }
}

fn validate(msgs: &[Message<'_>]) -> Result<(), Error> {
    if msgs.is_empty() || msgs.iter().any(|m| m.addr > 0x7f) {
        return Err(Error::Invalid);
    }
    Ok(())
}

/// Clock and interrupt held for the duration of one transaction.
struct BusSession<'a, R: RegisterIo, P: I2cPlatform, L: Logger> {
    regs: &'a mut I2cRegisters<R>,
    platform: &'a mut P,
    config: &'a BusConfig,
    logger: &'a mut L,
}

impl<'a, R: RegisterIo, P: I2cPlatform, L: Logger> BusSession<'a, R, P, L> {
    fn open(
        regs: &'a mut I2cRegisters<R>,
        platform: &'a mut P,
        config: &'a BusConfig,
        logger: &'a mut L,
    ) -> Result<Self, Error> {
        platform.clk_enable(config.clock).map_err(|_| Error::Clock)?;
        platform.enable_source(config.irq);
        Ok(Self {
            regs,
            platform,
            config,
            logger,
        })
    }

    /// One poll iteration: take one status sample, hand it to the state
    /// machine if an event is pending or it carries an error, and report
    /// bus-active from the same sample.
    fn poll_not_busy(
        &mut self,
        transfer: Option<&mut Transfer<'_, '_>>,
    ) -> nb::Result<(), Infallible> {
        let pending = self.platform.take_pending(self.config.irq);
        let status = self.regs.status();
        let mut settling = false;
        if let Some(transfer) = transfer {
            // Error bits clear on read: this sample is the only report.
            if pending || status.fault().is_some() {
                let phase = transfer.service(status, self.regs, self.platform);
                settling = !phase.is_terminal();
            }
        }
        if status.is_busy() || settling {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    fn wait_not_busy(
        &mut self,
        mut transfer: Option<&mut Transfer<'_, '_>>,
        warn: bool,
    ) -> Result<(), Error> {
        let mut idle = 0;
        let mut polls = 0u32;
        while idle < POLL_RETRIES {
            let before = transfer.as_deref().map(Transfer::progress);
            match self.poll_not_busy(transfer.as_deref_mut()) {
                Ok(()) => {
                    if warn && polls > 0 {
                        log_debug!(self.logger, "bus was busy ({})", polls);
                    }
                    return Ok(());
                }
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(never)) => match never {},
            }
            polls = polls.saturating_add(1);
            if transfer.as_deref().map(Transfer::progress) != before {
                idle = 0;
                continue;
            }
            if idle > POLL_BACKOFF_AFTER {
                self.platform.delay_us(POLL_BACKOFF_US);
            }
            idle += 1;
        }
        log_debug!(self.logger, "timed out waiting for bus idle");
        Err(Error::TimedOut(Timeout::BusBusy))
    }

    fn recover(&mut self) -> Result<(), Error> {
        let mut recovery = BusRecovery::new(self.config.scl, self.config.sda);
        match recovery.run(self.regs, self.platform) {
            RecoveryOutcome::NotNeeded => Ok(()),
            RecoveryOutcome::Cleared { pulses } => {
                log_debug!(self.logger, "bus busy cleared after {} clock cycles", pulses);
                Ok(())
            }
            RecoveryOutcome::StillBusy => {
                log_error!(
                    self.logger,
                    "bus still busy, status {:#x}",
                    self.regs.status().bits()
                );
                Err(Error::NotReady)
            }
        }
    }

    fn run(&mut self, msgs: &mut [Message<'_>]) -> Result<usize, Error> {
        if self.wait_not_busy(None, true).is_err() {
            self.recover()?;
        }

        let mut transfer = Transfer::new(msgs);
        // The controller raises nothing until the first byte is written.
        let status = self.regs.status();
        transfer.service(status, self.regs, self.platform);

        let settled = self.wait_not_busy(Some(&mut transfer), false);
        if transfer.flush_count() > 0 {
            log_debug!(self.logger, "{} unrequested bytes read", transfer.flush_count());
        }

        if settled.is_err() {
            transfer.mark_timed_out();
            log_debug!(self.logger, "still busy after xfer completion");
            self.recover()
                .map_err(|_| Error::TimedOut(Timeout::BusBusy))?;
        }

        if let Some(fault) = transfer.fault() {
            log_error!(self.logger, "error during data xfer: {:?}", fault);
            // The fault is reported whether or not the bus comes back.
            let _ = self.recover();
            return Err(Error::TimedOut(Timeout::Fault(fault)));
        }

        let completed = transfer.completed();
        if completed < transfer.requested() {
            log_debug!(
                self.logger,
                "transfer incomplete ({}/{})",
                completed,
                transfer.requested()
            );
        }
        Ok(completed)
    }
}

impl<R: RegisterIo, P: I2cPlatform, L: Logger> Drop for BusSession<'_, R, P, L> {
    fn drop(&mut self) {
        self.platform.disable_source(self.config.irq);
        self.platform.clk_disable(self.config.clock);
    }
}

impl<R: RegisterIo, P: I2cPlatform, L: Logger> I2cHardwareCore for MsmI2c<R, P, L> {
    type Error = Error;

    fn bus_clock(&self) -> HertzU32 {
        self.config
            .resulting_bus_clock(self.config.clock_control())
    }

    fn recover_bus(&mut self) -> Result<(), Error> {
        self.ensure_installed()?;
        self.session()?.recover()
    }
}

impl<R: RegisterIo, P: I2cPlatform, L: Logger> I2cMaster for MsmI2c<R, P, L> {
    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> Result<usize, Error> {
        self.ensure_installed()?;
        validate(msgs)?;
        let mut session = self.session()?;
        session.run(msgs)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Error> {
        let mut msgs = [Message::write(addr, bytes)];
        self.transfer_with_retry(WRITE_RETRY_TIMES, &mut msgs)
    }

    fn read(&mut self, addr: SevenBitAddress, reg: u8, buffer: &mut [u8]) -> Result<(), Error> {
        let reg = [reg];
        let mut msgs = [Message::write(addr, &reg), Message::read(addr, buffer)];
        self.transfer_with_retry(READ_RETRY_TIMES, &mut msgs)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        let mut msgs = [Message::write(addr, bytes), Message::read(addr, buffer)];
        self.transfer_with_retry(READ_RETRY_TIMES, &mut msgs)
    }

    fn transaction_slice(
        &mut self,
        addr: SevenBitAddress,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        if ops_slice.is_empty() {
            return Ok(());
        }
        let mut msgs: heapless::Vec<Message<'_>, MAX_MESSAGES> = heapless::Vec::new();
        for op in ops_slice.iter_mut() {
            let msg = match op {
                Operation::Read(buf) => Message::read(addr, buf),
                Operation::Write(bytes) => Message::write(addr, bytes),
            };
            msgs.push(msg).map_err(|_| Error::Invalid)?;
        }
        let requested = msgs.len();
        let completed = self.transfer(&mut msgs)?;
        if completed == requested {
            Ok(())
        } else {
            Err(Error::Incomplete {
                completed,
                requested,
            })
        }
    }
}
