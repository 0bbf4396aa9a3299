// Licensed under the Apache-2.0 license

//! Software recovery of a stuck bus.
//!
//! A slave that lost clocks mid-byte keeps SDA low and the controller reports
//! the bus as active forever. Recovery releases whatever the controller still
//! holds, hands the pads to plain GPIO and clocks SCL by hand, up to
//! [`RECOVERY_PULSES`] times, until the slave lets go of SDA. The pads then go
//! back to the controller and the bus-active bit decides the outcome.
//!
//! Each [`BusRecovery::step`] performs one transition so the procedure can be
//! driven and inspected against a simulated GPIO backend.

use crate::gpio::{Direction, GpioControl, GpioPin, PinMux};
use crate::i2c::common::RECOVERY_PULSES;
use crate::i2c::registers::{I2cRegisters, RegisterIo, Status, WriteData};
use embedded_hal::delay::DelayNs;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The bus was idle, nothing was touched.
    NotNeeded,
    /// Bus-active cleared after `pulses` clock pulses.
    Cleared { pulses: u32 },
    StillBusy,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecoveryState {
    Idle,
    ProbeStatus,
    /// Pulses issued so far.
    PulseClock(u32),
    RestoreMux,
    Done(RecoveryOutcome),
}

/// Recovery procedure for one bus.
pub struct BusRecovery {
    scl: GpioPin,
    sda: GpioPin,
    state: RecoveryState,
    clk_high: bool,
    pulses: u32,
}

impl BusRecovery {
    #[must_use]
    pub fn new(scl: GpioPin, sda: GpioPin) -> Self {
        Self {
            scl,
            sda,
            state: RecoveryState::Idle,
            clk_high: false,
            pulses: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// Advance by one transition and return the new state.
    pub fn step<R, P>(&mut self, regs: &mut I2cRegisters<R>, platform: &mut P) -> RecoveryState
    where
        R: RegisterIo,
        P: GpioControl + PinMux + DelayNs,
    {
        self.state = match self.state {
            RecoveryState::Idle => RecoveryState::ProbeStatus,
            RecoveryState::ProbeStatus => self.probe_status(regs, platform),
            RecoveryState::PulseClock(issued) => self.pulse_clock(issued, platform),
            RecoveryState::RestoreMux => self.restore_mux(regs, platform),
            done @ RecoveryState::Done(_) => done,
        };
        self.state
    }

    /// Drive the procedure to completion.
    pub fn run<R, P>(&mut self, regs: &mut I2cRegisters<R>, platform: &mut P) -> RecoveryOutcome
    where
        R: RegisterIo,
        P: GpioControl + PinMux + DelayNs,
    {
        loop {
            if let RecoveryState::Done(outcome) = self.step(regs, platform) {
                return outcome;
            }
        }
    }

    fn probe_status<R, P>(&mut self, regs: &mut I2cRegisters<R>, platform: &mut P) -> RecoveryState
    where
        R: RegisterIo,
        P: PinMux,
    {
        let status = regs.status();
        if !status.intersects(Status::BUS_ACTIVE | Status::WR_BUFFER_FULL) {
            return RecoveryState::Done(RecoveryOutcome::NotNeeded);
        }

        platform.set_mux_to_i2c(false);

        if status.contains(Status::RD_BUFFER_FULL) {
            regs.write_fifo(WriteData::LAST_BYTE.bits());
            let _ = regs.read_fifo();
        } else if status.contains(Status::BUS_MASTER) {
            regs.write_fifo(WriteData::LAST_BYTE.bits() | 0xff);
        }
        RecoveryState::PulseClock(0)
    }

    fn pulse_clock<P>(&mut self, issued: u32, platform: &mut P) -> RecoveryState
    where
        P: GpioControl + DelayNs,
    {
        if issued >= RECOVERY_PULSES || (platform.get(self.sda) && self.clk_high) {
            self.pulses = issued;
            return RecoveryState::RestoreMux;
        }

        platform.set(self.scl, false);
        platform.delay_ns(5);
        platform.set(self.sda, false);
        platform.delay_ns(5);
        platform.configure(self.scl, Direction::Input);
        platform.delay_ns(5);
        // Give a clock-stretching slave time to let SCL rise.
        if !platform.get(self.scl) {
            platform.delay_ns(20);
        }
        if !platform.get(self.scl) {
            platform.delay_us(10);
        }
        self.clk_high = platform.get(self.scl);
        platform.configure(self.sda, Direction::Input);
        platform.delay_ns(5);

        RecoveryState::PulseClock(issued + 1)
    }

    fn restore_mux<R, P>(&mut self, regs: &mut I2cRegisters<R>, platform: &mut P) -> RecoveryState
    where
        R: RegisterIo,
        P: PinMux + DelayNs,
    {
        platform.set_mux_to_i2c(true);
        platform.delay_ns(10);

        if regs.status().is_busy() {
            RecoveryState::Done(RecoveryOutcome::StillBusy)
        } else {
            RecoveryState::Done(RecoveryOutcome::Cleared {
                pulses: self.pulses,
            })
        }
    }
}
