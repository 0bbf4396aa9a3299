// Licensed under the Apache-2.0 license

//! Host-side model of the MSM I2C controller, its pads and its platform.
//!
//! The register handle and the platform handle share one [`SimState`], the
//! same way the real controller and the TLMM/clock/interrupt blocks share the
//! physical bus. Slaves answer synchronously: a FIFO write is on the wire by
//! the time the register write returns.
//!
//! Interrupts: every transmitted or received byte and every error latches an
//! edge in an [`IrqLatch`]; the write-buffer-empty condition while mastering
//! a write is level triggered. Both are masked by the interrupt enable and
//! the peripheral clock.

use crate::gpio::{Direction, GpioControl, GpioPin, PinMux};
use crate::i2c::common::{BusConfig, BusConfigBuilder, I2cSpeed};
use crate::i2c::registers::{Register, RegisterIo, Status, WriteData};
use crate::interrupt::{InterruptControl, IrqError, IrqLatch, IrqNumber};
use crate::syscon::{ClockControl, ClockError, ClockId};
use embedded_hal::delay::DelayNs;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::vec::Vec;

/// Behaviour of a simulated slave.
#[derive(Clone, Debug)]
pub enum Device {
    /// Register file: the first written byte sets the register pointer,
    /// further bytes are stored and reads return consecutive registers.
    Registers(Vec<(u8, u8)>),
    /// Never acknowledges its address.
    Nack,
    /// Register file that, during the first transaction only, stops after
    /// `bytes` data bytes and holds SDA low until clocked once.
    StallOnce { regs: Vec<(u8, u8)>, bytes: usize },
    /// Register file that needs `pulses` SCL edges to release SDA once
    /// [`Sim::hold_bus`] has wedged it.
    StuckSda { pulses: u32 },
}

struct Slave {
    regs: [u8; 256],
    pointer: u8,
    nack: bool,
    stall_after: Option<usize>,
    stuck_pulses: u32,
}

impl Slave {
    fn new(device: Device) -> Self {
        let mut slave = Self {
            regs: [0; 256],
            pointer: 0,
            nack: false,
            stall_after: None,
            stuck_pulses: 0,
        };
        let init = match device {
            Device::Registers(init) => init,
            Device::Nack => {
                slave.nack = true;
                Vec::new()
            }
            Device::StallOnce { regs, bytes } => {
                slave.stall_after = Some(bytes);
                regs
            }
            Device::StuckSda { pulses } => {
                slave.stuck_pulses = pulses;
                Vec::new()
            }
        };
        for (reg, value) in init {
            slave.regs[usize::from(reg)] = value;
        }
        slave
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    Idle,
    Write,
    Read,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ReadStop {
    Streaming,
    LastRequested,
    Final,
}

struct SimState {
    slaves: HashMap<u8, Slave>,
    mode: Mode,
    target: u8,
    data_bytes: usize,
    pointer_set: bool,
    bus_active: bool,
    master: bool,
    stalled: bool,
    rd_buf: Option<u8>,
    read_stop: ReadStop,
    errors: u32,
    sda_stuck: Option<u32>,
    clk_ctl: u32,

    clock_on: bool,
    irq_enabled: bool,
    irq_registered: bool,
    edge: IrqLatch,

    mux_i2c: bool,
    scl_low: bool,
    sda_low: bool,

    clk_enables: u32,
    clk_disables: u32,
    irq_enables: u32,
    irq_disables: u32,
    irq_registrations: u32,
    starts: u32,
    scl_pulses: u32,
    mux_switches: u32,
    delay_ns: u64,
}

impl SimState {
    fn new() -> Self {
        Self {
            slaves: HashMap::new(),
            mode: Mode::Idle,
            target: 0,
            data_bytes: 0,
            pointer_set: false,
            bus_active: false,
            master: false,
            stalled: false,
            rd_buf: None,
            read_stop: ReadStop::Streaming,
            errors: 0,
            sda_stuck: None,
            clk_ctl: 0,
            clock_on: false,
            irq_enabled: false,
            irq_registered: false,
            edge: IrqLatch::new(),
            mux_i2c: false,
            scl_low: false,
            sda_low: false,
            clk_enables: 0,
            clk_disables: 0,
            irq_enables: 0,
            irq_disables: 0,
            irq_registrations: 0,
            starts: 0,
            scl_pulses: 0,
            mux_switches: 0,
            delay_ns: 0,
        }
    }

    fn release_bus(&mut self) {
        self.mode = Mode::Idle;
        self.bus_active = false;
        self.master = false;
        self.stalled = false;
    }

    fn stall(&mut self) {
        if let Some(slave) = self.slaves.get_mut(&self.target) {
            slave.stall_after = None;
        }
        self.stalled = true;
        self.sda_stuck = Some(1);
    }

    fn stall_due(&self) -> bool {
        self.slaves
            .get(&self.target)
            .and_then(|s| s.stall_after)
            .is_some_and(|after| self.data_bytes >= after)
    }

    fn status(&mut self) -> u32 {
        let mut status = core::mem::take(&mut self.errors);
        if self.rd_buf.is_some() {
            status |= Status::RD_BUFFER_FULL.bits();
        }
        if self.bus_active || self.sda_stuck.is_some() {
            status |= Status::BUS_ACTIVE.bits();
        }
        if self.master {
            status |= Status::BUS_MASTER.bits();
        }
        status
    }

    fn interface_select(&self) -> u32 {
        let mut intf = 0;
        if !self.scl_low {
            intf |= 1 << 8;
        }
        if !self.sda_low && self.sda_stuck.is_none() {
            intf |= 1 << 9;
        }
        intf
    }

    fn write_data(&mut self, word: u32) {
        if self.stalled {
            return;
        }
        if word & WriteData::ADDR_BYTE.bits() != 0 {
            self.address(word);
            return;
        }
        let last = word & WriteData::LAST_BYTE.bits() != 0;
        match self.mode {
            Mode::Write => {
                if self.stall_due() {
                    self.stall();
                    return;
                }
                let byte = (word & 0xff) as u8;
                if let Some(slave) = self.slaves.get_mut(&self.target) {
                    if self.pointer_set {
                        slave.regs[usize::from(slave.pointer)] = byte;
                        slave.pointer = slave.pointer.wrapping_add(1);
                    } else {
                        slave.pointer = byte;
                        self.pointer_set = true;
                    }
                }
                self.data_bytes += 1;
                if last {
                    self.release_bus();
                }
                self.edge.signal();
            }
            Mode::Read if last => {
                if self.read_stop == ReadStop::Streaming {
                    self.read_stop = ReadStop::LastRequested;
                } else {
                    self.errors |= Status::INVALID_WRITE.bits();
                    self.edge.signal();
                }
            }
            _ => {}
        }
    }

    fn address(&mut self, word: u32) {
        if self.mode == Mode::Idle {
            self.starts += 1;
        }
        let addr = ((word >> 1) & 0x7f) as u8;
        let read = word & 1 != 0;
        self.bus_active = true;
        self.master = true;
        self.rd_buf = None;
        self.read_stop = ReadStop::Streaming;
        self.edge.signal();

        let acked = self.slaves.get(&addr).is_some_and(|s| !s.nack);
        if !acked {
            self.errors |= Status::PACKET_NACKED.bits();
            self.release_bus();
            return;
        }
        if self.target != addr || self.mode == Mode::Idle {
            self.data_bytes = 0;
        }
        self.target = addr;
        self.pointer_set = false;
        if word & WriteData::LAST_BYTE.bits() != 0 {
            self.release_bus();
            return;
        }
        if read {
            self.mode = Mode::Read;
            self.load_next();
        } else {
            self.mode = Mode::Write;
        }
    }

    fn load_next(&mut self) {
        if self.stall_due() {
            self.stall();
            return;
        }
        if let Some(slave) = self.slaves.get_mut(&self.target) {
            self.rd_buf = Some(slave.regs[usize::from(slave.pointer)]);
            slave.pointer = slave.pointer.wrapping_add(1);
        }
        self.data_bytes += 1;
        self.edge.signal();
    }

    fn read_data(&mut self) -> u32 {
        let byte = self.rd_buf.take().unwrap_or(0);
        if self.mode == Mode::Read && !self.stalled {
            match self.read_stop {
                ReadStop::Streaming => self.load_next(),
                ReadStop::LastRequested => {
                    self.read_stop = ReadStop::Final;
                    self.load_next();
                }
                ReadStop::Final => self.release_bus(),
            }
        }
        u32::from(byte)
    }

    fn level_irq(&self) -> bool {
        self.mode == Mode::Write && self.master && !self.stalled
    }
}

/// Handle to one simulated bus.
#[derive(Clone)]
pub struct Sim {
    state: Rc<RefCell<SimState>>,
}

impl Sim {
    pub const SCL: GpioPin = GpioPin(95);
    pub const SDA: GpioPin = GpioPin(96);
    pub const IRQ: IrqNumber = IrqNumber(11);
    pub const CLOCK: ClockId = ClockId(17);

    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::new())),
        }
    }

    pub fn config() -> BusConfig {
        BusConfigBuilder::new(0, Self::CLOCK, Self::IRQ)
            .pins(Self::SCL, Self::SDA)
            .speed(I2cSpeed::Fast)
            .build()
    }

    pub fn attach(&self, addr: u8, device: Device) {
        self.state
            .borrow_mut()
            .slaves
            .insert(addr, Slave::new(device));
    }

    /// Wedge the bus: `addr` holds SDA low as if it lost clocks mid-byte.
    pub fn hold_bus(&self, addr: u8) {
        let mut st = self.state.borrow_mut();
        let pulses = st.slaves.get(&addr).map_or(1, |s| s.stuck_pulses.max(1));
        st.sda_stuck = Some(pulses);
        st.bus_active = true;
    }

    pub fn split(&self) -> (SimRegs, SimPlatform) {
        (
            SimRegs {
                state: Rc::clone(&self.state),
            },
            SimPlatform {
                state: Rc::clone(&self.state),
            },
        )
    }

    pub fn register(&self, addr: u8, reg: u8) -> u8 {
        self.state
            .borrow()
            .slaves
            .get(&addr)
            .map_or(0, |s| s.regs[usize::from(reg)])
    }

    pub fn clk_enables(&self) -> u32 {
        self.state.borrow().clk_enables
    }

    pub fn clk_disables(&self) -> u32 {
        self.state.borrow().clk_disables
    }

    pub fn irq_enables(&self) -> u32 {
        self.state.borrow().irq_enables
    }

    pub fn irq_disables(&self) -> u32 {
        self.state.borrow().irq_disables
    }

    pub fn irq_registrations(&self) -> u32 {
        self.state.borrow().irq_registrations
    }

    pub fn irq_registered(&self) -> bool {
        self.state.borrow().irq_registered
    }

    pub fn clock_on(&self) -> bool {
        self.state.borrow().clock_on
    }

    pub fn irq_enabled(&self) -> bool {
        self.state.borrow().irq_enabled
    }

    /// Start conditions seen on the bus.
    pub fn starts(&self) -> u32 {
        self.state.borrow().starts
    }

    pub fn scl_pulses(&self) -> u32 {
        self.state.borrow().scl_pulses
    }

    /// Total time spent in platform delays.
    pub fn delayed_ns(&self) -> u64 {
        self.state.borrow().delay_ns
    }

    pub fn mux_switches(&self) -> u32 {
        self.state.borrow().mux_switches
    }

    pub fn mux_is_i2c(&self) -> bool {
        self.state.borrow().mux_i2c
    }

    pub fn clock_control(&self) -> u32 {
        self.state.borrow().clk_ctl
    }

    pub fn bus_active(&self) -> bool {
        let st = self.state.borrow();
        st.bus_active || st.sda_stuck.is_some()
    }
}

pub struct SimRegs {
    state: Rc<RefCell<SimState>>,
}

impl RegisterIo for SimRegs {
    fn read32(&mut self, reg: Register) -> u32 {
        let mut st = self.state.borrow_mut();
        if !st.clock_on {
            return 0;
        }
        match reg {
            Register::WriteData => 0,
            Register::ClockControl => st.clk_ctl,
            Register::Status => st.status(),
            Register::ReadData => st.read_data(),
            Register::InterfaceSelect => st.interface_select(),
        }
    }

    fn write32(&mut self, reg: Register, value: u32) {
        let mut st = self.state.borrow_mut();
        if !st.clock_on {
            return;
        }
        match reg {
            Register::WriteData => st.write_data(value),
            Register::ClockControl => st.clk_ctl = value,
            _ => {}
        }
    }
}

pub struct SimPlatform {
    state: Rc<RefCell<SimState>>,
}

impl ClockControl for SimPlatform {
    fn clk_enable(&mut self, id: ClockId) -> Result<(), ClockError> {
        let mut st = self.state.borrow_mut();
        if id != Sim::CLOCK {
            return Err(ClockError::UnknownClock);
        }
        st.clock_on = true;
        st.clk_enables += 1;
        Ok(())
    }

    fn clk_disable(&mut self, id: ClockId) {
        let mut st = self.state.borrow_mut();
        if id == Sim::CLOCK {
            st.clock_on = false;
            st.clk_disables += 1;
        }
    }
}

impl InterruptControl for SimPlatform {
    fn register_source(&mut self, irq: IrqNumber) -> Result<(), IrqError> {
        let mut st = self.state.borrow_mut();
        if irq != Sim::IRQ {
            return Err(IrqError::InvalidLine);
        }
        if st.irq_registered {
            return Err(IrqError::AlreadyRegistered);
        }
        st.irq_registered = true;
        st.irq_registrations += 1;
        Ok(())
    }

    fn unregister_source(&mut self, _irq: IrqNumber) {
        self.state.borrow_mut().irq_registered = false;
    }

    fn enable_source(&mut self, _irq: IrqNumber) {
        let mut st = self.state.borrow_mut();
        st.irq_enabled = true;
        st.irq_enables += 1;
    }

    fn disable_source(&mut self, _irq: IrqNumber) {
        let mut st = self.state.borrow_mut();
        st.irq_enabled = false;
        st.irq_disables += 1;
        // Edges raised while masked are dropped.
        st.edge.take();
    }

    fn take_pending(&mut self, irq: IrqNumber) -> bool {
        let st = self.state.borrow();
        if irq != Sim::IRQ || !st.irq_enabled || !st.clock_on {
            return false;
        }
        let edge = st.edge.take();
        edge || st.level_irq()
    }
}

impl GpioControl for SimPlatform {
    fn get(&mut self, pin: GpioPin) -> bool {
        let st = self.state.borrow();
        if pin == Sim::SCL {
            !st.scl_low
        } else if pin == Sim::SDA {
            !st.sda_low && st.sda_stuck.is_none()
        } else {
            false
        }
    }

    fn set(&mut self, pin: GpioPin, level: bool) {
        let mut st = self.state.borrow_mut();
        if pin == Sim::SCL {
            st.scl_low = !level;
        } else if pin == Sim::SDA {
            st.sda_low = !level;
        }
    }

    fn configure(&mut self, pin: GpioPin, direction: Direction) {
        if direction == Direction::Output {
            return;
        }
        let mut st = self.state.borrow_mut();
        if pin == Sim::SCL && st.scl_low {
            st.scl_low = false;
            st.scl_pulses += 1;
            st.sda_stuck = match st.sda_stuck {
                Some(n) if n > 1 => Some(n - 1),
                _ => None,
            };
        } else if pin == Sim::SDA {
            st.sda_low = false;
        }
    }
}

impl PinMux for SimPlatform {
    fn set_mux_to_i2c(&mut self, i2c: bool) {
        let mut st = self.state.borrow_mut();
        st.mux_switches += 1;
        st.mux_i2c = i2c;
        if !i2c {
            // The controller loses the pads and drops its bus state.
            st.release_bus();
            st.rd_buf = None;
        }
    }
}

impl DelayNs for SimPlatform {
    fn delay_ns(&mut self, ns: u32) {
        self.state.borrow_mut().delay_ns += u64::from(ns);
    }
}
