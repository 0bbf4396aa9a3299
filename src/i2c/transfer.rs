// Licensed under the Apache-2.0 license

//! Interrupt-driven byte transfer state machine.
//!
//! [`Transfer::service`] is the interrupt handler body: given the status word
//! sampled for the event, it feeds the write FIFO or drains the read FIFO and
//! advances through the message chain. Error bits clear on read, so the
//! caller hands over the one sample it took instead of the handler reading
//! status again. The orchestrator primes it with one synchronous
//! call (the controller raises nothing until the first byte is written) and
//! then calls it again for every pending interrupt.
//!
//! Reads need the stop request one FIFO write ahead of the final byte: the
//! `LAST_BYTE` marker is written while byte `n - 2` is being drained, or, for
//! a single-byte read, while byte 0 is drained. In the single-byte case the
//! controller clocks in one byte too many, which is flushed and discarded.

use crate::i2c::common::Fault;
use crate::i2c::message::Message;
use crate::i2c::registers::{I2cRegisters, RegisterIo, Status, WriteData};
use embedded_hal::delay::DelayNs;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    AwaitingAddressByte,
    TransferringData,
    MessageComplete,
    TransactionComplete,
    ErrorHalt,
}

impl Phase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::TransactionComplete | Phase::ErrorHalt)
    }
}

/// In-flight transaction over a borrowed message chain.
pub struct Transfer<'m, 'b> {
    msgs: &'m mut [Message<'b>],
    index: usize,
    /// Position in the current buffer, `None` while the address byte is pending.
    pos: Option<usize>,
    cnt: usize,
    /// Address and data bytes moved through the FIFOs.
    moved: usize,
    need_flush: bool,
    flush_cnt: u32,
    fault: Option<Fault>,
    timed_out: bool,
    phase: Phase,
}

impl<'m, 'b> Transfer<'m, 'b> {
    pub fn new(msgs: &'m mut [Message<'b>]) -> Self {
        let cnt = msgs.first().map_or(0, Message::len);
        Self {
            msgs,
            index: 0,
            pos: None,
            cnt,
            moved: 0,
            need_flush: false,
            flush_cnt: 0,
            fault: None,
            timed_out: false,
            phase: Phase::AwaitingAddressByte,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Bytes received that no message asked for.
    #[must_use]
    pub fn flush_count(&self) -> u32 {
        self.flush_cnt
    }

    /// Monotonic count of address and data bytes moved, bounded by the chain
    /// length. Flushed bytes do not count.
    #[must_use]
    pub fn progress(&self) -> usize {
        self.moved
    }

    pub fn requested(&self) -> usize {
        self.msgs.len()
    }

    /// Messages fully moved through the FIFO so far.
    #[must_use]
    pub fn completed(&self) -> usize {
        let current_done =
            self.index < self.msgs.len() && self.pos.is_some() && self.cnt == 0;
        self.index + usize::from(current_done)
    }

    /// Record that the orchestrator gave up waiting on the bus.
    pub fn mark_timed_out(&mut self) {
        self.timed_out = true;
    }

    fn remaining(&self) -> usize {
        self.msgs.len().saturating_sub(self.index)
    }

    /// Handle one controller event described by `status`.
    pub fn service<R: RegisterIo, D: DelayNs>(
        &mut self,
        status: Status,
        regs: &mut I2cRegisters<R>,
        delay: &mut D,
    ) -> Phase {
        if self.phase == Phase::ErrorHalt || self.index >= self.msgs.len() {
            return self.phase;
        }

        if let Some(fault) = status.fault() {
            self.fault = Some(fault);
            self.timed_out = true;
            self.phase = Phase::ErrorHalt;
            return self.phase;
        }

        let mut not_done = true;
        if !status.contains(Status::WR_BUFFER_FULL) {
            not_done = self.fill_write_buffer(regs, delay);
        }
        if status.contains(Status::RD_BUFFER_FULL) {
            self.drain_read_buffer(regs);
        }

        if self.pos.is_some() && self.cnt == 0 {
            if self.remaining() > 1 {
                self.index += 1;
                self.pos = None;
                self.cnt = self.msgs.get(self.index).map_or(0, Message::len);
                self.phase = Phase::AwaitingAddressByte;
            } else if !not_done && !self.need_flush {
                self.phase = Phase::TransactionComplete;
            } else if self.phase != Phase::TransactionComplete {
                self.phase = Phase::MessageComplete;
            }
        } else if self.pos.is_some() {
            self.phase = Phase::TransferringData;
        }
        self.phase
    }

    fn fill_write_buffer<R: RegisterIo, D: DelayNs>(
        &mut self,
        regs: &mut I2cRegisters<R>,
        delay: &mut D,
    ) -> bool {
        let last_msg = self.remaining() == 1;
        let Some(msg) = self.msgs.get(self.index) else {
            return false;
        };

        let Some(pos) = self.pos else {
            let mut word = WriteData::ADDR_BYTE.bits() | msg.address_byte();
            if last_msg && msg.is_empty() {
                word |= WriteData::LAST_BYTE.bits();
            }
            regs.write_fifo_paced(word, delay);
            self.pos = Some(0);
            self.moved += 1;
            return true;
        };

        if self.cnt == 0 {
            return false;
        }
        // Read messages have nothing to push after the address byte.
        let Some(byte) = msg.outgoing(pos) else {
            return false;
        };
        let mut word = u32::from(byte);
        if self.cnt == 1 && last_msg {
            word |= WriteData::LAST_BYTE.bits();
        }
        regs.write_fifo_paced(word, delay);
        self.pos = Some(pos + 1);
        self.cnt -= 1;
        self.moved += 1;
        true
    }

    fn drain_read_buffer<R: RegisterIo>(&mut self, regs: &mut I2cRegisters<R>) {
        let expected = match (self.msgs.get(self.index), self.pos) {
            (Some(msg), Some(pos)) if msg.is_read() && self.cnt > 0 => Some(pos),
            _ => None,
        };

        if let Some(pos) = expected {
            match self.cnt {
                1 if pos == 0 => {
                    self.need_flush = true;
                    regs.write_fifo(WriteData::LAST_BYTE.bits());
                }
                2 => regs.write_fifo(WriteData::LAST_BYTE.bits()),
                _ => {}
            }
            let byte = regs.read_fifo();
            if let Some(msg) = self.msgs.get_mut(self.index) {
                msg.store(pos, byte);
            }
            self.cnt -= 1;
            self.pos = Some(pos + 1);
            self.moved += 1;
        } else {
            // Stop requests are sometimes ignored, but a second one in a row
            // is an invalid write.
            if self.flush_cnt & 1 == 1 {
                regs.write_fifo(WriteData::LAST_BYTE.bits());
            }
            let _ = regs.read_fifo();
            if self.need_flush {
                self.need_flush = false;
            } else {
                self.flush_cnt += 1;
            }
        }
    }
}
