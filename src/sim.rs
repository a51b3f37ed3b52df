//! Register-level model of the chip for driver tests.

use std::cell::Cell;
use std::collections::VecDeque;
use std::vec::Vec;

use crate::registers::{Register, becr0, dcr, ellcr, mclr, stsr};
use crate::{Config, Interface, NoResetPin, Ra8875, Timer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Select(u8),
    Write(u8, u8),
    Memory(Vec<u8>),
    Read(u8),
    Status,
}

#[derive(Debug)]
pub(crate) struct BusFault;

/// Echoes register writes back on reads. After a write that starts an
/// engine, that engine reports busy for `busy_polls` reads, or forever when
/// `stuck` is set. A memory write makes the status register report memory
/// busy for `font_polls` reads, with the same `stuck` override.
pub(crate) struct FakeChip {
    pub regs: [u8; 256],
    pub selected: u8,
    pub log: Vec<Op>,
    pub busy_polls: u32,
    pub busy_remaining: u32,
    pub stuck: bool,
    pub font_polls: u32,
    pub status_busy: bool,
    pub status_remaining: u32,
    pub memory: VecDeque<u8>,
    pub fail: bool,
}

impl FakeChip {
    pub fn new() -> Self {
        let mut regs = [0u8; 256];
        regs[Register::Id as usize] = 0x75;
        Self {
            regs,
            selected: 0,
            log: Vec::new(),
            busy_polls: 0,
            busy_remaining: 0,
            stuck: false,
            font_polls: 0,
            status_busy: false,
            status_remaining: 0,
            memory: VecDeque::new(),
            fail: false,
        }
    }

    /// Register writes logged after the first write of `register`
    pub fn writes_after(&self, register: u8) -> usize {
        self.log
            .iter()
            .skip_while(|op| !matches!(op, Op::Write(r, _) if *r == register))
            .skip(1)
            .filter(|op| matches!(op, Op::Write(..) | Op::Memory(_)))
            .count()
    }

    fn busy_bits(register: u8) -> u8 {
        match register {
            r if r == Register::Dcr as u8 => dcr::LINE_SQUARE_TRIANGLE_STATUS | dcr::CIRCLE_STATUS,
            r if r == Register::Ellcr as u8 => ellcr::STATUS,
            r if r == Register::Becr0 as u8 => becr0::STATUS,
            r if r == Register::Mclr as u8 => mclr::STATUS,
            _ => 0,
        }
    }

    fn read_selected(&mut self) -> u8 {
        let register = self.selected;
        self.log.push(Op::Read(register));
        if register == Register::Mrwc as u8 {
            return self.memory.pop_front().unwrap_or(0);
        }
        let bits = Self::busy_bits(register);
        if bits != 0 && !self.stuck {
            if self.busy_remaining > 0 {
                self.busy_remaining -= 1;
            } else {
                self.regs[register as usize] &= !bits;
            }
        }
        self.regs[register as usize]
    }
}

impl Interface for FakeChip {
    type Error = BusFault;

    fn write_command(&mut self, register: u8) -> Result<(), BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        self.selected = register;
        self.log.push(Op::Select(register));
        Ok(())
    }

    fn write_data(&mut self, data: &[u8]) -> Result<(), BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        let register = self.selected;
        if register == Register::Mrwc as u8 {
            self.log.push(Op::Memory(data.to_vec()));
            self.status_busy = true;
            self.status_remaining = self.font_polls;
            return Ok(());
        }
        for &byte in data {
            self.log.push(Op::Write(register, byte));
            self.regs[register as usize] = byte;
            if Self::busy_bits(register) & byte != 0 {
                self.busy_remaining = self.busy_polls;
            }
        }
        Ok(())
    }

    fn read_data(&mut self, buf: &mut [u8]) -> Result<(), BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        for byte in buf.iter_mut() {
            *byte = self.read_selected();
        }
        Ok(())
    }

    fn read_status(&mut self) -> Result<u8, BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        self.log.push(Op::Status);
        if !self.status_busy {
            return Ok(0);
        }
        if !self.stuck {
            if self.status_remaining > 0 {
                self.status_remaining -= 1;
            } else {
                self.status_busy = false;
                return Ok(0);
            }
        }
        Ok(stsr::MEMORY_BUSY)
    }
}

std::thread_local! {
    static DELAYED_US: Cell<u64> = const { Cell::new(0) };
}

/// Adds up requested delays instead of sleeping.
pub(crate) struct NoDelay;

impl Timer for NoDelay {
    fn delay_us(microseconds: u64) {
        DELAYED_US.with(|d| d.set(d.get() + microseconds));
    }
}

pub(crate) fn delays() -> u64 {
    DELAYED_US.with(|d| d.get())
}

pub(crate) fn reset_delays() {
    DELAYED_US.with(|d| d.set(0));
}

pub(crate) fn driver(chip: FakeChip) -> Ra8875<FakeChip, NoResetPin, NoDelay> {
    reset_delays();
    Ra8875::new(Config::default(), chip, NoResetPin)
}

/// Driver after `init`, with the bus log and delay counter cleared
pub(crate) fn initialized(chip: FakeChip) -> Ra8875<FakeChip, NoResetPin, NoDelay> {
    let mut display = driver(chip);
    display.init().unwrap();
    display.di.log.clear();
    reset_delays();
    display
}
