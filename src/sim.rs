//! An in-memory stand-in for the debug connector, for tests and for replaying recorded
//! conversations without hardware.
//!
//! `Wire` implements `Lines`.  It watches DC: on every rising edge while the debugger drives DD it
//! shifts in one bit of DD_O, and while the debugger samples it shifts out one bit of the byte
//! the `Target` hands it.  Between bytes DD_I reads high for as long as the target says it's busy,
//! which is how the readiness handshake looks on the real wire.  Every mode and level change is
//! recorded so tests can check exactly what the debugger did to the pins.
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use log::{trace, warn};

use crate::chip::DebugStatus;
use crate::instr::{burst_len, InstructionTable};
use crate::lines::{Line, Lines, Mode};

/// The target end of the wire, at byte level
pub trait Target {
    /// The reset-framed entry sequence was seen: RST low, two DC pulses, RST high
    fn enter_debug(&mut self) {}
    /// A byte was shifted in by the debugger
    fn receive(&mut self, byte: u8);
    /// Polled while the debugger waits for DD to go low; `false` keeps it high
    fn ready(&mut self) -> bool {
        true
    }
    /// The next byte to shift out
    fn transmit(&mut self) -> u8;
}

/// A pin change made by the debugger
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Mode(Line, Mode),
    Level(Line, bool),
}

pub struct Wire<T> {
    pub target: T,
    modes: [Mode; 6],
    levels: [bool; 6],
    indicators: bool,
    events: Vec<Event>,
    received: Vec<u8>,
    entries: usize,
    // DC pulses seen since RST went low, `None` once RST is high
    entry_pulses: Option<u8>,
    shift_in: u8,
    bits_in: u8,
    shift_out: u8,
    bits_out: u8,
    out_bit: bool,
    busy: bool,
}

impl<T: Target> Wire<T> {
    pub fn new(target: T) -> Self {
        Wire {
            target,
            modes: [Mode::Input; 6],
            levels: [false; 6],
            indicators: false,
            events: Vec::new(),
            received: Vec::new(),
            entries: 0,
            entry_pulses: None,
            shift_in: 0,
            bits_in: 0,
            shift_out: 0,
            bits_out: 0,
            out_bit: false,
            busy: false,
        }
    }

    /// Pretend read and write indicator LEDs are attached
    pub fn with_indicators(mut self) -> Self {
        self.indicators = true;
        self
    }

    /// Every pin change, in order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Every complete byte the debugger shifted in
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// How many entry sequences were seen
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn mode(&self, line: Line) -> Mode {
        self.modes[line as usize]
    }

    pub fn level(&self, line: Line) -> bool {
        self.levels[line as usize]
    }

    fn driving(&self) -> bool {
        self.modes[Line::DataOut as usize] == Mode::Output
    }

    fn clock_rise(&mut self) {
        if let Some(pulses) = self.entry_pulses.as_mut() {
            *pulses = pulses.saturating_add(1);
            return;
        }

        if self.driving() {
            self.shift_in = (self.shift_in << 1) | self.level(Line::DataOut) as u8;
            self.bits_in += 1;
            if self.bits_in == 8 {
                let byte = self.shift_in;
                trace!("wire: received {:02x}", byte);
                self.received.push(byte);
                self.target.receive(byte);
                self.shift_in = 0;
                self.bits_in = 0;
            }
        } else if !self.busy {
            // Pulses while busy only keep the target going
            if self.bits_out == 0 {
                self.shift_out = self.target.transmit();
                trace!("wire: transmitting {:02x}", self.shift_out);
            }
            self.out_bit = self.shift_out & 0x80 != 0;
            self.shift_out <<= 1;
            self.bits_out += 1;
        }
    }

    fn clock_fall(&mut self) {
        if self.bits_out == 8 {
            self.bits_out = 0;
        }
    }
}

impl<T: Target> Lines for Wire<T> {
    fn set_mode(&mut self, line: Line, mode: Mode) {
        self.events.push(Event::Mode(line, mode));
        self.modes[line as usize] = mode;
    }

    fn set_level(&mut self, line: Line, high: bool) {
        self.events.push(Event::Level(line, high));
        let was_high = self.levels[line as usize];
        self.levels[line as usize] = high;

        match line {
            Line::Reset if !high => self.entry_pulses = Some(0),
            Line::Reset if !was_high => {
                if self.entry_pulses == Some(2) {
                    self.entries += 1;
                    self.shift_in = 0;
                    self.bits_in = 0;
                    self.bits_out = 0;
                    self.target.enter_debug();
                }
                self.entry_pulses = None;
            }
            Line::Clock if high && !was_high => self.clock_rise(),
            Line::Clock if !high && was_high => self.clock_fall(),
            _ => (),
        }
    }

    fn is_high(&mut self, line: Line) -> bool {
        if line != Line::DataIn {
            return self.level(line);
        }

        if self.driving() {
            // DD_O reaches DD_I through the series resistor
            return self.level(Line::DataOut);
        }
        if self.bits_out > 0 {
            return self.out_bit;
        }

        let ready = self.target.ready();
        self.busy = !ready;
        !ready
    }

    fn has_indicators(&self) -> bool {
        self.indicators
    }
}

/// A `DelayNs` that doesn't wait, but adds up how long it was asked to
#[derive(Default)]
pub struct NoDelay {
    pub elapsed_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

/// DD_O wired straight back to DD_I: every byte written is read back, in order
#[derive(Default)]
pub struct Loopback {
    queue: VecDeque<u8>,
}

impl Target for Loopback {
    fn receive(&mut self, byte: u8) {
        self.queue.push_back(byte);
    }

    fn transmit(&mut self) -> u8 {
        self.queue.pop_front().unwrap_or(0xff)
    }
}

/// Replays a recorded target: hands out the scripted bytes in order and ignores what it is sent.
/// The bytes sent can be checked with `Wire::received`.
pub struct Script {
    replies: VecDeque<u8>,
}

impl Script {
    pub fn new(replies: impl IntoIterator<Item = u8>) -> Self {
        Script { replies: replies.into_iter().collect() }
    }

    /// Scripted bytes not read yet
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

impl Target for Script {
    fn receive(&mut self, _byte: u8) {}

    fn transmit(&mut self) -> u8 {
        self.replies.pop_front().unwrap_or_else(|| {
            warn!("script exhausted, reading 0xff");
            0xff
        })
    }
}

/// A byte-level model of the target's debug interface.  It decodes the framing bytes of its
/// instruction table and answers the way a halted chip would.  Debug instructions are recorded
/// but not executed, except `MOV A,#data` which loads the accumulator.
pub struct Emulator {
    pub table: InstructionTable,
    pub chip_id: u16,
    pub pc: u16,
    pub config: u8,
    pub status: u8,
    pub accumulator: u8,
    /// Number of readiness polls answered with "busy" before each reply
    pub busy_polls: u32,
    /// Number of status reads that still show `CHIP_ERASE_BUSY` after a chip erase
    pub erase_polls: u32,
    /// Debug instructions in the order they were executed
    pub executed: Vec<Vec<u8>>,
    /// Payload of the last burst write
    pub burst: Vec<u8>,
    in_debug: bool,
    command: Vec<u8>,
    replies: VecDeque<u8>,
    busy: u32,
    erasing: u32,
}

impl Default for Emulator {
    fn default() -> Self {
        Emulator {
            table: InstructionTable::default(),
            chip_id: 0xa501,
            pc: 0,
            config: 0,
            status: 0,
            accumulator: 0,
            busy_polls: 0,
            erase_polls: 0,
            executed: Vec::new(),
            burst: Vec::new(),
            in_debug: false,
            command: Vec::new(),
            replies: VecDeque::new(),
            busy: 0,
            erasing: 0,
        }
    }
}

impl Emulator {
    pub fn in_debug(&self) -> bool {
        self.in_debug
    }

    // Length of the command in `self.command`, framing byte included
    fn command_len(&self) -> usize {
        let framing = self.command[0];
        if framing & 0x80 != 0 {
            return match self.command.get(1) {
                Some(low) => 2 + burst_len([framing, *low]),
                None => 2,
            };
        }
        if framing == self.table.wr_config {
            return 2;
        }
        match self.table.debug_instr.iter().position(|b| *b == framing) {
            Some(n) => 2 + n,
            None => 1,
        }
    }

    fn execute(&mut self) {
        let command = core::mem::take(&mut self.command);
        let framing = command[0];
        let table = self.table;

        if framing & 0x80 != 0 {
            self.burst = command[2..].to_vec();
            self.replies.push_back(self.status);
        } else if framing == table.halt {
            self.status |= DebugStatus::CPU_HALTED.bits();
            self.replies.push_back(self.status);
        } else if framing == table.resume {
            self.status &= !DebugStatus::CPU_HALTED.bits();
            self.replies.push_back(self.status);
        } else if framing == table.rd_config {
            self.replies.push_back(self.config);
        } else if framing == table.wr_config {
            self.config = command[1];
            self.replies.push_back(self.config);
        } else if table.debug_instr.contains(&framing) {
            let opcodes = &command[1..];
            if let [0x74, data] = opcodes {
                self.accumulator = *data;
            }
            self.executed.push(opcodes.to_vec());
            self.replies.push_back(self.accumulator);
        } else if framing == table.get_chip_id {
            self.replies.extend(self.chip_id.to_be_bytes());
        } else if framing == table.get_pc {
            self.replies.extend(self.pc.to_be_bytes());
        } else if framing == table.read_status {
            let mut status = self.status & !DebugStatus::CHIP_ERASE_BUSY.bits();
            if self.erasing > 0 {
                self.erasing -= 1;
                status |= DebugStatus::CHIP_ERASE_BUSY.bits();
            }
            self.replies.push_back(status);
        } else if framing == table.step {
            self.pc = self.pc.wrapping_add(1);
            self.replies.push_back(self.accumulator);
        } else if framing == table.chip_erase {
            self.erasing = self.erase_polls;
            let mut status = self.status;
            if self.erasing > 0 {
                status |= DebugStatus::CHIP_ERASE_BUSY.bits();
            }
            self.replies.push_back(status);
        } else {
            warn!("emulator: unknown framing byte {:02x}", framing);
            return;
        }
        self.busy = self.busy_polls;
    }
}

impl Target for Emulator {
    fn enter_debug(&mut self) {
        self.in_debug = true;
        self.command.clear();
        self.replies.clear();
    }

    fn receive(&mut self, byte: u8) {
        if !self.in_debug {
            warn!("emulator: byte {:02x} outside debug mode", byte);
            return;
        }
        self.command.push(byte);
        if self.command.len() == self.command_len() {
            self.execute();
        }
    }

    fn ready(&mut self) -> bool {
        if self.busy > 0 {
            self.busy -= 1;
            return false;
        }
        true
    }

    fn transmit(&mut self) -> u8 {
        self.replies.pop_front().unwrap_or(0xff)
    }
}
