//! The bit-transfer layer moves single bytes over the DD line, clocked by DC.  It owns the lines
//! and keeps track of which side currently drives DD.  Nothing here checks whether a debug
//! session is open; that is the job of `Debugger`.
use embedded_hal::delay::DelayNs;
use log::trace;

use crate::lines::{Line, Lines, Mode};

/// Which side drives the shared DD line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The debugger drives DD_O, the target samples
    Drive,
    /// DD_O is released and the debugger samples DD_I
    Sample,
}

/// Fixed hold times, in nanoseconds.  The target has no clock of its own on the debug interface
/// and only relies on these minimums, so they are never stretched or adapted at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Held after every DC edge while shifting a byte
    pub tick_ns: u32,
    /// Held after releasing DD before sampling it, and after the target reports ready
    pub settle_ns: u32,
    /// Between the DC edges of the entry sequence
    pub entry_pulse_ns: u32,
    /// Before and after the DC pulses of the entry sequence
    pub entry_hold_ns: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing { tick_ns: 250, settle_ns: 250, entry_pulse_ns: 190, entry_hold_ns: 12_500 }
    }
}

impl Timing {
    /// Derive the shift tick from a DC frequency.  The settle time never drops below the 83ns
    /// direction change minimum.
    pub fn from_khz(freq_khz: u32) -> Self {
        let period_ns = 1_000_000 / freq_khz.max(1);
        let half_period = (period_ns / 2).max(1);
        Timing {
            tick_ns: half_period,
            settle_ns: half_period.max(83),
            ..Timing::default()
        }
    }
}

pub struct Transfer<L, D> {
    lines: L,
    delay: D,
    timing: Timing,
    direction: Direction,
}

impl<L, D> Transfer<L, D> where L: Lines, D: DelayNs {
    /// Wrap `lines` without touching them.  The direction is assumed to be `Sample` until the
    /// caller configures the lines and says otherwise with `assume_direction`.
    pub fn new(lines: L, delay: D, timing: Timing) -> Self {
        Transfer { lines, delay, timing, direction: Direction::Sample }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    pub fn release(self) -> (L, D) {
        (self.lines, self.delay)
    }

    /// Record the direction the lines were put in behind our back, without toggling anything
    pub(crate) fn assume_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Hold for one protocol tick
    pub fn tick(&mut self) {
        self.delay.delay_ns(self.timing.tick_ns);
    }

    /// Hold for the direction change / sample wait time
    pub fn settle(&mut self) {
        self.delay.delay_ns(self.timing.settle_ns);
    }

    pub fn hold(&mut self, ns: u32) {
        self.delay.delay_ns(ns);
    }

    /// Switch the DD line over.  Does nothing at all if it is already in `direction`, so repeated
    /// calls never glitch the line.
    pub fn set_direction(&mut self, direction: Direction) {
        if direction == self.direction {
            return;
        }
        self.direction = direction;

        // DD_I never gets a pull-up; the target and the resistor on DD_O set its level
        self.lines.set_level(Line::DataIn, false);
        match direction {
            Direction::Drive => {
                self.lines.set_mode(Line::DataOut, Mode::Output);
                self.lines.set_level(Line::DataOut, false);
            }
            Direction::Sample => {
                self.lines.set_mode(Line::DataOut, Mode::Input);
                self.lines.set_level(Line::DataOut, false);
            }
        }
    }

    /// Shift out one byte, most significant bit first.  The target samples DD while DC is high.
    pub fn write_byte(&mut self, mut data: u8) {
        trace!("write {:02x}", data);
        self.set_direction(Direction::Drive);

        for _ in 0..8 {
            // First put the bit on the bus, then clock it
            self.lines.set_level(Line::DataOut, data & 0x80 != 0);
            self.lines.set_level(Line::Clock, true);
            data <<= 1;
            self.tick();

            self.lines.set_level(Line::Clock, false);
            self.tick();
        }
    }

    /// Shift in one byte, most significant bit first.
    pub fn read_byte(&mut self) -> u8 {
        self.set_direction(Direction::Sample);

        let mut data = 0;
        for _ in 0..8 {
            self.lines.set_level(Line::Clock, true);
            self.tick();

            // Sample while DC is high
            data <<= 1;
            if self.lines.is_high(Line::DataIn) {
                data |= 0x01;
            }

            self.lines.set_level(Line::Clock, false);
            self.tick();
        }
        trace!("read {:02x}", data);
        data
    }

    /// Release DD and wait for the target to pull it low, which means it has a byte ready.  While
    /// it is busy, keep clocking DC in bursts of 8 pulses.  Returns the number of bursts.  There is
    /// no timeout: a target that never gets ready blocks here forever.
    pub fn await_readable(&mut self) -> usize {
        self.set_direction(Direction::Sample);
        self.settle();

        let mut bursts = 0;
        while self.lines.is_high(Line::DataIn) {
            for _ in 0..8 {
                self.lines.set_level(Line::Clock, true);
                self.tick();
                self.lines.set_level(Line::Clock, false);
                self.tick();
            }
            bursts += 1;
        }

        if bursts > 0 {
            trace!("target ready after {} bursts", bursts);
            self.settle();
        }
        bursts
    }
}
