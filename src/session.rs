//! The session layer.  `Debugger` owns the lines through a `Transfer`, keeps track of whether it
//! is allowed to drive them at all (`activate`) and whether the target is in debug mode
//! (`enter`/`exit`), and refuses to touch the hardware otherwise.
//!
//! Refusals don't return errors.  They set the error flag, readable with `error()`, and return
//! a zero result, so a caller streaming commands can check the flag once per reply.
use embedded_hal::delay::DelayNs;
use log::{debug, trace, warn};

use crate::error::ErrorFlag;
use crate::instr::InstructionTable;
use crate::lines::{Line, Lines, Mode};
use crate::transfer::{Direction, Timing, Transfer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Config {
    pub timing: Timing,
    pub table: InstructionTable,
    /// Light the read/write indicators, if the lines have them
    pub indicators: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// All lines are high impedance
    Inactive,
    /// Lines are driven, the target is not in debug mode
    OutOfSession,
    InSession,
}

pub struct Debugger<L, D> {
    pub(crate) transfer: Transfer<L, D>,
    pub(crate) table: InstructionTable,
    indicators: bool,
    active: bool,
    in_session: bool,
    error: ErrorFlag,
}

impl<L, D> Debugger<L, D> where L: Lines, D: DelayNs {
    /// Take over `lines` and put them in their idle state: DC, DD_O and RST driven low, DD_I an
    /// input without pull-up, then DD released.  The debugger starts out active.
    pub fn new(lines: L, delay: D, config: Config) -> Self {
        let indicators = config.indicators && lines.has_indicators();
        let mut debugger = Debugger {
            transfer: Transfer::new(lines, delay, config.timing),
            table: config.table,
            indicators,
            active: true,
            in_session: false,
            error: ErrorFlag::None,
        };
        debugger.drive_lines();
        debugger
    }

    /// Give back the lines and the delay
    pub fn release(self) -> (L, D) {
        self.transfer.release()
    }

    pub fn lines(&self) -> &L {
        self.transfer.lines()
    }

    pub fn lines_mut(&mut self) -> &mut L {
        self.transfer.lines_mut()
    }

    /// The last error.  Reading it has no side effects.
    pub fn error(&self) -> ErrorFlag {
        self.error
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn in_session(&self) -> bool {
        self.in_session
    }

    pub fn direction(&self) -> Direction {
        self.transfer.direction()
    }

    pub fn state(&self) -> State {
        match (self.active, self.in_session) {
            (false, _) => State::Inactive,
            (true, false) => State::OutOfSession,
            (true, true) => State::InSession,
        }
    }

    /// Start or stop driving the lines.  Deactivating puts every line in high impedance so the
    /// target can be used (or debugged by something else) undisturbed, and ends the session.
    /// Asking for the current state changes nothing except clearing the error flag.
    pub fn activate(&mut self, on: bool) {
        self.error = ErrorFlag::None;
        if on == self.active {
            return;
        }
        self.active = on;

        if on {
            debug!("activating debugger");
            self.drive_lines();
        } else {
            debug!("deactivating debugger");
            self.in_session = false;
            self.float_lines();
        }
    }

    fn drive_lines(&mut self) {
        let lines = self.transfer.lines_mut();
        lines.set_mode(Line::Clock, Mode::Output);
        lines.set_mode(Line::DataIn, Mode::Input);
        lines.set_mode(Line::DataOut, Mode::Output);
        lines.set_mode(Line::Reset, Mode::Output);
        for line in Line::DEBUG {
            lines.set_level(line, false);
        }

        if self.indicators {
            for line in Line::INDICATORS {
                lines.set_mode(line, Mode::Output);
                lines.set_level(line, false);
            }
        }

        // DD_O is driven at this point; idle with it released
        self.transfer.assume_direction(Direction::Drive);
        self.transfer.set_direction(Direction::Sample);
    }

    fn float_lines(&mut self) {
        let lines = self.transfer.lines_mut();
        for line in Line::DEBUG {
            lines.set_mode(line, Mode::Input);
            lines.set_level(line, false);
        }

        if self.indicators {
            for line in Line::INDICATORS {
                lines.set_mode(line, Mode::Input);
                lines.set_level(line, false);
            }
        }

        self.transfer.assume_direction(Direction::Sample);
    }

    fn indicator(&mut self, line: Line, on: bool) {
        if self.indicators {
            self.transfer.lines_mut().set_level(line, on);
        }
    }

    pub(crate) fn check_active(&mut self) -> bool {
        if !self.active {
            warn!("debugger is not active");
            self.error = ErrorFlag::Inactive;
            return false;
        }
        true
    }

    pub(crate) fn check_session(&mut self) -> bool {
        if !self.check_active() {
            return false;
        }
        if !self.in_session {
            warn!("target is not in debug mode");
            self.error = ErrorFlag::NotInSession;
            return false;
        }
        true
    }

    /// Preconditions of every high-level command.  Clears the error flag when they hold.
    pub(crate) fn accept(&mut self) -> bool {
        if !self.check_session() {
            return false;
        }
        self.error = ErrorFlag::None;
        true
    }

    pub(crate) fn set_error(&mut self, error: ErrorFlag) {
        self.error = error;
    }

    /// Put the target in debug mode: with RST held low, pulse DC twice, then release RST.  The
    /// target doesn't acknowledge this, so it always returns 0; a chip that didn't take it only
    /// shows up as garbage in later replies.
    pub fn enter(&mut self) -> u8 {
        if !self.check_active() {
            return 0;
        }
        self.indicator(Line::WriteLed, true);
        self.error = ErrorFlag::None;

        let timing = self.transfer.timing();
        let t = &mut self.transfer;
        t.lines_mut().set_level(Line::Reset, false);
        t.hold(timing.entry_hold_ns);
        t.lines_mut().set_level(Line::Clock, true);
        t.hold(timing.entry_pulse_ns);
        t.lines_mut().set_level(Line::Clock, false);
        t.hold(timing.entry_pulse_ns);
        t.lines_mut().set_level(Line::Clock, true);
        t.hold(timing.entry_pulse_ns);
        t.lines_mut().set_level(Line::Clock, false);
        t.hold(timing.entry_hold_ns);
        t.lines_mut().set_level(Line::Reset, true);
        t.hold(timing.entry_hold_ns);

        debug!("entered debug mode");
        self.in_session = true;

        self.indicator(Line::WriteLed, false);
        0
    }

    /// Resume the CPU and leave the session.  The status byte the target answers with is
    /// dropped; use `exit_with_status` to keep it.
    pub fn exit(&mut self) -> u8 {
        self.exit_with_status();
        0
    }

    /// Like `exit`, but returns the debug status reported by the resume command
    pub fn exit_with_status(&mut self) -> u8 {
        if !self.accept() {
            return 0;
        }
        let status = self.command(self.table.resume, &[]);
        self.in_session = false;
        debug!("left debug mode, status {:02x}", status);
        status
    }

    /// Shift one byte out to the target.
    pub fn write(&mut self, byte: u8) {
        if !self.check_session() {
            return;
        }
        self.put(byte);
    }

    /// Shift one byte in from the target.  Unlike every other operation this only needs the
    /// debugger to be active, not a session: it is also used to poll a target before `enter`.
    pub fn read(&mut self) -> u8 {
        if !self.check_active() {
            return 0;
        }
        self.get()
    }

    /// Release DD and wait until the target signals it has a byte ready.
    pub fn switch_read(&mut self) {
        if !self.check_session() {
            return;
        }
        self.await_ready();
    }

    /// Take DD back after reading
    pub fn switch_write(&mut self) {
        self.transfer.set_direction(Direction::Drive);
    }

    fn put(&mut self, byte: u8) {
        self.indicator(Line::WriteLed, true);
        self.transfer.write_byte(byte);
        self.indicator(Line::WriteLed, false);
    }

    fn get(&mut self) -> u8 {
        self.indicator(Line::ReadLed, true);
        let byte = self.transfer.read_byte();
        self.indicator(Line::ReadLed, false);
        byte
    }

    fn await_ready(&mut self) {
        self.indicator(Line::ReadLed, true);
        self.transfer.await_readable();
        self.indicator(Line::ReadLed, false);
    }

    /// Send `framing` and `operands`, wait for the target and read a single reply byte.  The
    /// caller has already checked the preconditions.
    pub(crate) fn command(&mut self, framing: u8, operands: &[u8]) -> u8 {
        trace!("command {:02x} {:02x?}", framing, operands);
        self.put(framing);
        for b in operands {
            self.put(*b);
        }
        self.await_ready();
        let reply = self.get();
        self.switch_write();
        reply
    }

    /// Like `command`, for the replies that are 16 bits wide (high byte first)
    pub(crate) fn command16(&mut self, framing: u8) -> u16 {
        trace!("command {:02x}", framing);
        self.put(framing);
        self.await_ready();
        let high = self.get();
        let low = self.get();
        self.switch_write();
        u16::from_be_bytes([high, low])
    }
}
