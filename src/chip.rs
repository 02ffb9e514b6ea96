//! Making sense of what the debug commands return.  The engine itself passes these values through
//! untouched; a target that isn't there or is miswired just produces all-zero or all-one bytes,
//! and `ChipId::check` is the place to catch that.
use core::fmt;

use bitflags::bitflags;

use crate::instr::InstructionTable;

bitflags! {
    /// Returned by `get_status`, `halt`, `resume`, `chip_erase` and `burst_write`
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DebugStatus: u8 {
        const CHIP_ERASE_BUSY = 0x80;
        const PCON_IDLE = 0x40;
        const CPU_HALTED = 0x20;
        const PM_ACTIVE = 0x10;
        const HALT_STATUS = 0x08;
        const DEBUG_LOCKED = 0x04;
        const OSCILLATOR_STABLE = 0x02;
        const STACK_OVERFLOW = 0x01;
    }
}

bitflags! {
    /// Read with `get_config`, written with `set_config`
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct DebugConfig: u8 {
        const SOFT_POWER_MODE = 0x10;
        const TIMERS_OFF = 0x08;
        const DMA_PAUSE = 0x04;
        const TIMER_SUSPEND = 0x02;
    }
}

/// The 16-bit value returned by `get_chip_id`: chip family in the high byte, revision in the low
/// byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChipId(pub u16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WiringFault {
    /// Read 0x0000: nothing answers on DD
    NoChip,
    /// Read 0xffff: DD stuck high, usually a short or swapped lines
    ShortCircuit,
}

impl fmt::Display for WiringFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WiringFault::NoChip => f.write_str("no chip found, check the wiring"),
            WiringFault::ShortCircuit => f.write_str("short-circuit or wrong wiring detected"),
        }
    }
}

impl core::error::Error for WiringFault {}

impl ChipId {
    pub fn family(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn revision(self) -> u8 {
        self.0 as u8
    }

    /// Reject the two values a missing or miswired target reads as
    pub fn check(self) -> Result<ChipId, WiringFault> {
        match self.0 {
            0x0000 => Err(WiringFault::NoChip),
            0xffff => Err(WiringFault::ShortCircuit),
            _ => Ok(self),
        }
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self.family() {
            0xa5 => "CC2530",
            0xb5 => "CC2531",
            0x95 => "CC2533",
            0x8d => "CC2540",
            0x41 => "CC2541",
            0x81 => "CC251x",
            _ => return None,
        };
        Some(name)
    }

    /// The framing bytes this chip family understands
    pub fn instruction_table(self) -> InstructionTable {
        match self.family() {
            0x81 => InstructionTable::CC251X,
            _ => InstructionTable::CC254X,
        }
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:04x})", name, self.0),
            None => write!(f, "unknown chip 0x{:04x}", self.0),
        }
    }
}
