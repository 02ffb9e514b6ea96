//! The debug commands.  Each one writes a framing byte and its operands, waits for the target,
//! and reads the reply.  The framing bytes differ between chip families, so they come from an
//! `InstructionTable`; the CC253x/CC254x one is the default.
use embedded_hal::delay::DelayNs;
use log::debug;

use crate::chip::DebugStatus;
use crate::error::ErrorFlag;
use crate::lines::Lines;
use crate::session::Debugger;

/// Largest payload `burst_write` accepts.
///
/// The count is an 11-bit field: the low three bits of the framing byte, then the next byte.
/// 2048 doesn't fit, so it goes out as a count of 0, which the target reads as 2048.
pub const MAX_BURST: usize = 2048;

const BURST_WRITE: u8 = 0x80;
const BURST_COUNT_HIGH: u8 = 0x07;

/// The two bytes that open a burst write of `len` bytes, `len` in 1..=`MAX_BURST`
pub fn burst_header(len: usize) -> [u8; 2] {
    let [high, low] = ((len % MAX_BURST) as u16).to_be_bytes();
    [BURST_WRITE | (high & BURST_COUNT_HIGH), low]
}

/// Payload length announced by a burst header, the inverse of `burst_header`
pub fn burst_len(header: [u8; 2]) -> usize {
    match (((header[0] & BURST_COUNT_HIGH) as usize) << 8) | header[1] as usize {
        0 => MAX_BURST,
        n => n,
    }
}

/// Framing bytes of the debug commands, per chip family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstructionTable {
    pub version: u8,
    pub halt: u8,
    pub resume: u8,
    pub rd_config: u8,
    pub wr_config: u8,
    /// `DEBUG_INSTR` with 1, 2 and 3 opcode bytes
    pub debug_instr: [u8; 3],
    pub get_chip_id: u8,
    pub get_pc: u8,
    pub read_status: u8,
    pub step: u8,
    pub chip_erase: u8,
}

impl InstructionTable {
    /// CC2530/1/3 and CC2540/1
    pub const CC254X: InstructionTable = InstructionTable::from_bytes(1, [
        0x40, 0x48, 0x20, 0x18, 0x51, 0x52, 0x53, 0x68, 0x28, 0x30, 0x58, 0x10,
    ]);

    /// CC2510/1
    pub const CC251X: InstructionTable = InstructionTable::from_bytes(2, [
        0x44, 0x4c, 0x24, 0x1d, 0x55, 0x56, 0x57, 0x68, 0x28, 0x34, 0x5c, 0x14,
    ]);

    /// Build a table from its wire layout: halt, resume, rd_config, wr_config, debug_instr 1-3,
    /// get_chip_id, get_pc, read_status, step, chip_erase.
    pub const fn from_bytes(version: u8, b: [u8; 12]) -> Self {
        InstructionTable {
            version,
            halt: b[0],
            resume: b[1],
            rd_config: b[2],
            wr_config: b[3],
            debug_instr: [b[4], b[5], b[6]],
            get_chip_id: b[7],
            get_pc: b[8],
            read_status: b[9],
            step: b[10],
            chip_erase: b[11],
        }
    }

    pub fn to_bytes(&self) -> [u8; 12] {
        [
            self.halt, self.resume, self.rd_config, self.wr_config,
            self.debug_instr[0], self.debug_instr[1], self.debug_instr[2],
            self.get_chip_id, self.get_pc, self.read_status, self.step, self.chip_erase,
        ]
    }
}

impl Default for InstructionTable {
    fn default() -> Self {
        InstructionTable::CC254X
    }
}

impl<L, D> Debugger<L, D> where L: Lines, D: DelayNs {
    pub fn instruction_table(&self) -> InstructionTable {
        self.table
    }

    /// Switch to another chip family's framing bytes
    pub fn set_instruction_table(&mut self, table: InstructionTable) {
        debug!("instruction table version {} -> {}", self.table.version, table.version);
        self.table = table;
    }

    /// Read the debug configuration byte (see `DebugConfig`)
    pub fn get_config(&mut self) -> u8 {
        if !self.accept() {
            return 0;
        }
        self.command(self.table.rd_config, &[])
    }

    /// Write the debug configuration byte.  Returns the value the target echoes back.
    pub fn set_config(&mut self, config: u8) -> u8 {
        if !self.accept() {
            return 0;
        }
        self.command(self.table.wr_config, &[config])
    }

    /// Execute one CPU instruction of 1 to 3 bytes on the halted target and return the
    /// accumulator.
    ///
    /// Any other length sets `ErrorFlag::BadInstruction` and nothing is sent.
    pub fn exec(&mut self, opcodes: &[u8]) -> u8 {
        if !self.accept() {
            return 0;
        }
        let framing = match opcodes.len() {
            n @ 1..=3 => self.table.debug_instr[n - 1],
            _ => {
                self.set_error(ErrorFlag::BadInstruction);
                return 0;
            }
        };
        self.command(framing, opcodes)
    }

    /// Execute a 3-byte instruction made of `opcode` and a 16-bit immediate, like `MOV DPTR,#data16`
    pub fn exec_imm(&mut self, opcode: u8, imm: u16) -> u8 {
        let [high, low] = imm.to_be_bytes();
        self.exec(&[opcode, high, low])
    }

    pub fn get_chip_id(&mut self) -> u16 {
        if !self.accept() {
            return 0;
        }
        self.command16(self.table.get_chip_id)
    }

    /// Program counter of the halted CPU
    pub fn get_pc(&mut self) -> u16 {
        if !self.accept() {
            return 0;
        }
        self.command16(self.table.get_pc)
    }

    /// Read the debug status byte (see `DebugStatus`)
    pub fn get_status(&mut self) -> u8 {
        if !self.accept() {
            return 0;
        }
        self.command(self.table.read_status, &[])
    }

    /// Execute the next instruction of the program and return the accumulator
    pub fn step(&mut self) -> u8 {
        if !self.accept() {
            return 0;
        }
        self.command(self.table.step, &[])
    }

    /// Halt the CPU and return the debug status
    pub fn halt(&mut self) -> u8 {
        if !self.accept() {
            return 0;
        }
        self.command(self.table.halt, &[])
    }

    /// Let the CPU run again without leaving debug mode.  Returns the debug status.
    pub fn resume(&mut self) -> u8 {
        if !self.accept() {
            return 0;
        }
        self.command(self.table.resume, &[])
    }

    /// Start erasing the whole flash and return the debug status right away.  The erase is done
    /// once `CHIP_ERASE_BUSY` clears; `mass_erase` waits for that.
    pub fn chip_erase(&mut self) -> u8 {
        if !self.accept() {
            return 0;
        }
        self.command(self.table.chip_erase, &[])
    }

    /// Erase the whole flash and poll the status until the erase is done.  Returns the final
    /// debug status.  Like the readiness handshake this has no timeout.
    pub fn mass_erase(&mut self) -> u8 {
        if !self.accept() {
            return 0;
        }
        self.command(self.table.chip_erase, &[]);

        let mut polls = 0;
        let status = loop {
            let status = self.command(self.table.read_status, &[]);
            polls += 1;
            if !DebugStatus::from_bits_retain(status).contains(DebugStatus::CHIP_ERASE_BUSY) {
                break status;
            }
        };
        debug!("chip erase done after {} status polls, status {:02x}", polls, status);
        status
    }

    /// Stream up to `MAX_BURST` bytes into the target's debug data register, where a DMA channel
    /// can pick them up.  Returns the debug status.  Longer input sets
    /// `ErrorFlag::BurstTooLong` and nothing is sent.  Empty input has no encoding; nothing is
    /// sent and 0 comes back.
    pub fn burst_write(&mut self, data: &[u8]) -> u8 {
        if !self.accept() {
            return 0;
        }
        if data.len() > MAX_BURST {
            self.set_error(ErrorFlag::BurstTooLong);
            return 0;
        }
        if data.is_empty() {
            return 0;
        }

        let [first, second] = burst_header(data.len());
        self.write(first);
        self.write(second);
        for b in data {
            self.write(*b);
        }
        self.switch_read();
        let status = self.read();
        self.switch_write();
        status
    }
}
