//! This crate implements the two-wire debug interface of the TI CC253x/CC254x/CC251x family of
//! 8051-based wireless microcontrollers, bit-banged over four GPIO lines: RST, the DC clock, and
//! the bidirectional DD data line split into DD_I and DD_O on the debugger side.
//!
//! At the lowest level, the `Lines` trait is all the crate needs from the hardware: set a line's
//! mode, set its level, sample it.  It is implemented for embedded-hal pins (`lines::gpio`), so
//! a microcontroller can be the debugger, and for FT232R adapters in bit-bang mode
//! (`lines::ft232r`, with the `std` feature).  `sim::Wire` implements it in memory.
//!
//! On top of that, `Transfer` shifts single bytes in and out and switches the direction of DD,
//! including the handshake where the target holds DD high until it has a reply ready.
//!
//! `Debugger` is the object you use.  It tracks whether it may drive the lines at all
//! (`activate`) and whether the target is in debug mode (`enter`/`exit`), and provides the debug
//! commands: reading and writing the debug configuration, executing instructions on the halted
//! CPU, stepping, reading the chip ID, PC and status, burst writes and erasing the chip.
//! Commands that are not allowed in the current state don't touch the lines; they set the error
//! flag returned by `error()` and return 0.
//!
//! # Example
//! ```
//! use cc_debugger::chip::ChipId;
//! use cc_debugger::error::ErrorFlag;
//! use cc_debugger::session::{Config, Debugger};
//! use cc_debugger::sim::{Emulator, NoDelay, Wire};
//!
//! let wire = Wire::new(Emulator::default());
//! let mut dbg = Debugger::new(wire, NoDelay::default(), Config::default());
//!
//! // Nothing is allowed before entering debug mode
//! assert_eq!(dbg.get_status(), 0);
//! assert_eq!(dbg.error(), ErrorFlag::NotInSession);
//!
//! dbg.enter();
//! let id = ChipId(dbg.get_chip_id()).check().expect("wiring");
//! assert_eq!(id.name(), Some("CC2530"));
//!
//! dbg.set_config(0x22);
//! assert_eq!(dbg.get_config(), 0x22);
//! // MOV A,#0x42
//! assert_eq!(dbg.exec(&[0x74, 0x42]), 0x42);
//! dbg.exit();
//! ```

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod chip;
pub mod error;
pub mod instr;
pub mod lines;
pub mod session;
pub mod sim;
pub mod transfer;
