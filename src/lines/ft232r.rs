//! Implement the `Lines` trait for FTDI FT232R adapters in synchronous bit-bang mode, so a PC
//! can act as the debugger.  Every line is one bit of the FT232R's data port.  Each level change
//! is a USB round trip, which is slow but well above every protocol minimum.
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use libftd2xx::{BitMode, Ftdi, FtdiCommon, FtStatus};
use log::error;

use crate::lines::{Line, Lines, Mode};

pub struct Ft232r {
    ft: Ftdi,
    // Port bit of each `Line`, `None` for LEDs that aren't wired
    bits: [Option<u8>; 6],
    // Output enable mask and output levels, as last sent
    mask: u8,
    state: u8,
}

impl Ft232r {
    /// Open the adapter whose description is `description`.  `reset`, `clock`, `dd_in` and
    /// `dd_out` are bit numbers (0-7) on the data port.  All lines start as inputs.
    pub fn new(description: &str, baud: u32, reset: u8, clock: u8, dd_in: u8, dd_out: u8)
        -> Result<Self, FtStatus>
    {
        let mut ft = Ftdi::with_description(description)?;
        ft.set_baud_rate(baud)?;
        ft.set_bit_mode(0, BitMode::SyncBitbang)?;
        ft.purge_all()?;

        Ok(Self {
            ft,
            bits: [Some(reset), Some(clock), Some(dd_in), Some(dd_out), None, None],
            mask: 0,
            state: 0,
        })
    }

    /// Use two more port bits as read and write indicators
    pub fn with_leds(mut self, read_led: u8, write_led: u8) -> Self {
        self.bits[Line::ReadLed as usize] = Some(read_led);
        self.bits[Line::WriteLed as usize] = Some(write_led);
        self
    }

    // Push `state` to the port and return the pins as sampled in the same cycle
    fn cycle(&mut self) -> u8 {
        let mut recv = [0];
        if let Err(e) = self.ft.write(&[self.state]) {
            error!("ft232r write failed: {:?}", e);
            return 0;
        }
        if let Err(e) = self.ft.read(&mut recv) {
            error!("ft232r read failed: {:?}", e);
            return 0;
        }
        recv[0]
    }
}

impl Lines for Ft232r {
    fn set_mode(&mut self, line: Line, mode: Mode) {
        let Some(bit) = self.bits[line as usize] else {
            return;
        };
        match mode {
            Mode::Output => self.mask |= 1 << bit,
            Mode::Input => self.mask &= !(1 << bit),
        }
        if let Err(e) = self.ft.set_bit_mode(self.mask, BitMode::SyncBitbang) {
            error!("ft232r set bit mode failed: {:?}", e);
        }
    }

    fn set_level(&mut self, line: Line, high: bool) {
        let Some(bit) = self.bits[line as usize] else {
            return;
        };
        if high {
            self.state |= 1 << bit;
        } else {
            self.state &= !(1 << bit);
        }
        self.cycle();
    }

    fn is_high(&mut self, line: Line) -> bool {
        let Some(bit) = self.bits[line as usize] else {
            return false;
        };
        self.cycle() & (1 << bit) != 0
    }

    fn has_indicators(&self) -> bool {
        self.bits[Line::ReadLed as usize].is_some()
    }
}

/// A `DelayNs` that spins on the system clock, for use with `Ft232r`
#[derive(Default)]
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let start = Instant::now();
        let wait = Duration::from_nanos(u64::from(ns));
        while start.elapsed() < wait {
            core::hint::spin_loop();
        }
    }
}
