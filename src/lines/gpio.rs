//! Implement the `Lines` trait on top of embedded-hal pins, for a microcontroller acting as the
//! debugger.
//!
//! embedded-hal has no trait for switching a pin between input and output, so the lines that
//! have to float when the debugger is idle (RST, DC and DD_O) use the `Tristate` trait below.
//! Most HALs have a "flex" or "dynamic" pin type that can implement it in a few lines.
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

use crate::lines::{Line, Lines, Mode};

/// An output pin that can also be released to high impedance (input, no pull-up).
pub trait Tristate: OutputPin<Error = Infallible> {
    /// Stop driving the pin
    fn release(&mut self);
    /// Drive the pin again, at whatever level was last set
    fn drive(&mut self);
}

/// Placeholder for an indicator LED that isn't connected
pub struct NoLed;

impl ErrorType for NoLed {
    type Error = Infallible;
}

impl OutputPin for NoLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

fn ok<T>(r: Result<T, Infallible>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => match e {},
    }
}

pub struct Gpio<Rst, Dc, DdIn, DdOut, ReadLed = NoLed, WriteLed = NoLed>
    where Rst: Tristate, Dc: Tristate, DdIn: InputPin<Error = Infallible>, DdOut: Tristate,
          ReadLed: OutputPin<Error = Infallible>, WriteLed: OutputPin<Error = Infallible>
{
    reset: Rst,
    clock: Dc,
    dd_in: DdIn,
    dd_out: DdOut,
    read_led: ReadLed,
    write_led: WriteLed,
    leds: bool,
}

impl<Rst, Dc, DdIn, DdOut> Gpio<Rst, Dc, DdIn, DdOut>
    where Rst: Tristate, Dc: Tristate, DdIn: InputPin<Error = Infallible>, DdOut: Tristate
{
    /// `dd_in` should be configured without a pull-up; the target's DD pin and the series
    /// resistor on `dd_out` define its level.
    pub fn new(reset: Rst, clock: Dc, dd_in: DdIn, dd_out: DdOut) -> Self {
        Gpio { reset, clock, dd_in, dd_out, read_led: NoLed, write_led: NoLed, leds: false }
    }

    /// Attach indicator LEDs that light up while bytes are read from or written to the target.
    pub fn with_leds<R, W>(self, read_led: R, write_led: W) -> Gpio<Rst, Dc, DdIn, DdOut, R, W>
        where R: OutputPin<Error = Infallible>, W: OutputPin<Error = Infallible>
    {
        Gpio {
            reset: self.reset,
            clock: self.clock,
            dd_in: self.dd_in,
            dd_out: self.dd_out,
            read_led,
            write_led,
            leds: true,
        }
    }
}

impl<Rst, Dc, DdIn, DdOut, ReadLed, WriteLed> Gpio<Rst, Dc, DdIn, DdOut, ReadLed, WriteLed>
    where Rst: Tristate, Dc: Tristate, DdIn: InputPin<Error = Infallible>, DdOut: Tristate,
          ReadLed: OutputPin<Error = Infallible>, WriteLed: OutputPin<Error = Infallible>
{
    /// Give the pins back
    pub fn free(self) -> (Rst, Dc, DdIn, DdOut, ReadLed, WriteLed) {
        (self.reset, self.clock, self.dd_in, self.dd_out, self.read_led, self.write_led)
    }
}

impl<Rst, Dc, DdIn, DdOut, ReadLed, WriteLed> Lines for Gpio<Rst, Dc, DdIn, DdOut, ReadLed, WriteLed>
    where Rst: Tristate, Dc: Tristate, DdIn: InputPin<Error = Infallible>, DdOut: Tristate,
          ReadLed: OutputPin<Error = Infallible>, WriteLed: OutputPin<Error = Infallible>
{
    fn set_mode(&mut self, line: Line, mode: Mode) {
        let output = mode == Mode::Output;
        match line {
            Line::Reset if output => self.reset.drive(),
            Line::Reset => self.reset.release(),
            Line::Clock if output => self.clock.drive(),
            Line::Clock => self.clock.release(),
            Line::DataOut if output => self.dd_out.drive(),
            Line::DataOut => self.dd_out.release(),
            Line::DataIn => (),
            // LEDs can't float, so an LED in input mode is simply off
            Line::ReadLed | Line::WriteLed if !output => self.set_level(line, false),
            Line::ReadLed | Line::WriteLed => (),
        }
    }

    fn set_level(&mut self, line: Line, high: bool) {
        let state = PinState::from(high);
        match line {
            Line::Reset => ok(self.reset.set_state(state)),
            Line::Clock => ok(self.clock.set_state(state)),
            Line::DataOut => ok(self.dd_out.set_state(state)),
            // Pull-up configuration is left to the HAL
            Line::DataIn => (),
            Line::ReadLed => ok(self.read_led.set_state(state)),
            Line::WriteLed => ok(self.write_led.set_state(state)),
        }
    }

    fn is_high(&mut self, line: Line) -> bool {
        match line {
            Line::DataIn => ok(self.dd_in.is_high()),
            _ => false,
        }
    }

    fn has_indicators(&self) -> bool {
        self.leds
    }
}
