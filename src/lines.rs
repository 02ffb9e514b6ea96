//! The hardware boundary.  Anything that can drive the debug lines implements the `Lines` trait:
//! configure a line as an input or an output, set an output level, and sample an input level.
//! The protocol engine never needs more than that.
pub mod gpio;
#[cfg(feature = "std")]
pub mod ft232r;

/// The lines of the debug connector.  `DataIn` and `DataOut` are the two host pins wired to the
/// target's single bidirectional DD pin (usually `DataOut` through a series resistor).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    Reset,
    Clock,
    DataIn,
    DataOut,
    ReadLed,
    WriteLed,
}

impl Line {
    /// The four lines every debugger has, in the order they are configured
    pub const DEBUG: [Line; 4] = [Line::Clock, Line::DataIn, Line::DataOut, Line::Reset];
    pub const INDICATORS: [Line; 2] = [Line::ReadLed, Line::WriteLed];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Output,
    /// High impedance.  Whether a pull-up is enabled is controlled with `set_level`.
    Input,
}

pub trait Lines {
    /// Configure the direction of `line`.
    fn set_mode(&mut self, line: Line, mode: Mode);
    /// Drive `line` high or low.  On a line in `Mode::Input` this enables or disables the
    /// pull-up instead; the debugger only ever disables it.
    fn set_level(&mut self, line: Line, high: bool);
    /// Sample the level of `line`.
    fn is_high(&mut self, line: Line) -> bool;
    /// Whether `Line::ReadLed` and `Line::WriteLed` are wired up.  Implementations without
    /// indicators ignore calls for those lines.
    fn has_indicators(&self) -> bool {
        false
    }
}

impl<T: Lines + ?Sized> Lines for &mut T {
    fn set_mode(&mut self, line: Line, mode: Mode) {
        (**self).set_mode(line, mode)
    }

    fn set_level(&mut self, line: Line, high: bool) {
        (**self).set_level(line, high)
    }

    fn is_high(&mut self, line: Line) -> bool {
        (**self).is_high(line)
    }

    fn has_indicators(&self) -> bool {
        (**self).has_indicators()
    }
}
