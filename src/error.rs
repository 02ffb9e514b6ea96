//! The error flag.  Operations that are refused don't return an error value; they set the flag
//! and hand back a zero result.  Read it with `Debugger::error` after any call whose result you
//! need to trust.
use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ErrorFlag {
    /// The last accepted call completed
    #[default]
    None = 0,
    /// The engine was deactivated with `activate(false)`
    Inactive = 1,
    /// No debug session: `enter` hasn't been called, or `exit` already was
    NotInSession = 2,
    /// `burst_write` was handed more than `MAX_BURST` bytes
    BurstTooLong = 3,
    /// `exec` was handed an empty instruction, or one longer than 3 bytes
    BadInstruction = 4,
}

impl ErrorFlag {
    /// The numeric code reported to the host (0 means no error)
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ErrorFlag::None),
            1 => Some(ErrorFlag::Inactive),
            2 => Some(ErrorFlag::NotInSession),
            3 => Some(ErrorFlag::BurstTooLong),
            4 => Some(ErrorFlag::BadInstruction),
            _ => None,
        }
    }

    pub fn is_err(self) -> bool {
        self != ErrorFlag::None
    }
}

impl fmt::Display for ErrorFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ErrorFlag::None => "no error",
            ErrorFlag::Inactive => "debugger is not active",
            ErrorFlag::NotInSession => "target is not in debug mode",
            ErrorFlag::BurstTooLong => "burst write exceeds 2048 bytes",
            ErrorFlag::BadInstruction => "instructions are 1 to 3 bytes long",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for ErrorFlag {}
