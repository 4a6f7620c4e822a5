use std::io;
use thiserror::Error;

/// Everything that can go wrong inside the interpreter. Undefined opcodes are
/// deliberately absent: they are logged and skipped, never fatal.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("stack overflow: call at {pc:#05x} exceeds the call stack depth")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: return at {pc:#05x} with an empty call stack")]
    StackUnderflow { pc: u16 },
}

impl Chip8Error {
    /// faults raised by the running program, as opposed to load or host errors
    pub fn is_machine_fault(&self) -> bool {
        matches!(
            self,
            Chip8Error::StackOverflow { .. } | Chip8Error::StackUnderflow { .. }
        )
    }
}
