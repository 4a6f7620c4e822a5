use crate::memory::CHIP8_PROGRAM_ADDR;

/// VF doubles as the carry/borrow/collision flag
pub const VF: usize = 0xF;

/// the chip-8 visible register file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    /// V0-VF
    pub v: [u8; 16],
    /// index register
    pub i: u16,
    /// program counter
    pub pc: u16,
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            v: [0; 16],
            i: 0,
            pc: CHIP8_PROGRAM_ADDR,
        }
    }

    pub fn set_flag(&mut self, set: bool) {
        self.v[VF] = set as u8;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
