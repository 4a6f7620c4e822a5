use crate::error::Chip8Error;

/// 16 levels; the COSMAC VIP managed 12, later interpreters 16
pub const STACK_DEPTH: usize = 16;

/// Bounded return-address stack. `sp` is the number of live entries, so it
/// can never go negative and never exceeds `STACK_DEPTH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    slots: [u16; STACK_DEPTH],
    sp: usize,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack {
            slots: [0; STACK_DEPTH],
            sp: 0,
        }
    }

    /// push a return address. `pc` only identifies the faulting call site.
    pub fn push(&mut self, addr: u16, pc: u16) -> Result<(), Chip8Error> {
        let slot = self
            .slots
            .get_mut(self.sp)
            .ok_or(Chip8Error::StackOverflow { pc })?;
        *slot = addr;
        self.sp += 1;
        Ok(())
    }

    /// pop the most recent return address
    pub fn pop(&mut self, pc: u16) -> Result<u16, Chip8Error> {
        self.sp = self
            .sp
            .checked_sub(1)
            .ok_or(Chip8Error::StackUnderflow { pc })?;
        Ok(self.slots[self.sp])
    }

    pub fn depth(&self) -> usize {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}
