//! Instruction decoding. The raw fields are extracted once per fetch into an
//! [`Instruction`], which is then classified into an [`Op`]. Any 16-bit word
//! decodes; the ones with no defined meaning become [`Op::Unknown`].
use std::fmt;

/// the standard opcode fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u16,
    /// 12-bit address/constant
    pub nnn: u16,
    /// 8-bit constant
    pub nn: u8,
    /// 4-bit constant
    pub n: u8,
    /// 4-bit register selector
    pub x: usize,
    /// 4-bit register selector
    pub y: usize,
}

impl Instruction {
    pub fn new(opcode: u16) -> Self {
        Instruction {
            opcode,
            nnn: opcode & 0x0fff,
            nn: (opcode & 0x00ff) as u8,
            n: (opcode & 0x000f) as u8,
            x: ((opcode >> 8) & 0x0f) as usize,
            y: ((opcode >> 4) & 0x0f) as usize,
        }
    }

    /// the top nibble, which selects the opcode group
    pub fn group(&self) -> u8 {
        (self.opcode >> 12) as u8
    }

    pub fn decode(&self) -> Op {
        let (x, y, n, nn, nnn) = (self.x, self.y, self.n, self.nn, self.nnn);
        match (self.group(), n) {
            (0x0, _) => match nn {
                0xe0 => Op::Cls,
                0xee => Op::Ret,
                _ => Op::Unknown(self.opcode),
            },
            (0x1, _) => Op::Jump(nnn),
            (0x2, _) => Op::Call(nnn),
            (0x3, _) => Op::SkipEqImm(x, nn),
            (0x4, _) => Op::SkipNeImm(x, nn),
            (0x5, 0x0) => Op::SkipEqReg(x, y),
            (0x6, _) => Op::LoadImm(x, nn),
            (0x7, _) => Op::AddImm(x, nn),
            (0x8, 0x0) => Op::Move(x, y),
            (0x8, 0x1) => Op::Or(x, y),
            (0x8, 0x2) => Op::And(x, y),
            (0x8, 0x3) => Op::Xor(x, y),
            (0x8, 0x4) => Op::AddReg(x, y),
            (0x8, 0x5) => Op::Sub(x, y),
            (0x8, 0x6) => Op::ShiftRight(x, y),
            (0x8, 0x7) => Op::SubReverse(x, y),
            (0x8, 0xe) => Op::ShiftLeft(x, y),
            (0x9, 0x0) => Op::SkipNeReg(x, y),
            (0xa, _) => Op::LoadIndex(nnn),
            (0xb, _) => Op::JumpV0(nnn),
            (0xc, _) => Op::Random(x, nn),
            (0xd, _) => Op::Draw(x, y, n),
            (0xe, _) => match nn {
                0x9e => Op::SkipKeyPressed(x),
                0xa1 => Op::SkipKeyNotPressed(x),
                _ => Op::Unknown(self.opcode),
            },
            (0xf, _) => match nn {
                0x07 => Op::ReadDelay(x),
                0x0a => Op::WaitKey(x),
                0x15 => Op::SetDelay(x),
                0x18 => Op::SetSound(x),
                0x1e => Op::AddIndex(x),
                0x29 => Op::FontGlyph(x),
                0x33 => Op::Bcd(x),
                0x55 => Op::StoreRegs(x),
                0x65 => Op::LoadRegs(x),
                _ => Op::Unknown(self.opcode),
            },
            _ => Op::Unknown(self.opcode),
        }
    }
}

/// One variant per semantic opcode. Register operands are indices 0..=15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SkipEqImm(usize, u8),
    /// 4XNN
    SkipNeImm(usize, u8),
    /// 5XY0
    SkipEqReg(usize, usize),
    /// 6XNN
    LoadImm(usize, u8),
    /// 7XNN
    AddImm(usize, u8),
    /// 8XY0
    Move(usize, usize),
    /// 8XY1
    Or(usize, usize),
    /// 8XY2
    And(usize, usize),
    /// 8XY3
    Xor(usize, usize),
    /// 8XY4
    AddReg(usize, usize),
    /// 8XY5
    Sub(usize, usize),
    /// 8XY6
    ShiftRight(usize, usize),
    /// 8XY7
    SubReverse(usize, usize),
    /// 8XYE
    ShiftLeft(usize, usize),
    /// 9XY0
    SkipNeReg(usize, usize),
    /// ANNN
    LoadIndex(u16),
    /// BNNN
    JumpV0(u16),
    /// CXNN
    Random(usize, u8),
    /// DXYN
    Draw(usize, usize, u8),
    /// EX9E
    SkipKeyPressed(usize),
    /// EXA1
    SkipKeyNotPressed(usize),
    /// FX07
    ReadDelay(usize),
    /// FX0A
    WaitKey(usize),
    /// FX15
    SetDelay(usize),
    /// FX18
    SetSound(usize),
    /// FX1E
    AddIndex(usize),
    /// FX29
    FontGlyph(usize),
    /// FX33
    Bcd(usize),
    /// FX55
    StoreRegs(usize),
    /// FX65
    LoadRegs(usize),
    /// anything else, including 0NNN machine code calls
    Unknown(u16),
}

// used by the instruction trace
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Op::Cls => write!(f, "clear screen"),
            Op::Ret => write!(f, "return from subroutine"),
            Op::Jump(a) => write!(f, "jump to {:#05x}", a),
            Op::Call(a) => write!(f, "call subroutine at {:#05x}", a),
            Op::SkipEqImm(x, nn) => write!(f, "skip if V{:X} == {:#04x}", x, nn),
            Op::SkipNeImm(x, nn) => write!(f, "skip if V{:X} != {:#04x}", x, nn),
            Op::SkipEqReg(x, y) => write!(f, "skip if V{:X} == V{:X}", x, y),
            Op::LoadImm(x, nn) => write!(f, "V{:X} = {:#04x}", x, nn),
            Op::AddImm(x, nn) => write!(f, "V{:X} += {:#04x}", x, nn),
            Op::Move(x, y) => write!(f, "V{:X} = V{:X}", x, y),
            Op::Or(x, y) => write!(f, "V{:X} |= V{:X}", x, y),
            Op::And(x, y) => write!(f, "V{:X} &= V{:X}", x, y),
            Op::Xor(x, y) => write!(f, "V{:X} ^= V{:X}", x, y),
            Op::AddReg(x, y) => write!(f, "V{:X} += V{:X}, VF = carry", x, y),
            Op::Sub(x, y) => write!(f, "V{:X} -= V{:X}, VF = !borrow", x, y),
            Op::ShiftRight(x, y) => write!(f, "V{:X} = shr(V{:X}|V{:X}), VF = lsb", x, x, y),
            Op::SubReverse(x, y) => write!(f, "V{:X} = V{:X} - V{:X}, VF = !borrow", x, y, x),
            Op::ShiftLeft(x, y) => write!(f, "V{:X} = shl(V{:X}|V{:X}), VF = msb", x, x, y),
            Op::SkipNeReg(x, y) => write!(f, "skip if V{:X} != V{:X}", x, y),
            Op::LoadIndex(a) => write!(f, "I = {:#05x}", a),
            Op::JumpV0(a) => write!(f, "jump to V0 + {:#05x}", a),
            Op::Random(x, nn) => write!(f, "V{:X} = rand() & {:#04x}", x, nn),
            Op::Draw(x, y, n) => write!(f, "draw {} row sprite at (V{:X}, V{:X})", n, x, y),
            Op::SkipKeyPressed(x) => write!(f, "skip if key V{:X} down", x),
            Op::SkipKeyNotPressed(x) => write!(f, "skip if key V{:X} up", x),
            Op::ReadDelay(x) => write!(f, "V{:X} = delay timer", x),
            Op::WaitKey(x) => write!(f, "wait for key into V{:X}", x),
            Op::SetDelay(x) => write!(f, "delay timer = V{:X}", x),
            Op::SetSound(x) => write!(f, "sound timer = V{:X}", x),
            Op::AddIndex(x) => write!(f, "I += V{:X}", x),
            Op::FontGlyph(x) => write!(f, "I = glyph for V{:X}", x),
            Op::Bcd(x) => write!(f, "store BCD of V{:X} at I", x),
            Op::StoreRegs(x) => write!(f, "store V0..=V{:X} at I", x),
            Op::LoadRegs(x) => write!(f, "load V0..=V{:X} from I", x),
            Op::Unknown(op) => write!(f, "unimplemented opcode {:04x}", op),
        }
    }
}
