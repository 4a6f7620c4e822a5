use crate::error::Chip8Error;
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// largest program that fits between the program address and the top of RAM
pub const CHIP8_MAX_PROGRAM_BYTES: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR as usize;

/// where the hex digit glyphs live; FX29 relies on them starting at zero
pub const CHIP8_FONT_ADDR: u16 = 0x000;

/// bytes per font glyph
pub const CHIP8_FONT_GLYPH_BYTES: u16 = 5;

const ADDR_MASK: u16 = (CHIP8_RAM_SIZE_BYTES - 1) as u16;

/// Represents the address space seen by a chip-8 program. Every access wraps
/// at the top of RAM, so a runaway I register never faults.
pub trait MemoryMap {
    /// read one byte
    fn read(&self, addr: u16) -> u8;

    /// write one byte
    fn write(&mut self, addr: u16, value: u8);

    /// get a big-endian two-byte word (instruction fetch)
    fn get_word(&self, addr: u16) -> u16 {
        ((self.read(addr) as u16) << 8) | (self.read(addr.wrapping_add(1)) as u16)
    }

    /// write a run of bytes starting at addr
    fn write_slice(&mut self, addr: u16, data: &[u8]) {
        for (offset, byte) in data.iter().enumerate() {
            self.write(addr.wrapping_add(offset as u16), *byte);
        }
    }

    /// copy len bytes starting at addr into a new buffer
    fn read_slice(&self, addr: u16, len: usize) -> Vec<u8> {
        (0..len)
            .map(|offset| self.read(addr.wrapping_add(offset as u16)))
            .collect()
    }
}

/// Defines the CHIP-8 memory map:
///   0x0000-0x004f  font glyphs (0-F, five bytes each)
///   0x0050-0x01ff  reserved for the interpreter
///   0x0200-0x0fff  program
#[derive(Clone)]
pub struct Chip8Memory {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8Memory {
    fn read(&self, addr: u16) -> u8 {
        self.bytes[(addr & ADDR_MASK) as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.bytes[(addr & ADDR_MASK) as usize] = value;
    }
}

impl Chip8Memory {
    /// zeroed RAM with the font baked in
    pub fn new() -> Self {
        let mut mm = Chip8Memory {
            bytes: vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice(),
        };
        mm.write_slice(CHIP8_FONT_ADDR, &CHIP8_FONT);
        mm
    }

    /// load a CHIP-8 program at 0x200, refusing anything that would run off
    /// the top of RAM. nothing is written unless the whole program fits.
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        if len > CHIP8_MAX_PROGRAM_BYTES {
            return Err(Chip8Error::RomTooLarge {
                size: len,
                max_size: CHIP8_MAX_PROGRAM_BYTES,
            });
        }
        self.write_slice(CHIP8_PROGRAM_ADDR, &buf);
        Ok(len)
    }

    /// address of the glyph for a hex digit
    pub fn font_addr(digit: u8) -> u16 {
        CHIP8_FONT_ADDR + digit as u16 * CHIP8_FONT_GLYPH_BYTES
    }
}

impl Default for Chip8Memory {
    fn default() -> Self {
        Self::new()
    }
}

pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
