use std::fmt;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// sprites are always one byte wide
const SPRITE_WIDTH: usize = 8;

/// Monochrome pixel grid. Only the clear and draw opcodes mutate it; the
/// renderer reads it once per frame.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [[bool; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
    changed: bool,
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            changed: true,
        }
    }

    pub fn clear(&mut self) {
        self.pixels = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        self.changed = true;
    }

    /// XOR a sprite onto the screen and report whether any lit pixel was
    /// switched off.
    ///
    /// The starting position wraps around the screen, but the sprite itself
    /// is clipped: rows and columns that fall past the right or bottom edge
    /// are dropped, never wrapped to the opposite side.
    pub fn draw_sprite(&mut self, x: u8, y: u8, rows: &[u8]) -> bool {
        let x0 = x as usize % DISPLAY_WIDTH;
        let y0 = y as usize % DISPLAY_HEIGHT;
        let mut collision = false;

        for (dy, row) in rows.iter().enumerate() {
            let py = y0 + dy;
            if py >= DISPLAY_HEIGHT {
                break;
            }
            for dx in 0..SPRITE_WIDTH {
                let px = x0 + dx;
                if px >= DISPLAY_WIDTH {
                    break;
                }
                let bit = row & (0x80 >> dx) != 0;
                let pixel = &mut self.pixels[py][px];
                if bit && *pixel {
                    collision = true;
                }
                *pixel ^= bit;
            }
        }
        self.changed = true;
        collision
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[y][x]
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().flatten().filter(|p| **p).count()
    }

    /// has anything been drawn since the last `take_changed`?
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// read and reset the changed flag; the renderer calls this once per frame
    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }

    /// one bit per pixel, row-major, most significant bit leftmost; this is
    /// the layout the display back-ends consume
    pub fn to_packed(&self) -> Vec<u8> {
        let mut packed = vec![0u8; DISPLAY_WIDTH * DISPLAY_HEIGHT / 8];
        for (n, _) in self
            .pixels
            .iter()
            .flatten()
            .enumerate()
            .filter(|(_, lit)| **lit)
        {
            packed[n / 8] |= 0x80 >> (n % 8);
        }
        packed
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.pixels.iter() {
            let line: String = row.iter().map(|p| if *p { '█' } else { ' ' }).collect();
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("lit", &self.lit_count())
            .field("changed", &self.changed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_blank_and_changed() {
        let fb = Framebuffer::new();
        assert_eq!(fb.lit_count(), 0);
        assert!(fb.is_changed());
    }

    #[test]
    fn test_draw_msb_leftmost() {
        let mut fb = Framebuffer::new();
        let hit = fb.draw_sprite(0, 0, &[0b1000_0001]);
        assert!(!hit);
        assert!(fb.pixel(0, 0));
        assert!(!fb.pixel(1, 0));
        assert!(fb.pixel(7, 0));
        assert_eq!(fb.lit_count(), 2);
    }

    #[test]
    fn test_redraw_erases_with_collision() {
        let mut fb = Framebuffer::new();
        let glyph = [0xF0, 0x90, 0x90, 0x90, 0xF0];
        assert!(!fb.draw_sprite(10, 5, &glyph));
        assert_eq!(fb.lit_count(), 14);
        assert!(fb.draw_sprite(10, 5, &glyph));
        assert_eq!(fb.lit_count(), 0);
    }

    #[test]
    fn test_no_collision_when_lighting_dark_pixels() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 0, &[0xF0]);
        // overlapping only where the sprite bits are zero
        assert!(!fb.draw_sprite(0, 0, &[0x0F]));
        assert_eq!(fb.lit_count(), 8);
    }

    #[test]
    fn test_clips_right_edge() {
        let mut fb = Framebuffer::new();
        let hit = fb.draw_sprite(60, 0, &[0xFF]);
        assert!(!hit);
        for x in 60..64 {
            assert!(fb.pixel(x, 0));
        }
        for x in 0..4 {
            assert!(!fb.pixel(x, 0), "pixel {} wrapped", x);
        }
        assert_eq!(fb.lit_count(), 4);
    }

    #[test]
    fn test_clips_bottom_edge() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 30, &[0x80, 0x80, 0x80, 0x80]);
        assert!(fb.pixel(0, 30));
        assert!(fb.pixel(0, 31));
        assert!(!fb.pixel(0, 0));
        assert!(!fb.pixel(0, 1));
        assert_eq!(fb.lit_count(), 2);
    }

    #[test]
    fn test_start_position_wraps() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(64 + 3, 32 + 2, &[0x80]);
        assert!(fb.pixel(3, 2));
        assert_eq!(fb.lit_count(), 1);
    }

    #[test]
    fn test_clear() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 0, &[0xFF, 0xFF]);
        fb.take_changed();
        fb.clear();
        assert_eq!(fb.lit_count(), 0);
        assert!(fb.is_changed());
    }

    #[test]
    fn test_take_changed() {
        let mut fb = Framebuffer::new();
        assert!(fb.take_changed());
        assert!(!fb.take_changed());
        fb.draw_sprite(1, 1, &[0x01]);
        assert!(fb.take_changed());
        assert!(!fb.is_changed());
    }

    #[test]
    fn test_packed_layout() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 0, &[0xA0]);
        fb.draw_sprite(63, 31, &[0x80]);
        let packed = fb.to_packed();
        assert_eq!(packed.len(), 256);
        assert_eq!(packed[0], 0xA0);
        assert_eq!(packed[255], 0x01);
        assert_eq!(packed[1..255], [0; 254]);
    }

    #[test]
    fn test_text_rendering() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 0, &[0xC0, 0x40]);
        let text = fb.to_string();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("██"));
        assert_eq!(lines.next(), Some(" █"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(text.lines().count(), 32);
    }
}
