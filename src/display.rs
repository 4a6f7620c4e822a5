use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use std::io;
use std::str::FromStr;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    /// draw packed framebuffer data (one bit per pixel, row-major, msb
    /// leftmost) based on internal resolution of display
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error>;

    /// how big the display data should be
    fn get_display_size_bytes(&mut self) -> usize;

    /// tell the display the machine was paused or resumed
    fn set_paused(&mut self, _paused: bool) {}
}

// store useful metadata about the screen: width, height, bitplanes
struct Resolution(usize, usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn byte_count(&self) -> usize {
        self.pixel_count() * self.2 / 8
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel in data that is set to `bitplane`
    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        bitplane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let w = self.0;
        (0..self.pixel_count()).filter_map(move |n| {
            let bit = 1 & (data[n / 8] >> (7 - n % 8));
            if bit == bitplane {
                Some((
                    (n % w) as f64,        // x
                    -1.0 * (n / w) as f64, // y
                ))
            } else {
                None
            }
        })
    }
}

/// a 24-bit colour given on the command line as RRGGBB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim_start_matches('#');
        if hex.len() != 6 {
            return Err(format!("expected a colour as RRGGBB, got '{}'", s));
        }
        let value = u32::from_str_radix(hex, 16)
            .map_err(|_| format!("expected a colour as RRGGBB, got '{}'", s))?;
        Ok(Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8))
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::Rgb(rgb.0, rgb.1, rgb.2)
    }
}

/// foreground (lit) and background colours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub fg: Rgb,
    pub bg: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            fg: Rgb(0xff, 0xff, 0xff),
            bg: Rgb(0x00, 0x00, 0x00),
        }
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    palette: Palette,
    title: String,
    paused: bool,
}

impl MonoTermDisplay {
    pub fn new(x: usize, y: usize, palette: Palette, title: &str) -> Result<MonoTermDisplay, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(x, y, 1),
            palette,
            title: title.to_string(),
            paused: false,
        })
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        // make sure we're given exactly the right amount of data to draw
        assert_eq!(
            data.len(),
            self.resolution.byte_count(),
            "MonoTermDisplay must have correct-sized data to draw"
        );

        let title = if self.paused {
            format!("{} [PAUSED]", self.title)
        } else {
            self.title.clone()
        };
        let background = self.resolution.bitplane_from_data(data, 0).collect::<Vec<_>>();
        let foreground = self.resolution.bitplane_from_data(data, 1).collect::<Vec<_>>();
        let (fg, bg): (Color, Color) = (self.palette.fg.into(), self.palette.bg.into());
        let size = Rect::new(
            0,
            0,
            2 + self.resolution.0 as u16,
            2 + self.resolution.1 as u16,
        );

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title.as_str())
                        .borders(Borders::ALL)
                        .style(Style::default().bg(bg)),
                )
                .x_bounds(self.resolution.x_bounds())
                .y_bounds(self.resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &background,
                        color: bg,
                    });
                    ctx.draw(&Points {
                        coords: &foreground,
                        color: fg,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }

    /// how big the display data should be
    fn get_display_size_bytes(&mut self) -> usize {
        self.resolution.byte_count()
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        if let Err(e) = execute!(io::stdout(), Show, LeaveAlternateScreen) {
            log::warn!("couldn't restore the terminal: {}", e);
        }
    }
}

/// Renders nowhere, but remembers what it was asked to draw. Used for
/// `--headless` runs and for testing non-display routines.
pub struct HeadlessDisplay {
    resolution: Resolution,
    pub frames_drawn: usize,
    pub last_frame: Vec<u8>,
    pub paused: bool,
}

impl HeadlessDisplay {
    pub fn new(x: usize, y: usize) -> HeadlessDisplay {
        HeadlessDisplay {
            resolution: Resolution(x, y, 1),
            frames_drawn: 0,
            last_frame: Vec::new(),
            paused: false,
        }
    }
}

impl Display for HeadlessDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        if data.len() != self.resolution.byte_count() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "HeadlessDisplay must have correct-sized data to draw",
            ));
        }
        self.frames_drawn += 1;
        self.last_frame = data.to_vec();
        Ok(())
    }

    fn get_display_size_bytes(&mut self) -> usize {
        self.resolution.byte_count()
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}
