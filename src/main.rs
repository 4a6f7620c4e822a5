use clap::Parser;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use chip8vm::config::{Config, Quirks, DEFAULT_INSTRUCTIONS_PER_SECOND};
use chip8vm::cpu::Machine;
use chip8vm::display::{HeadlessDisplay, MonoTermDisplay, Palette, Rgb};
use chip8vm::framebuffer::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use chip8vm::input::{ScriptedInput, TermInput};
use chip8vm::interpreter::Chip8Interpreter;
use chip8vm::sound::{Mute, SimpleBeep, Sound};

/// Run a CHIP-8 program in the terminal.
///
/// Keys 1234/qwer/asdf/zxcv are the hex keypad. Space pauses, = resets,
/// Esc quits.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// the program to run
    rom: PathBuf,

    /// instructions executed per second
    #[clap(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    ips: u32,

    /// 8XY1/8XY2/8XY3 reset VF
    #[clap(long)]
    vf_reset: bool,

    /// 8XY6/8XYE shift VY into VX
    #[clap(long)]
    shift_vy: bool,

    /// FX55/FX65 advance I past the registers copied
    #[clap(long)]
    index_increment: bool,

    /// FX0A completes on key press instead of key release
    #[clap(long)]
    key_wait_on_press: bool,

    /// stop each frame's instructions after the first sprite draw
    #[clap(long)]
    single_draw: bool,

    /// FX18 reads the sound timer into VX instead of setting it
    #[clap(long)]
    sound_read_back: bool,

    /// seed for the random number generator
    #[clap(long)]
    seed: Option<u64>,

    /// log every instruction executed
    #[clap(long)]
    trace: bool,

    /// foreground colour, RRGGBB
    #[clap(long)]
    fg: Option<Rgb>,

    /// background colour, RRGGBB
    #[clap(long)]
    bg: Option<Rgb>,

    /// no sound
    #[clap(long)]
    mute: bool,

    /// don't touch the terminal; print the final screen on exit
    #[clap(long)]
    headless: bool,

    /// stop after this many frames
    #[clap(long)]
    frames: Option<u64>,

    /// more logging on stderr; repeat for more
    #[clap(short, long, parse(from_occurrences))]
    verbose: usize,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            instructions_per_second: self.ips,
            quirks: Quirks {
                vf_reset_on_logic_ops: self.vf_reset,
                shift_uses_vy: self.shift_vy,
                index_increment_on_mem_ops: self.index_increment,
                key_wait_requires_release: !self.key_wait_on_press,
                single_draw_per_frame: self.single_draw,
                sound_timer_read_back: self.sound_read_back,
            },
            seed: self.seed,
            trace: self.trace,
        }
    }

    fn palette(&self) -> Palette {
        let default = Palette::default();
        Palette {
            fg: self.fg.unwrap_or(default.fg),
            bg: self.bg.unwrap_or(default.bg),
        }
    }

    fn log_level(&self) -> log::LevelFilter {
        if self.trace {
            return log::LevelFilter::Trace;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    // load the program before touching the terminal, so errors stay readable
    let rom = fs::read(&args.rom)?;
    let machine = Machine::new(args.config(), &rom)?;
    let title = args
        .rom
        .file_name()
        .map(|name| format!("CHIP-8: {}", name.to_string_lossy()))
        .unwrap_or_else(|| "CHIP-8".to_string());

    let mut sound: Box<dyn Sound> = if args.mute {
        Box::new(Mute::new())
    } else {
        Box::new(SimpleBeep::new())
    };

    if args.headless {
        let mut display = HeadlessDisplay::new(DISPLAY_WIDTH, DISPLAY_HEIGHT);
        let mut input = ScriptedInput::empty();
        let mut interpreter =
            Chip8Interpreter::new(machine, &mut display, &mut input, sound.as_mut())?;
        let result = interpreter.main_loop(args.frames);
        print!("{}", interpreter.machine().framebuffer());
        result?;
    } else {
        let mut input = TermInput::new()?;
        let mut display = MonoTermDisplay::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, args.palette(), &title)?;
        let mut interpreter =
            Chip8Interpreter::new(machine, &mut display, &mut input, sound.as_mut())?;
        interpreter.main_loop(args.frames)?;
    }
    Ok(())
}
