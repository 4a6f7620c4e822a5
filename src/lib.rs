//! A CHIP-8 interpreter for the terminal.
//!
//! ## Design
//!
//! * the machine (`cpu::Machine`) knows nothing about the host; it is driven
//!   one frame at a time and exposes its framebuffer, timers and keypad
//! * a frame is the instruction budget (`instructions_per_second / 60`)
//!   followed by exactly one tick of the delay and sound timers, so the
//!   clock rate never changes timer speed
//! * FX0A blocks by rewinding PC, so a waiting machine still hands control
//!   back to the host every frame
//! * every point where historical interpreters disagree is a `config::Quirks`
//!   switch with a fixed default
//! * display, input and sound sit behind traits, so the terminal front end
//!   can be swapped for anything else (and for headless test doubles)
//!
//! Model
//!
//! main
//!  |-- config, display, input, sound
//!  |-- machine(config, rom)
//!  |    |-- memory (font, program), registers, call stack
//!  |    |-- framebuffer, timers, keypad
//!  |    `-- fetch -> decode -> execute
//!  `-- interpreter(machine, display, input, sound).main_loop()
//!       |-- input.poll(keypad)            // may pause, reset or quit
//!       |-- machine.run_frame()           // N instructions, one timer tick
//!       |-- display.draw(framebuffer)     // only if it changed
//!       |-- sound.beep()/stop()           // on sound timer transitions
//!       `-- frame_clock.wait_for_next_frame()
pub mod config;
pub mod cpu;
pub mod display;
pub mod error;
pub mod frame_clock;
pub mod framebuffer;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod keypad;
pub mod memory;
pub mod registers;
pub mod sound;
pub mod stack;
pub mod timers;

pub use config::{Config, Quirks};
pub use cpu::{Machine, MachineState};
pub use error::Chip8Error;
