//! # interpreter
//!
//! Binds a [`Machine`] to the host: each frame polls input, runs the
//! machine's instruction budget and timer tick, then hands the framebuffer
//! to the display and gates the tone on the sound timer. Frames are paced at
//! 60Hz by a [`FrameClock`].
use crate::cpu::{Machine, MachineState};
use crate::display::Display;
use crate::error::Chip8Error;
use crate::frame_clock::{FrameClock, FRAME};
use crate::framebuffer::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::input::{HostCommand, Input};
use crate::sound::Sound;
use std::io;

pub struct Chip8Interpreter<'a> {
    machine: Machine,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    beeping: bool,
    audio_failed: bool,
    redraw: bool,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        machine: Machine,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Result<Chip8Interpreter<'a>, Chip8Error> {
        let wanted = DISPLAY_WIDTH * DISPLAY_HEIGHT / 8;
        let size = display.get_display_size_bytes();
        if size != wanted {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("display takes {} bytes per frame, need {}", size, wanted),
            )
            .into());
        }
        Ok(Chip8Interpreter {
            machine,
            display,
            input,
            sound,
            beeping: false,
            audio_failed: false,
            redraw: true,
        })
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// run one frame against the host
    pub fn frame(&mut self) -> Result<(), Chip8Error> {
        for command in self.input.poll(self.machine.keypad_mut())? {
            self.command(command);
        }
        let ran = self.machine.run_frame();
        self.present()?;
        self.update_sound();
        ran
    }

    fn command(&mut self, command: HostCommand) {
        match command {
            HostCommand::TogglePause => {
                let paused = match self.machine.state() {
                    MachineState::Running => {
                        self.machine.set_state(MachineState::Paused);
                        true
                    }
                    MachineState::Paused => {
                        self.machine.set_state(MachineState::Running);
                        false
                    }
                    MachineState::Quit => return,
                };
                self.display.set_paused(paused);
                self.redraw = true;
            }
            HostCommand::Reset => {
                self.machine.reset();
                self.display.set_paused(false);
                self.redraw = true;
            }
            HostCommand::Quit => self.machine.set_state(MachineState::Quit),
        }
    }

    /// draw the framebuffer if it changed since the last frame
    fn present(&mut self) -> Result<(), io::Error> {
        let changed = self.machine.framebuffer_mut().take_changed();
        if changed || self.redraw {
            self.display.draw(&self.machine.framebuffer().to_packed())?;
            self.redraw = false;
        }
        Ok(())
    }

    /// start or stop the tone on sound timer transitions. audio trouble
    /// isn't worth stopping for, so the first failure mutes us for good
    fn update_sound(&mut self) {
        let sounding = self.machine.timers().is_sounding()
            && self.machine.state() == MachineState::Running;
        if self.audio_failed || sounding == self.beeping {
            return;
        }
        let result = if sounding {
            self.sound.beep()
        } else {
            self.sound.stop()
        };
        match result {
            Ok(()) => self.beeping = sounding,
            Err(e) => {
                log::warn!("audio failed, muting: {}", e);
                self.audio_failed = true;
            }
        }
    }

    /// Run until the machine quits or `frame_limit` frames have gone by, and
    /// return the number of frames run.
    pub fn main_loop(&mut self, frame_limit: Option<u64>) -> Result<u64, Chip8Error> {
        let mut clock = FrameClock::start(FRAME);
        let mut frames = 0;
        let result = loop {
            if self.machine.state() == MachineState::Quit
                || frame_limit.map_or(false, |limit| frames >= limit)
            {
                break Ok(frames);
            }
            if let Err(e) = self.frame() {
                break Err(e);
            }
            frames += 1;
            clock.wait_for_next_frame();
        };
        if self.beeping {
            if let Err(e) = self.sound.stop() {
                log::warn!("couldn't stop the tone: {}", e);
            }
            self.beeping = false;
        }
        log::info!("stopped after {} frames", frames);
        result
    }
}
