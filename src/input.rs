use crate::keypad::Keypad;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::Duration;

/// left-hand side of a qwerty keyboard, laid out like the COSMAC keypad
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals only report presses (and auto-repeats), so a press holds the
/// key down for this many frames
pub const KEY_HOLD_FRAMES: u8 = 10;

/// requests for the emulator itself rather than the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    TogglePause,
    Reset,
    Quit,
}

/// reads keypresses
pub trait Input {
    /// apply whatever input arrived since the last frame to the keypad, and
    /// return any host commands seen
    fn poll(&mut self, keypad: &mut Keypad) -> Result<Vec<HostCommand>, io::Error>;
}

/// Turns a stream of key presses into held keys with a timed release.
struct KeyHold {
    keymap: HashMap<char, u8>,
    held: [u8; 16],
}

impl KeyHold {
    fn new() -> Self {
        KeyHold {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held: [0; 16],
        }
    }

    /// count down held keys, releasing the ones that run out
    fn age(&mut self, keypad: &mut Keypad) {
        for (key, frames) in self.held.iter_mut().enumerate() {
            if *frames > 0 {
                *frames -= 1;
                if *frames == 0 {
                    keypad.set_key(key as u8, false);
                }
            }
        }
    }

    fn handle(&mut self, evt: KeyEvent, keypad: &mut Keypad) -> Option<HostCommand> {
        match evt.code {
            KeyCode::Esc => Some(HostCommand::Quit),
            KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(HostCommand::Quit)
            }
            KeyCode::Char(' ') => Some(HostCommand::TogglePause),
            KeyCode::Char('=') => Some(HostCommand::Reset),
            KeyCode::Char(key) => {
                match self.keymap.get(&key.to_ascii_lowercase()) {
                    Some(mapped_key) => {
                        self.held[*mapped_key as usize] = KEY_HOLD_FRAMES;
                        keypad.set_key(*mapped_key, true);
                    }
                    None => log::debug!("can't map {:?} to a COSMAC key", key),
                }
                None
            }
            other => {
                log::debug!("ignoring key {:?}", other);
                None
            }
        }
    }
}

/// keyboard input from the terminal, using crossterm
pub struct TermInput {
    keys: KeyHold,
}

impl TermInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keys: KeyHold::new(),
        })
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("couldn't leave raw mode: {}", e);
        }
    }
}

impl Input for TermInput {
    fn poll(&mut self, keypad: &mut Keypad) -> Result<Vec<HostCommand>, io::Error> {
        self.keys.age(keypad);
        let mut commands = Vec::new();
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => commands.extend(self.keys.handle(evt, keypad)),
                other => log::trace!("ignoring event {:?}", other),
            }
        }
        Ok(commands)
    }
}

/// something that happens at a given frame of a scripted run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEvent {
    Key(u8, bool),
    Command(HostCommand),
}

/// Input played back frame by frame; once the script runs out, nothing
/// further happens. Used for headless runs and tests.
pub struct ScriptedInput {
    frames: VecDeque<Vec<ScriptEvent>>,
}

impl ScriptedInput {
    pub fn new(frames: Vec<Vec<ScriptEvent>>) -> Self {
        ScriptedInput {
            frames: frames.into(),
        }
    }

    pub fn empty() -> Self {
        ScriptedInput::new(Vec::new())
    }
}

impl Input for ScriptedInput {
    fn poll(&mut self, keypad: &mut Keypad) -> Result<Vec<HostCommand>, io::Error> {
        let mut commands = Vec::new();
        for event in self.frames.pop_front().unwrap_or_default() {
            match event {
                ScriptEvent::Key(key, pressed) => keypad.set_key(key, pressed),
                ScriptEvent::Command(cmd) => commands.push(cmd),
            }
        }
        Ok(commands)
    }
}
