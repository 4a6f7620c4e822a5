/// 16-key hex keypad:
///   1 2 3 C
///   4 5 6 D
///   7 8 9 E
///   A 0 B F
/// the host writes it, the machine only reads it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; 16],
}

impl Keypad {
    pub fn new() -> Self {
        Keypad::default()
    }

    /// out-of-range keys are ignored
    pub fn set_key(&mut self, key: u8, pressed: bool) {
        if let Some(k) = self.keys.get_mut(key as usize) {
            *k = pressed;
        }
    }

    /// only the low nibble selects a key, so any register value is safe
    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0x0f) as usize]
    }

    /// lowest numbered key currently down
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|k| *k).map(|k| k as u8)
    }
}

/// Progress of an FX0A key wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWait {
    /// no wait in progress, or waiting for any key to go down
    Idle,
    /// a key went down; waiting for it to come back up
    AwaitingRelease(u8),
}

impl KeyWait {
    /// Advance the wait against the current keypad. Returns the key once the
    /// wait is complete; `None` means the instruction must run again.
    ///
    /// With `requires_release` unset the wait completes as soon as any key is
    /// down. Otherwise the first key seen down is latched and the wait only
    /// completes on that key's release.
    pub fn poll(&mut self, keypad: &Keypad, requires_release: bool) -> Option<u8> {
        match *self {
            KeyWait::Idle => {
                let key = keypad.first_pressed()?;
                if requires_release {
                    *self = KeyWait::AwaitingRelease(key);
                    None
                } else {
                    Some(key)
                }
            }
            KeyWait::AwaitingRelease(key) => {
                if keypad.is_pressed(key) {
                    None
                } else {
                    *self = KeyWait::Idle;
                    Some(key)
                }
            }
        }
    }
}

impl Default for KeyWait {
    fn default() -> Self {
        KeyWait::Idle
    }
}
