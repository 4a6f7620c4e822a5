/// The delay and sound timers. Both count down once per 60Hz tick and stop
/// at zero; only FX15/FX18 ever raise them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Timers::default()
    }

    /// one 60Hz tick
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }

    /// the tone should sound while this is true
    pub fn is_sounding(&self) -> bool {
        self.sound > 0
    }
}
