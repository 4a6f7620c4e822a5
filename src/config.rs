//! Machine configuration. A `Config` is built once (normally from the command
//! line) and handed to the machine by value; nothing reads it from global
//! state.

/// the display refresh and timer rate, fixed by the hardware
pub const FRAMES_PER_SECOND: u32 = 60;

/// default clock rate; fast enough for most games without breaking the
/// ones that busy-wait on the delay timer
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u32 = 700;

/// Points where historical interpreters disagree. Every switch defaults to a
/// fixed value, listed on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY1/8XY2/8XY3 zero VF after the logic op (COSMAC VIP). default: off
    pub vf_reset_on_logic_ops: bool,
    /// 8XY6/8XYE shift VY into VX rather than shifting VX in place. default: off
    pub shift_uses_vy: bool,
    /// FX55/FX65 leave I pointing past the last register copied. default: off
    pub index_increment_on_mem_ops: bool,
    /// FX0A latches the first pressed key and completes on its release,
    /// rather than as soon as a key is down. default: on
    pub key_wait_requires_release: bool,
    /// stop the frame's instruction budget after the first sprite draw.
    /// default: off
    pub single_draw_per_frame: bool,
    /// FX18 reads the sound timer into VX instead of writing it, as some
    /// buggy interpreters did. default: off
    pub sound_timer_read_back: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks {
            vf_reset_on_logic_ops: false,
            shift_uses_vy: false,
            index_increment_on_mem_ops: false,
            key_wait_requires_release: true,
            single_draw_per_frame: false,
            sound_timer_read_back: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub instructions_per_second: u32,
    pub quirks: Quirks,
    /// seed for the CXNN generator; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// log every executed instruction at trace level
    pub trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            instructions_per_second: DEFAULT_INSTRUCTIONS_PER_SECOND,
            quirks: Quirks::default(),
            seed: None,
            trace: false,
        }
    }
}

impl Config {
    /// how many instructions run between two timer ticks; never zero, or a
    /// slow clock would stall the machine entirely
    pub fn instructions_per_frame(&self) -> u32 {
        (self.instructions_per_second / FRAMES_PER_SECOND).max(1)
    }
}
