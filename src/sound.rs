use beep::beep;
use std::error::Error;

/// makes the one tone the machine can make
pub trait Sound {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// tone through the PC speaker
pub struct SimpleBeep;

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        beep(SIMPLEBEEP_PITCH)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        beep(0)?;
        Ok(())
    }
}

impl Drop for SimpleBeep {
    fn drop(&mut self) {
        // don't leave the speaker on after exit
        if let Err(e) = self.stop() {
            log::warn!("couldn't silence the speaker: {}", e);
        }
    }
}

pub struct Mute;

impl Mute {
    pub fn new() -> Self {
        Mute
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}
