use std::time::Duration;

#[cfg(test)]
use fake_clock::FakeClock as Instant;
#[cfg(not(test))]
use std::time::Instant;

#[cfg(not(test))]
use spin_sleep::sleep;
#[cfg(test)]
fn sleep(durr: Duration) {
    use fake_clock::FakeClock;
    FakeClock::advance_time(durr.as_millis() as u64);
}

/// one frame at 60Hz
pub const FRAME: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Paces the main loop to a fixed frame rate. Oversleeping in one frame is
/// paid back by sleeping less in the next; a frame that overruns is not
/// caught up, so a slow host runs slow rather than bursting.
pub struct FrameClock {
    instant: Instant,
    frame: Duration,
    runover: Duration,
}

impl FrameClock {
    pub fn start(frame: Duration) -> Self {
        FrameClock {
            instant: Instant::now(),
            frame,
            runover: Duration::ZERO,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }

    /// sleep out whatever remains of the current frame, then start the next
    pub fn wait_for_next_frame(&mut self) {
        let remaining = self.frame.saturating_sub(self.elapsed());
        if remaining.is_zero() {
            log::debug!("frame overran by {:?}", self.elapsed() - self.frame);
            self.runover = Duration::ZERO;
        } else if self.runover < remaining {
            let should_sleep = remaining - self.runover;
            let now = Instant::now();

            sleep(should_sleep);

            self.runover = now.elapsed().saturating_sub(should_sleep);
        } else {
            self.runover -= remaining;
        }

        self.instant = Instant::now();
    }
}
