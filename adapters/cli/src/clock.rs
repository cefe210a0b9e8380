//! Tempo state driving the frame loop.

use std::time::Duration;

/// Slowest accepted tempo.
pub(crate) const MIN_BPM: u32 = 60;
/// Fastest accepted tempo.
pub(crate) const MAX_BPM: u32 = 300;
/// Frames per beat.
const FRAMES_PER_BEAT: f64 = 4.0;

/// Frame clock with an immediate tempo and a target it animates toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Clock {
    value: u32,
    target: u32,
    paused: bool,
}

impl Clock {
    /// Creates a running clock at the given tempo.
    pub(crate) fn new(bpm: u32) -> Self {
        let bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        Self {
            value: bpm,
            target: bpm,
            paused: false,
        }
    }

    /// Current tempo.
    pub(crate) const fn bpm(&self) -> u32 {
        self.value
    }

    /// Tempo the clock is moving toward.
    pub(crate) const fn target(&self) -> u32 {
        self.target
    }

    pub(crate) const fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn play(&mut self) {
        self.paused = false;
        self.value = self.target;
    }

    pub(crate) fn stop(&mut self) {
        self.paused = true;
    }

    /// Applies a tempo change; either half may be left unchanged.
    pub(crate) fn set_speed(&mut self, value: Option<u32>, target: Option<u32>) {
        if let Some(value) = value {
            self.value = value.clamp(MIN_BPM, MAX_BPM);
        }
        if let Some(target) = target {
            self.target = target.clamp(MIN_BPM, MAX_BPM);
        }
    }

    /// Moves the tempo one step toward its target.
    pub(crate) fn animate(&mut self) {
        match self.value.cmp(&self.target) {
            std::cmp::Ordering::Less => self.value += 1,
            std::cmp::Ordering::Greater => self.value -= 1,
            std::cmp::Ordering::Equal => {}
        }
    }

    /// Wall-clock duration of one frame.
    pub(crate) fn period(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.value) / FRAMES_PER_BEAT)
    }
}
