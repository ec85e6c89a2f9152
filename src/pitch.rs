//! Dual-Window Pitch Shifter
//!
//! Time-domain pitch shifting with two read taps sweeping through a short
//! delay line half a cycle apart. Each tap reads `phase * window` samples
//! behind the write head, and the phase ramps by `(pitch_factor - 1) / window`
//! per sample, so the tap delays change by `pitch_factor - 1` samples per
//! sample. When a tap wraps to the other end of its sweep the jump is hidden
//! under the zero of its Hann crossfade while the other tap is at full gain.
//!
//! At a pitch factor of exactly 1 the taps stand still and the shifter is a
//! pure delay of half a window.

use crate::config::ProcessConfig;
use crate::delay_line::DelayLine;
use crate::window::hann_phase;

/// Crossfade window length in milliseconds.
pub const WINDOW_MS: f64 = 50.0;

/// Delay line length in seconds; must exceed one window.
pub const BUFFER_SECONDS: f64 = 0.08;

/// Lowest accepted pitch factor (one octave down).
pub const MIN_PITCH_FACTOR: f64 = 0.5;

/// Highest accepted pitch factor (one octave up).
pub const MAX_PITCH_FACTOR: f64 = 2.0;

/// Keeps the crossfade normalisation finite.
const WEIGHT_EPSILON: f64 = 1.0e-9;

/// Single-channel pitch shifter, processed in place.
#[derive(Debug, Clone)]
pub struct DualWindowPitchShifter {
    delay: DelayLine,
    window: f64,
    phase: f64,
    pitch_factor: f64,
}

impl DualWindowPitchShifter {
    /// Create an unprepared shifter. Processing is a no-op until
    /// [`prepare`](Self::prepare) is called.
    pub fn new() -> Self {
        Self {
            delay: DelayLine::new(0),
            window: 0.0,
            phase: 0.0,
            pitch_factor: 1.0,
        }
    }

    /// Allocate the delay line and reset the sweep.
    pub fn prepare(&mut self, config: &ProcessConfig) {
        self.delay = DelayLine::with_duration(config.sample_rate(), BUFFER_SECONDS);
        self.window = config.ms_to_samples(WINDOW_MS);
        self.phase = 0.0;
    }

    /// Set the playback ratio; clamped to one octave either way.
    pub fn set_pitch_factor(&mut self, factor: f64) {
        self.pitch_factor = if factor.is_finite() {
            factor.clamp(MIN_PITCH_FACTOR, MAX_PITCH_FACTOR)
        } else {
            1.0
        };
    }

    pub fn pitch_factor(&self) -> f64 {
        self.pitch_factor
    }

    /// Window length in samples.
    pub fn window_samples(&self) -> f64 {
        self.window
    }

    /// Delay of a pitch-neutral shifter, in samples.
    pub fn latency_samples(&self) -> f64 {
        0.5 * self.window
    }

    pub fn is_prepared(&self) -> bool {
        self.delay.is_ready() && self.window > 0.0
    }

    /// Clear the delay line and restart the sweep.
    pub fn reset(&mut self) {
        self.delay.clear();
        self.phase = 0.0;
    }

    /// Shift `samples` in place.
    pub fn process(&mut self, samples: &mut [f64]) {
        if !self.is_prepared() {
            return;
        }
        let rate = (self.pitch_factor - 1.0) / self.window;

        for sample in samples.iter_mut() {
            let head = self.delay.write_position() as f64;
            self.delay.write(*sample);

            let phase_a = self.phase;
            let phase_b = wrap_phase(self.phase + 0.5);
            let (w_a, w_b) = (hann_phase(phase_a), hann_phase(phase_b));
            let weighted = self.tap(head, phase_a) * w_a + self.tap(head, phase_b) * w_b;
            *sample = weighted / (w_a + w_b + WEIGHT_EPSILON);

            self.phase = wrap_phase(self.phase + rate);
        }
    }

    /// Unweighted read `phase * window` samples behind `head`.
    #[inline]
    fn tap(&self, head: f64, phase: f64) -> f64 {
        let delay = phase * self.window;
        let pos = self.delay.wrap(head - delay);
        self.delay.read_fractional(pos)
    }

    /// Current tap delays in samples.
    #[cfg(test)]
    fn tap_delays(&self) -> (f64, f64) {
        let b = wrap_phase(self.phase + 0.5);
        (self.phase * self.window, b * self.window)
    }
}

impl Default for DualWindowPitchShifter {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold any phase into `[0, 1)`.
#[inline]
fn wrap_phase(phase: f64) -> f64 {
    if !phase.is_finite() {
        return 0.0;
    }
    let wrapped = phase.rem_euclid(1.0);
    // rem_euclid rounds tiny negative inputs up to exactly 1.0
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}
