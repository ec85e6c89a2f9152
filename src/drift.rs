//! Drift Modulation
//!
//! Two slow bounded random walks: one nudges where grains start reading, the
//! other detunes their playback rate. Unlike an LFO the walks never repeat,
//! which keeps long textures from sounding cyclic. Both values live in
//! `[-1, 1]`; consumers scale them to samples or semitones.

use crate::rng::RandomSource;

/// Base step of the read-offset walk, per sample.
const READ_STEP_BASE: f64 = 2.0e-5;
/// Additional read-offset step per Hz of modulation rate.
const READ_STEP_PER_HZ: f64 = 2.0e-4;
/// Base step of the detune walk, per sample.
const DETUNE_STEP_BASE: f64 = 1.0e-6;
/// Additional detune step per Hz of modulation rate.
const DETUNE_STEP_PER_HZ: f64 = 2.0e-5;

/// Pair of bounded random walks advanced once per output sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriftModulator {
    read_offset: f64,
    detune: f64,
}

impl DriftModulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-sample step sizes `(read, detune)` for the given controls.
    #[inline]
    pub fn step_sizes(drift_amount: f64, mod_rate: f64) -> (f64, f64) {
        (
            (READ_STEP_BASE + READ_STEP_PER_HZ * mod_rate) * drift_amount,
            (DETUNE_STEP_BASE + DETUNE_STEP_PER_HZ * mod_rate) * drift_amount,
        )
    }

    /// Take one random-walk step on both values.
    ///
    /// Draws exactly two values from `rng`, read offset first.
    #[inline]
    pub fn advance<R: RandomSource + ?Sized>(
        &mut self,
        rng: &mut R,
        drift_amount: f64,
        mod_rate: f64,
    ) {
        let (read_step, detune_step) = Self::step_sizes(drift_amount, mod_rate);
        self.read_offset = (self.read_offset + read_step * rng.next_bipolar()).clamp(-1.0, 1.0);
        self.detune = (self.detune + detune_step * rng.next_bipolar()).clamp(-1.0, 1.0);
    }

    /// Current read-position drift in `[-1, 1]`.
    #[inline]
    pub fn read_offset(&self) -> f64 {
        self.read_offset
    }

    /// Current detune drift in `[-1, 1]`.
    #[inline]
    pub fn detune(&self) -> f64 {
        self.detune
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Rng;
    use approx::assert_relative_eq;

    /// Always returns the same bipolar value.
    struct Constant(f64);

    impl RandomSource for Constant {
        fn next_unit(&mut self) -> f64 {
            (self.0 + 1.0) * 0.5
        }
    }

    #[test]
    fn test_step_sizes() {
        let (read, detune) = DriftModulator::step_sizes(0.5, 1.0);
        assert_relative_eq!(read, (2.0e-5 + 2.0e-4) * 0.5);
        assert_relative_eq!(detune, (1.0e-6 + 2.0e-5) * 0.5);
    }

    #[test]
    fn test_zero_drift_stays_put() {
        let mut drift = DriftModulator::new();
        let mut rng = Rng::from_seed(7);
        for _ in 0..10_000 {
            drift.advance(&mut rng, 0.0, 4.0);
        }
        assert_eq!(drift.read_offset(), 0.0);
        assert_eq!(drift.detune(), 0.0);
    }

    #[test]
    fn test_one_sided_noise_is_clamped() {
        let mut drift = DriftModulator::new();
        let mut rng = Constant(1.0);
        for _ in 0..1_000_000 {
            drift.advance(&mut rng, 1.0, 4.0);
        }
        assert_eq!(drift.read_offset(), 1.0);
        assert!(drift.detune() > 0.0 && drift.detune() <= 1.0);

        let mut rng = Constant(-1.0);
        for _ in 0..1_000_000 {
            drift.advance(&mut rng, 1.0, 4.0);
        }
        assert_eq!(drift.read_offset(), -1.0);
    }

    #[test]
    fn test_walk_stays_bounded() {
        let mut drift = DriftModulator::new();
        let mut rng = Rng::from_seed(99);
        for _ in 0..200_000 {
            drift.advance(&mut rng, 1.0, 4.0);
            assert!((-1.0..=1.0).contains(&drift.read_offset()));
            assert!((-1.0..=1.0).contains(&drift.detune()));
        }
    }

    #[test]
    fn test_reset() {
        let mut drift = DriftModulator::new();
        let mut rng = Constant(1.0);
        drift.advance(&mut rng, 1.0, 1.0);
        assert!(drift.read_offset() > 0.0);
        drift.reset();
        assert_eq!(drift, DriftModulator::default());
    }
}
