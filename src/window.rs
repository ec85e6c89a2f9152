//! Hann windows shared by grains and pitch-shift taps.

use core::f64::consts::TAU;
use libm::Libm;

/// Hann window value at `age` for a window of `length` samples.
///
/// Zero at `age == 0` and at `age == length - 1`, symmetric around the
/// middle. Windows of length one or less are a constant 1.0.
#[inline]
pub fn hann(age: usize, length: usize) -> f64 {
    if length <= 1 {
        return 1.0;
    }
    let x = age as f64 / (length - 1) as f64;
    0.5 - 0.5 * Libm::<f64>::cos(TAU * x)
}

/// Hann window over a normalised phase in `[0, 1)`.
#[inline]
pub fn hann_phase(phase: f64) -> f64 {
    0.5 - 0.5 * Libm::<f64>::cos(TAU * phase)
}
