//! Circular Delay Line
//!
//! A fixed-capacity ring of samples with an integer write cursor and a
//! linearly interpolated fractional read. Both the granular engine (seconds of
//! history) and the pitch shifter (tens of milliseconds) sit on top of it.
//!
//! Positions handed to [`DelayLine::read_fractional`] are absolute buffer
//! positions, not delays. They may sit slightly outside `[0, capacity)`; they
//! are folded back by repeated addition or subtraction of the capacity, which
//! is cheap for the small overshoots produced by jitter and read increments.

use libm::Libm;

/// Minimum usable capacity. Interpolation needs two distinct slots.
pub const MIN_CAPACITY: usize = 2;

/// Circular sample buffer with fractional read.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f64>,
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line holding `capacity` samples of silence.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
        }
    }

    /// Create a delay line long enough for `seconds` of audio at `sample_rate`.
    ///
    /// The capacity never drops below [`MIN_CAPACITY`].
    pub fn with_duration(sample_rate: f64, seconds: f64) -> Self {
        let samples = Libm::<f64>::ceil(sample_rate * seconds).max(MIN_CAPACITY as f64);
        Self::new(samples as usize)
    }

    /// Number of samples the line holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// True once the line has room for interpolated reads.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.buffer.len() >= MIN_CAPACITY
    }

    /// Slot the next [`write`](Self::write) will fill.
    #[inline]
    pub fn write_position(&self) -> usize {
        self.write_pos
    }

    /// Store a sample at the cursor and advance the cursor by one slot.
    #[inline]
    pub fn write(&mut self, sample: f64) {
        self.buffer[self.write_pos] = sample;
        self.advance();
    }

    /// Advance the cursor without touching the stored samples.
    ///
    /// Used while frozen: time keeps moving but history is preserved.
    #[inline]
    pub fn advance(&mut self) {
        self.write_pos += 1;
        if self.write_pos >= self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Fold any position into `[0, capacity)`.
    #[inline]
    pub fn wrap(&self, position: f64) -> f64 {
        wrap_position(position, self.buffer.len() as f64)
    }

    /// Read at an absolute fractional position with linear interpolation
    /// between `floor(position)` and the slot after it.
    #[inline]
    pub fn read_fractional(&self, position: f64) -> f64 {
        let size = self.buffer.len();
        let pos = self.wrap(position);
        let i0 = (pos as usize).min(size - 1);
        let i1 = if i0 + 1 == size { 0 } else { i0 + 1 };
        let frac = pos - i0 as f64;
        let a = self.buffer[i0];
        let b = self.buffer[i1];
        a + frac * (b - a)
    }

    /// Read `delay` samples behind the most recently written sample.
    ///
    /// A delay of zero returns the last written sample.
    #[inline]
    pub fn read_delayed(&self, delay: f64) -> f64 {
        let newest = self.write_pos as f64 - 1.0;
        self.read_fractional(newest - delay)
    }

    /// Raw view of the stored samples, in slot order.
    pub fn as_slice(&self) -> &[f64] {
        &self.buffer
    }

    /// Silence the buffer and rewind the cursor.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::new(MIN_CAPACITY)
    }
}

/// Fold `position` into `[0, size)` by repeated addition/subtraction.
///
/// Non-finite positions collapse to slot zero so a corrupt read position can
/// never index out of bounds or spin forever. Overshoots of more than one
/// lap are reduced with a remainder first.
#[inline]
pub(crate) fn wrap_position(mut position: f64, size: f64) -> f64 {
    if !position.is_finite() || size <= 0.0 {
        return 0.0;
    }
    if position < -size || position >= 2.0 * size {
        position %= size;
    }
    while position < 0.0 {
        position += size;
    }
    while position >= size {
        position -= size;
    }
    position
}
