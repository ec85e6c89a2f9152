//! Audio Blocks
//!
//! Sample containers handed between the engines once per host callback.
//! Storage is allocated up front for the largest block the host announced;
//! per-callback resizing stays within that capacity so the audio thread
//! never allocates.

/// Default processing block size
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Mono audio buffer with a fixed capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    samples: Vec<f64>,
}

impl AudioBlock {
    /// Create a block of `size` zeroed samples.
    pub fn new(size: usize) -> Self {
        Self {
            samples: vec![0.0; size],
        }
    }

    /// Create a block from existing samples
    pub fn from_samples(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples the block can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// Resize to `len` samples. New samples are zeroed.
    ///
    /// Does not reallocate while `len <= capacity()`.
    pub fn set_len(&mut self, len: usize) {
        self.samples.resize(len, 0.0);
    }

    /// Get a sample at the given index
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.samples.get(index).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.samples
    }

    /// Clear the block (fill with zeros)
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }

    /// Multiply all samples by a constant
    pub fn mul_scalar(&mut self, value: f64) {
        for sample in &mut self.samples {
            *sample *= value;
        }
    }

    /// Copy as many samples as both sides hold.
    pub fn copy_from_slice(&mut self, other: &[f64]) {
        let len = self.samples.len().min(other.len());
        self.samples[..len].copy_from_slice(&other[..len]);
    }

    /// Get the peak (maximum absolute value)
    pub fn peak(&self) -> f64 {
        self.samples.iter().map(|s| s.abs()).fold(0.0, f64::max)
    }

    /// Get the RMS (root mean square) value
    pub fn rms(&self) -> f64 {
        rms(&self.samples)
    }
}

impl Default for AudioBlock {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

/// Stereo audio block pair
#[derive(Debug, Clone, PartialEq)]
pub struct StereoBlock {
    pub left: AudioBlock,
    pub right: AudioBlock,
}

impl StereoBlock {
    pub fn new(size: usize) -> Self {
        Self {
            left: AudioBlock::new(size),
            right: AudioBlock::new(size),
        }
    }

    /// Build a block from two equal-length channels.
    ///
    /// The longer channel is truncated to the shorter one.
    pub fn from_channels(mut left: Vec<f64>, mut right: Vec<f64>) -> Self {
        let len = left.len().min(right.len());
        left.truncate(len);
        right.truncate(len);
        Self {
            left: AudioBlock::from_samples(left),
            right: AudioBlock::from_samples(right),
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn set_len(&mut self, len: usize) {
        self.left.set_len(len);
        self.right.set_len(len);
    }

    pub fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    /// Mutable access to both channels at once.
    pub fn channels_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (self.left.as_mut_slice(), self.right.as_mut_slice())
    }

    /// Resize to match `other` and copy its contents.
    pub fn copy_from(&mut self, other: &StereoBlock) {
        self.set_len(other.len());
        self.left.copy_from_slice(other.left.as_slice());
        self.right.copy_from_slice(other.right.as_slice());
    }

    /// Get the peak level (max of both channels)
    pub fn peak(&self) -> f64 {
        self.left.peak().max(self.right.peak())
    }

    /// RMS over both channels together.
    pub fn rms(&self) -> f64 {
        let l = self.left.rms();
        let r = self.right.rms();
        libm::sqrt(0.5 * (l * l + r * r))
    }
}

impl Default for StereoBlock {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

/// Root mean square of a sample slice. Empty slices are silent.
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
    libm::sqrt(sum_sq / samples.len() as f64)
}
