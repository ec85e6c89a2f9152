//! Processing configuration handed to every engine's `prepare`.

use crate::error::{Error, Result};

/// Validated sample rate and maximum block size.
///
/// Engines size their buffers from this once, outside the audio callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessConfig {
    sample_rate: f64,
    max_block_size: usize,
}

impl ProcessConfig {
    /// Validate a host configuration.
    ///
    /// # Errors
    /// [`Error::InvalidSampleRate`] for non-finite or non-positive rates,
    /// [`Error::InvalidBlockSize`] for a zero block size.
    pub fn new(sample_rate: f64, max_block_size: usize) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        if max_block_size == 0 {
            return Err(Error::InvalidBlockSize(max_block_size));
        }
        Ok(Self {
            sample_rate,
            max_block_size,
        })
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[inline]
    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Milliseconds to (fractional) samples at this rate.
    #[inline]
    pub fn ms_to_samples(&self, ms: f64) -> f64 {
        ms * self.sample_rate / 1000.0
    }
}
