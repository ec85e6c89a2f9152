//! Shimmer Feedback Stage
//!
//! Wraps the reverberator in an outer feedback loop: the previous block's
//! reverb output is pitch shifted, mixed back into the current input, sent
//! through a pre-delay and reverberated again. Repeated passes stack the
//! interval into rising (or falling) harmonic tails.
//!
//! The loop runs once per block, so the feedback is delayed by one block on
//! top of the pitch shifter's half-window latency.
//!
//! The reverb output is stored for the next pass through a soft clipper that
//! is transparent below [`HISTORY_KNEE`] and never exceeds `HISTORY_KNEE + 1`. A reverb
//! with more than unity gain at some frequency therefore saturates the loop
//! instead of running away, and a non-finite sample is dropped.

use crate::block::StereoBlock;
use crate::config::ProcessConfig;
use crate::delay_line::DelayLine;
use crate::drift::DriftModulator;
use crate::granular::semitones_to_ratio;
use crate::pitch::DualWindowPitchShifter;
use crate::reverb::{FreeverbReverb, ReverbSettings, Reverberator, DEFAULT_WIDTH};
use crate::rng::{RandomSource, Rng};
use serde::{Deserialize, Serialize};

/// Gain of the pitch-shifted history at full shimmer.
pub const SHIMMER_GAIN: f64 = 0.65;

/// Longest pre-delay in milliseconds.
pub const MAX_PRE_DELAY_MS: f64 = 250.0;

/// Level above which the fed-back reverb output is soft clipped.
pub const HISTORY_KNEE: f64 = 1.0;

/// Pitch bend range of the drift walk in semitones, at full drift and depth.
const DRIFT_DETUNE_SEMITONES: f64 = 0.48;

/// Pitch interval of the shimmer feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShimmerInterval {
    /// +5 semitones
    Fourth,
    /// +7 semitones
    Fifth,
    /// +12 semitones
    #[default]
    Octave,
    /// +24 semitones
    TwoOctaves,
}

impl ShimmerInterval {
    pub const ALL: [ShimmerInterval; 4] = [
        ShimmerInterval::Fourth,
        ShimmerInterval::Fifth,
        ShimmerInterval::Octave,
        ShimmerInterval::TwoOctaves,
    ];

    pub fn semitones(self) -> f64 {
        match self {
            ShimmerInterval::Fourth => 5.0,
            ShimmerInterval::Fifth => 7.0,
            ShimmerInterval::Octave => 12.0,
            ShimmerInterval::TwoOctaves => 24.0,
        }
    }

    /// Choice index as exposed to hosts.
    pub fn index(self) -> usize {
        match self {
            ShimmerInterval::Fourth => 0,
            ShimmerInterval::Fifth => 1,
            ShimmerInterval::Octave => 2,
            ShimmerInterval::TwoOctaves => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Parameter snapshot for [`ShimmerFeedbackStage`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimmerParams {
    pub room_size: f64,
    pub pre_delay_ms: f64,
    /// Brightness; the reverb damping is `1 - tone`.
    pub tone: f64,
    pub shimmer_amount: f64,
    /// Shift applied to the fed-back reverb output.
    pub pitch_semitones: f64,
    pub reverb_mix: f64,
    pub drift: f64,
    pub mod_rate_hz: f64,
    pub mod_depth: f64,
    pub freeze: bool,
}

impl Default for ShimmerParams {
    fn default() -> Self {
        Self {
            room_size: 0.55,
            pre_delay_ms: 20.0,
            tone: 0.55,
            shimmer_amount: 0.25,
            pitch_semitones: 12.0,
            reverb_mix: 1.0,
            drift: 0.25,
            mod_rate_hz: 0.35,
            mod_depth: 0.25,
            freeze: false,
        }
    }
}

impl ShimmerParams {
    /// Pitch ratio of the shimmer feedback, before drift.
    pub fn pitch_factor(&self) -> f64 {
        semitones_to_ratio(self.pitch_semitones)
    }

    /// Gain applied to the pitch-shifted history.
    pub fn feedback_gain(&self) -> f64 {
        SHIMMER_GAIN * unit(self.shimmer_amount)
    }

    pub fn reverb_settings(&self) -> ReverbSettings {
        ReverbSettings {
            room_size: unit(self.room_size),
            damping: unit(1.0 - unit(self.tone)),
            wet: self.reverb_mix,
            dry: 0.0,
            width: DEFAULT_WIDTH,
            freeze: self.freeze,
        }
        .clamped()
    }
}

/// Stereo pre-delay in front of the reverberator.
#[derive(Debug, Clone)]
pub struct PreDelay {
    left: DelayLine,
    right: DelayLine,
    sample_rate: f64,
    delay_samples: f64,
}

impl PreDelay {
    pub fn new() -> Self {
        Self {
            left: DelayLine::new(0),
            right: DelayLine::new(0),
            sample_rate: 0.0,
            delay_samples: 0.0,
        }
    }

    /// Allocate room for [`MAX_PRE_DELAY_MS`] plus interpolation headroom.
    pub fn prepare(&mut self, config: &ProcessConfig) {
        let capacity = config.ms_to_samples(MAX_PRE_DELAY_MS) as usize + 2;
        self.left = DelayLine::new(capacity);
        self.right = DelayLine::new(capacity);
        self.sample_rate = config.sample_rate();
    }

    pub fn set_delay_ms(&mut self, ms: f64) {
        let ms = if ms.is_finite() { ms } else { 0.0 };
        let max = self.left.capacity().saturating_sub(2) as f64;
        self.delay_samples = (ms * self.sample_rate / 1000.0).clamp(0.0, max);
    }

    pub fn delay_samples(&self) -> f64 {
        self.delay_samples
    }

    pub fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    /// Delay both channels in place. Unprepared pre-delays pass through.
    pub fn process(&mut self, left: &mut [f64], right: &mut [f64]) {
        if !self.left.is_ready() {
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            self.left.write(*l);
            self.right.write(*r);
            *l = self.left.read_delayed(self.delay_samples);
            *r = self.right.read_delayed(self.delay_samples);
        }
    }
}

impl Default for PreDelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Pitch-shifted outer feedback loop around a [`Reverberator`].
pub struct ShimmerFeedbackStage<V: Reverberator = FreeverbReverb, R: RandomSource = Rng> {
    params: ShimmerParams,
    pitch_l: DualWindowPitchShifter,
    pitch_r: DualWindowPitchShifter,
    pre_delay: PreDelay,
    reverb: V,
    history: StereoBlock,
    scratch: StereoBlock,
    drift: DriftModulator,
    rng: R,
    max_block_size: usize,
    warned_unprepared: bool,
}

impl ShimmerFeedbackStage<FreeverbReverb, Rng> {
    pub fn new() -> Self {
        Self::with_parts(FreeverbReverb::new(), Rng::default())
    }
}

impl Default for ShimmerFeedbackStage<FreeverbReverb, Rng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Reverberator, R: RandomSource> ShimmerFeedbackStage<V, R> {
    pub fn with_parts(reverb: V, rng: R) -> Self {
        Self {
            params: ShimmerParams::default(),
            pitch_l: DualWindowPitchShifter::new(),
            pitch_r: DualWindowPitchShifter::new(),
            pre_delay: PreDelay::new(),
            reverb,
            history: StereoBlock::new(0),
            scratch: StereoBlock::new(0),
            drift: DriftModulator::new(),
            rng,
            max_block_size: 0,
            warned_unprepared: false,
        }
    }

    /// Size every buffer for `config` and silence the feedback history.
    pub fn prepare(&mut self, config: &ProcessConfig) {
        self.max_block_size = config.max_block_size();
        self.pitch_l.prepare(config);
        self.pitch_r.prepare(config);
        self.pre_delay.prepare(config);
        self.reverb.prepare(config.sample_rate());
        self.reverb.reset();
        self.history = StereoBlock::new(self.max_block_size);
        self.scratch = StereoBlock::new(self.max_block_size);
        self.drift.reset();
        self.warned_unprepared = false;

        log::debug!(
            "shimmer stage prepared: {} Hz, blocks up to {} samples",
            config.sample_rate(),
            self.max_block_size
        );
    }

    pub fn set_params(&mut self, params: ShimmerParams) {
        self.params = params;
    }

    pub fn params(&self) -> &ShimmerParams {
        &self.params
    }

    pub fn is_prepared(&self) -> bool {
        self.max_block_size > 0 && self.pitch_l.is_prepared()
    }

    /// Reverb output kept for the next block.
    pub fn history(&self) -> &StereoBlock {
        &self.history
    }

    pub fn reverberator(&self) -> &V {
        &self.reverb
    }

    /// Pitch factor currently applied to the left shifter.
    pub fn current_pitch_factor(&self) -> f64 {
        self.pitch_l.pitch_factor()
    }

    /// Run the feedback loop and the reverberator over `wet` in place.
    ///
    /// Blocks longer than the prepared maximum are split.
    pub fn process(&mut self, wet: &mut StereoBlock) {
        if !self.is_prepared() {
            if !self.warned_unprepared {
                log::warn!("shimmer stage processed before prepare; output left untouched");
                self.warned_unprepared = true;
            }
            return;
        }

        let max = self.max_block_size;
        let (left, right) = wet.channels_mut();
        let len = left.len().min(right.len());
        let (left, right) = (&mut left[..len], &mut right[..len]);
        for (l, r) in left.chunks_mut(max).zip(right.chunks_mut(max)) {
            self.process_chunk(l, r);
        }
    }

    fn process_chunk(&mut self, left: &mut [f64], right: &mut [f64]) {
        let n = left.len();
        let params = self.params;
        let drift = unit(params.drift);
        let depth = unit(params.mod_depth);
        let rate = if params.mod_rate_hz.is_finite() {
            params.mod_rate_hz.max(0.0)
        } else {
            0.0
        };

        for _ in 0..n {
            self.drift.advance(&mut self.rng, drift, rate);
        }
        let bend = semitones_to_ratio(self.drift.detune() * DRIFT_DETUNE_SEMITONES * drift * depth);
        let factor = params.pitch_factor() * bend;
        self.pitch_l.set_pitch_factor(factor);
        self.pitch_r.set_pitch_factor(factor);

        // last block's reverb output, shifted
        self.scratch.set_len(n);
        self.scratch.clear();
        self.scratch.left.copy_from_slice(self.history.left.as_slice());
        self.scratch.right.copy_from_slice(self.history.right.as_slice());
        self.pitch_l.process(self.scratch.left.as_mut_slice());
        self.pitch_r.process(self.scratch.right.as_mut_slice());

        let gain = params.feedback_gain();
        for (dst, src) in left.iter_mut().zip(self.scratch.left.as_slice()) {
            *dst += gain * src;
        }
        for (dst, src) in right.iter_mut().zip(self.scratch.right.as_slice()) {
            *dst += gain * src;
        }

        self.pre_delay.set_delay_ms(params.pre_delay_ms);
        self.pre_delay.process(left, right);

        self.reverb.set_settings(&params.reverb_settings());
        self.reverb.process_stereo(left, right);

        self.history.set_len(n);
        let (hist_l, hist_r) = self.history.channels_mut();
        for (dst, src) in hist_l.iter_mut().zip(left.iter()) {
            *dst = soft_clip(*src, HISTORY_KNEE);
        }
        for (dst, src) in hist_r.iter_mut().zip(right.iter()) {
            *dst = soft_clip(*src, HISTORY_KNEE);
        }
    }
}

/// Pass `x` unchanged below `threshold`, compress the excess above it.
///
/// The result never exceeds `threshold + 1`. Non-finite input gives silence.
#[inline]
fn soft_clip(x: f64, threshold: f64) -> f64 {
    if !x.is_finite() {
        0.0
    } else if x.abs() < threshold {
        x
    } else {
        let excess = x.abs() - threshold;
        x.signum() * (threshold + excess / (1.0 + excess))
    }
}

#[inline]
fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
