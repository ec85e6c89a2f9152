//! Granular Delay Engine
//!
//! A mono delay line feeds a cloud of short Hann-windowed grains. Grains are
//! scheduled by a fractional accumulator so the long-run spawn rate equals the
//! configured density no matter how the host slices its blocks. Each grain
//! picks a jittered, drifting read position behind the write head, a playback
//! rate (pitch plus a little detune) and a stereo pan, then plays through its
//! window once and disappears.
//!
//! The summed grain output also feeds back into the delay line, one sample
//! late: the mix computed for sample `n` is written together with the input of
//! sample `n + 1`.
//!
//! # Freeze
//!
//! While frozen the delay line is never written. The write head keeps moving,
//! so grains keep sampling the preserved history.

use crate::block::StereoBlock;
use crate::config::ProcessConfig;
use crate::delay_line::DelayLine;
use crate::drift::DriftModulator;
use crate::rng::{RandomSource, Rng};
use crate::window::hann;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

/// Seconds of history kept in the delay line.
pub const MAX_DELAY_SECONDS: f64 = 4.0;

/// Grain size limits in milliseconds.
pub const MIN_GRAIN_MS: f64 = 10.0;
pub const MAX_GRAIN_MS: f64 = 250.0;

/// Shortest grain in samples, whatever the sample rate.
pub const MIN_GRAIN_SAMPLES: usize = 8;

/// Highest feedback the parameter may request.
pub const MAX_FEEDBACK: f64 = 0.95;

/// Sustain gain while frozen.
pub const FREEZE_FEEDBACK: f64 = 0.985;

/// Per-grain random detune span in semitones, at full drift and depth.
const RANDOM_DETUNE_SEMITONES: f64 = 0.24;

/// Detune span contributed by the drift walk, in semitones.
const DRIFT_DETUNE_SEMITONES: f64 = 0.48;

/// Extra jitter contributed by drift, as a fraction of the grain length.
const DRIFT_JITTER: f64 = 0.2;

/// Read-position drift span as a fraction of the grain length, at full depth.
const DRIFT_READ_SPAN: f64 = 0.15;

/// Grain slots reserved up front.
const GRAIN_POOL_RESERVE: usize = 128;

/// Parameter snapshot for [`GranularDelay`].
///
/// Replaced wholesale between blocks; never touched mid-block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GranularParams {
    /// Linear gain applied to the input before it enters the delay line.
    pub input_gain: f64,
    pub delay_time_ms: f64,
    /// Feedback amount, 0..0.95.
    pub feedback: f64,
    pub grain_size_ms: f64,
    /// Grains spawned per second.
    pub density: f64,
    /// Read-position scatter as a fraction of the grain length.
    pub jitter: f64,
    pub pitch_semitones: f64,
    /// Stereo spread of grain pans, 0..1.
    pub spread: f64,
    pub drift: f64,
    pub mod_rate_hz: f64,
    pub mod_depth: f64,
    pub freeze: bool,
}

impl Default for GranularParams {
    fn default() -> Self {
        Self {
            input_gain: 1.0,
            delay_time_ms: 450.0,
            feedback: 0.35,
            grain_size_ms: 70.0,
            density: 8.0,
            jitter: 0.15,
            pitch_semitones: 0.0,
            spread: 0.35,
            drift: 0.25,
            mod_rate_hz: 0.35,
            mod_depth: 0.25,
            freeze: false,
        }
    }
}

impl GranularParams {
    /// Gain applied to the fed-back grain mix.
    pub fn effective_feedback(&self) -> f64 {
        if self.freeze {
            FREEZE_FEEDBACK
        } else {
            finite_or(self.feedback, 0.0).clamp(0.0, MAX_FEEDBACK)
        }
    }

    /// Grain length in samples at `sample_rate`.
    pub fn grain_length(&self, sample_rate: f64) -> usize {
        let ms = finite_or(self.grain_size_ms, MIN_GRAIN_MS).clamp(MIN_GRAIN_MS, MAX_GRAIN_MS);
        let samples = (ms * sample_rate / 1000.0).max(MIN_GRAIN_SAMPLES as f64);
        samples as usize
    }
}

new_key_type! {
    /// Stable handle of a grain in the active pool.
    pub struct GrainKey;
}

/// One in-flight grain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grain {
    /// Samples played so far.
    pub age: usize,
    /// Total lifetime in samples.
    pub length: usize,
    /// Fractional read position in the delay line.
    pub read_pos: f64,
    /// Read position advance per output sample.
    pub read_inc: f64,
    pub pan_l: f64,
    pub pan_r: f64,
}

impl Grain {
    /// Envelope value for the sample about to be played.
    #[inline]
    pub fn envelope(&self) -> f64 {
        hann(self.age, self.length)
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.age >= self.length
    }
}

/// Per-block constants derived from a [`GranularParams`] snapshot.
///
/// Every parameter is clamped here, at the point of use.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BlockSettings {
    input_gain: f64,
    base_delay: f64,
    base_pitch: f64,
    spawn_step: f64,
    grain_length: usize,
    jitter_span: f64,
    drift_read_span: f64,
    random_detune: f64,
    drift_detune: f64,
    spread: f64,
    feedback: f64,
    drift: f64,
    mod_rate: f64,
    freeze: bool,
}

impl BlockSettings {
    fn derive(params: &GranularParams, sample_rate: f64, capacity: usize) -> Self {
        let drift = finite_or(params.drift, 0.0).clamp(0.0, 1.0);
        let depth = finite_or(params.mod_depth, 0.0).clamp(0.0, 1.0);
        let jitter = finite_or(params.jitter, 0.0).clamp(0.0, 1.0);
        let grain_length = params.grain_length(sample_rate);
        let grain = grain_length as f64;

        let max_delay = capacity.saturating_sub(1) as f64;
        let base_delay =
            (finite_or(params.delay_time_ms, 0.0) * sample_rate / 1000.0).clamp(0.0, max_delay);

        Self {
            input_gain: finite_or(params.input_gain, 0.0).max(0.0),
            base_delay,
            base_pitch: semitones_to_ratio(finite_or(params.pitch_semitones, 0.0)),
            spawn_step: finite_or(params.density, 0.0).max(0.0) / sample_rate,
            grain_length,
            jitter_span: (jitter + DRIFT_JITTER * drift) * grain,
            drift_read_span: depth * DRIFT_READ_SPAN * grain,
            random_detune: RANDOM_DETUNE_SEMITONES * drift * depth,
            drift_detune: DRIFT_DETUNE_SEMITONES * drift * depth,
            spread: finite_or(params.spread, 0.0).clamp(0.0, 1.0),
            feedback: params.effective_feedback(),
            drift,
            mod_rate: finite_or(params.mod_rate_hz, 0.0).max(0.0),
            freeze: params.freeze,
        }
    }
}

/// Stochastic granular delay.
///
/// Generic over its random source so tests can pin the grain stream.
pub struct GranularDelay<R: RandomSource = Rng> {
    sample_rate: f64,
    params: GranularParams,
    delay: DelayLine,
    drift: DriftModulator,
    grains: SlotMap<GrainKey, Grain>,
    spawn_accumulator: f64,
    feedback_sample: f64,
    grains_spawned: u64,
    rng: R,
    warned_unprepared: bool,
}

impl GranularDelay<Rng> {
    /// Create an engine seeded from entropy. Call [`prepare`](Self::prepare)
    /// before processing.
    pub fn new() -> Self {
        Self::with_rng(Rng::default())
    }
}

impl Default for GranularDelay<Rng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RandomSource> GranularDelay<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            sample_rate: 0.0,
            params: GranularParams::default(),
            delay: DelayLine::new(0),
            drift: DriftModulator::new(),
            grains: SlotMap::with_capacity_and_key(GRAIN_POOL_RESERVE),
            spawn_accumulator: 0.0,
            feedback_sample: 0.0,
            grains_spawned: 0,
            rng,
            warned_unprepared: false,
        }
    }

    /// Allocate the delay line for `config` and reset all state to silence.
    pub fn prepare(&mut self, config: &ProcessConfig) {
        self.sample_rate = config.sample_rate();
        self.delay = DelayLine::with_duration(self.sample_rate, MAX_DELAY_SECONDS);
        self.grains.clear();
        self.drift.reset();
        self.spawn_accumulator = 0.0;
        self.feedback_sample = 0.0;
        self.grains_spawned = 0;
        self.warned_unprepared = false;

        log::debug!(
            "granular delay prepared: {} Hz, {} sample history",
            self.sample_rate,
            self.delay.capacity()
        );
    }

    /// Replace the parameter snapshot used from the next block on.
    pub fn set_params(&mut self, params: GranularParams) {
        self.params = params;
    }

    pub fn params(&self) -> &GranularParams {
        &self.params
    }

    pub fn is_prepared(&self) -> bool {
        self.delay.is_ready() && self.sample_rate > 0.0
    }

    /// Grains currently playing.
    pub fn active_grains(&self) -> usize {
        self.grains.len()
    }

    pub fn grains(&self) -> impl Iterator<Item = &Grain> {
        self.grains.values()
    }

    /// Grains spawned since the last [`prepare`](Self::prepare).
    pub fn grains_spawned(&self) -> u64 {
        self.grains_spawned
    }

    pub fn delay_line(&self) -> &DelayLine {
        &self.delay
    }

    /// Current drift walk state.
    pub fn drift(&self) -> &DriftModulator {
        &self.drift
    }

    /// Render one block: read stereo `dry`, write stereo `wet`.
    ///
    /// `dry` is never modified. Processes `min(dry.len(), wet.len())` samples.
    /// Does nothing until the engine has been prepared.
    pub fn process(&mut self, dry: &StereoBlock, wet: &mut StereoBlock) {
        if !self.is_prepared() {
            if !self.warned_unprepared {
                log::warn!("granular delay processed before prepare; output left untouched");
                self.warned_unprepared = true;
            }
            return;
        }

        let settings = BlockSettings::derive(&self.params, self.sample_rate, self.delay.capacity());
        let (dry_l, dry_r) = (dry.left.as_slice(), dry.right.as_slice());
        let (wet_l, wet_r) = wet.channels_mut();
        let frames = dry_l.len().min(dry_r.len()).min(wet_l.len()).min(wet_r.len());

        for i in 0..frames {
            self.drift.advance(&mut self.rng, settings.drift, settings.mod_rate);

            let mono = 0.5 * (dry_l[i] + dry_r[i]) * settings.input_gain;
            let head = self.delay.write_position() as f64;
            if settings.freeze {
                self.delay.advance();
            } else {
                self.delay.write(mono + self.feedback_sample * settings.feedback);
            }

            self.spawn_accumulator += settings.spawn_step;
            while self.spawn_accumulator >= 1.0 {
                self.spawn_accumulator -= 1.0;
                self.spawn_grain(head, &settings);
            }

            let (out_l, out_r) = self.mix_grains();
            wet_l[i] = out_l;
            wet_r[i] = out_r;
        }
    }

    /// Create one grain reading behind `head`.
    ///
    /// Draws three random values: jitter, detune, pan.
    fn spawn_grain(&mut self, head: f64, settings: &BlockSettings) {
        let jitter = self.rng.next_bipolar() * settings.jitter_span;
        let drift_offset = self.drift.read_offset() * settings.drift_read_span;
        let read_pos = self.delay.wrap(head - settings.base_delay + jitter + drift_offset);

        let detune = self.rng.next_bipolar() * settings.random_detune
            + self.drift.detune() * settings.drift_detune;
        let read_inc = settings.base_pitch * semitones_to_ratio(detune);

        let pan = self.rng.next_bipolar() * settings.spread;

        self.grains.insert(Grain {
            age: 0,
            length: settings.grain_length,
            read_pos,
            read_inc,
            pan_l: (0.5 - 0.5 * pan).clamp(0.0, 1.0),
            pan_r: (0.5 + 0.5 * pan).clamp(0.0, 1.0),
        });
        self.grains_spawned += 1;
    }

    /// Advance every grain by one sample and return the stereo mix.
    ///
    /// Also stores half the windowed mono sum as the feedback sample for the
    /// next write. Grains leave the pool the moment their age reaches their
    /// length.
    fn mix_grains(&mut self) -> (f64, f64) {
        let delay = &self.delay;
        let mut out_l = 0.0;
        let mut out_r = 0.0;
        let mut feedback = 0.0;

        self.grains.retain(|_, grain| {
            if grain.is_finished() {
                return false;
            }
            let v = delay.read_fractional(grain.read_pos) * grain.envelope();
            out_l += v * grain.pan_l;
            out_r += v * grain.pan_r;
            feedback += 0.5 * v;

            grain.read_pos = delay.wrap(grain.read_pos + grain.read_inc);
            grain.age += 1;
            !grain.is_finished()
        });

        self.feedback_sample = feedback;
        (out_l, out_r)
    }
}

/// Semitone offset to playback ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    libm::exp2(semitones / 12.0)
}

#[inline]
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
