//! The complete effect: granular delay into the shimmer reverb, mixed with the
//! dry signal.

use crate::block::StereoBlock;
use crate::config::ProcessConfig;
use crate::error::Result;
use crate::granular::GranularDelay;
use crate::params::{EngineParams, ParamSet, SharedParams};
use crate::reverb::{FreeverbReverb, Reverberator};
use crate::rng::{RandomSource, Rng};
use crate::shimmer::ShimmerFeedbackStage;

/// Reported tail length; frozen or high-feedback settings ring longer.
pub const TAIL_SECONDS: f64 = 20.0;

/// Stereo granular shimmer delay.
///
/// Call [`prepare`](Self::prepare) before processing and whenever the sample
/// rate or maximum block size changes. Until then, [`process`](Self::process)
/// leaves its buffers untouched.
pub struct StarlightDrift<V: Reverberator = FreeverbReverb, R: RandomSource = Rng> {
    config: Option<ProcessConfig>,
    params: ParamSet,
    granular: GranularDelay<R>,
    shimmer: ShimmerFeedbackStage<V, R>,
    dry: StereoBlock,
    wet: StereoBlock,
    warned_unprepared: bool,
}

impl StarlightDrift<FreeverbReverb, Rng> {
    /// Create a processor with entropy-seeded randomness and the freeverb tail.
    pub fn new() -> Self {
        Self::with_parts(FreeverbReverb::new(), Rng::default(), Rng::default())
    }
}

impl Default for StarlightDrift<FreeverbReverb, Rng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Reverberator, R: RandomSource> StarlightDrift<V, R> {
    /// Build from a reverberator and one random source per engine.
    pub fn with_parts(reverb: V, granular_rng: R, shimmer_rng: R) -> Self {
        Self {
            config: None,
            params: ParamSet::default(),
            granular: GranularDelay::with_rng(granular_rng),
            shimmer: ShimmerFeedbackStage::with_parts(reverb, shimmer_rng),
            dry: StereoBlock::new(0),
            wet: StereoBlock::new(0),
            warned_unprepared: false,
        }
    }

    /// Allocate every buffer and reset all state to silence.
    ///
    /// # Errors
    /// Rejects non-positive or non-finite sample rates and empty blocks; the
    /// processor keeps its previous configuration in that case.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        let config = ProcessConfig::new(sample_rate, max_block_size)?;
        self.granular.prepare(&config);
        self.shimmer.prepare(&config);
        self.dry = StereoBlock::new(max_block_size);
        self.wet = StereoBlock::new(max_block_size);
        self.config = Some(config);
        self.warned_unprepared = false;

        log::info!(
            "prepared at {} Hz, max block {} samples",
            sample_rate,
            max_block_size
        );
        Ok(())
    }

    /// Clear all delay lines, grains and reverb tails.
    pub fn reset(&mut self) {
        if let Some(config) = self.config {
            self.granular.prepare(&config);
            self.shimmer.prepare(&config);
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&ProcessConfig> {
        self.config.as_ref()
    }

    /// Replace the parameter snapshot used from the next block on.
    pub fn set_params(&mut self, params: ParamSet) {
        self.params = params.clamped();
    }

    /// Pick up the latest snapshot published on `shared`.
    pub fn sync(&mut self, shared: &SharedParams) {
        self.params = shared.snapshot();
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn granular(&self) -> &GranularDelay<R> {
        &self.granular
    }

    pub fn shimmer(&self) -> &ShimmerFeedbackStage<V, R> {
        &self.shimmer
    }

    pub fn tail_seconds(&self) -> f64 {
        TAIL_SECONDS
    }

    pub fn latency_samples(&self) -> usize {
        0
    }

    /// Process a stereo block in place.
    ///
    /// Parameters are sampled once for the whole call. Blocks longer than the
    /// prepared maximum are split internally.
    pub fn process(&mut self, left: &mut [f64], right: &mut [f64]) {
        let Some(max) = self.max_block_size() else {
            return;
        };
        let engine = self.begin_block();

        let len = left.len().min(right.len());
        for (l, r) in left[..len].chunks_mut(max).zip(right[..len].chunks_mut(max)) {
            self.dry.set_len(l.len());
            self.dry.left.copy_from_slice(l);
            self.dry.right.copy_from_slice(r);

            self.render(&engine);

            l.copy_from_slice(self.wet.left.as_slice());
            r.copy_from_slice(self.wet.right.as_slice());
        }
    }

    /// Process a mono block in place: the input feeds both channels and the
    /// stereo result is folded back down.
    pub fn process_mono(&mut self, samples: &mut [f64]) {
        let Some(max) = self.max_block_size() else {
            return;
        };
        let engine = self.begin_block();

        for chunk in samples.chunks_mut(max) {
            self.dry.set_len(chunk.len());
            self.dry.left.copy_from_slice(chunk);
            self.dry.right.copy_from_slice(chunk);

            self.render(&engine);

            let (l, r) = (self.wet.left.as_slice(), self.wet.right.as_slice());
            for ((out, a), b) in chunk.iter_mut().zip(l).zip(r) {
                *out = 0.5 * (a + b);
            }
        }
    }

    fn max_block_size(&mut self) -> Option<usize> {
        match self.config {
            Some(config) => Some(config.max_block_size()),
            None => {
                if !self.warned_unprepared {
                    log::warn!("process called before prepare; audio passed through untouched");
                    self.warned_unprepared = true;
                }
                None
            }
        }
    }

    fn begin_block(&mut self) -> EngineParams {
        let engine = self.params.engine_params();
        self.granular.set_params(engine.granular);
        self.shimmer.set_params(engine.shimmer);
        engine
    }

    /// Run both engines over `self.dry` and leave the mixed output in
    /// `self.wet`.
    fn render(&mut self, engine: &EngineParams) {
        self.wet.set_len(self.dry.len());
        self.wet.clear();
        self.granular.process(&self.dry, &mut self.wet);
        self.shimmer.process(&mut self.wet);

        let mix = engine.mix;
        let (wet_l, wet_r) = self.wet.channels_mut();
        for (w, d) in wet_l.iter_mut().zip(self.dry.left.as_slice()) {
            *w = (1.0 - mix) * d + mix * *w;
        }
        for (w, d) in wet_r.iter_mut().zip(self.dry.right.as_slice()) {
            *w = (1.0 - mix) * d + mix * *w;
        }
        self.wet.left.mul_scalar(engine.output_gain);
        self.wet.right.mul_scalar(engine.output_gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::params::{db_to_gain, ParamId};
    use crate::reverb::ReverbSettings;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct PassThrough;

    impl Reverberator for PassThrough {
        fn prepare(&mut self, _sample_rate: f64) {}
        fn set_settings(&mut self, _settings: &ReverbSettings) {}
        fn process_stereo(&mut self, _left: &mut [f64], _right: &mut [f64]) {}
        fn reset(&mut self) {}
    }

    const SR: f64 = 48000.0;

    fn processor(max_block: usize) -> StarlightDrift<PassThrough, Rng> {
        let mut fx = StarlightDrift::with_parts(PassThrough, Rng::from_seed(1), Rng::from_seed(2));
        fx.prepare(SR, max_block).unwrap();
        fx
    }

    /// Dry grains only: no shimmer, no pre-delay, no wandering.
    fn plain_echo() -> ParamSet {
        ParamSet::default()
            .with(ParamId::ShimmerAmount, 0.0)
            .with(ParamId::PreDelayMs, 0.0)
            .with(ParamId::Drift, 0.0)
            .with(ParamId::Jitter, 0.0)
            .with(ParamId::Spread, 0.0)
            .with(ParamId::Feedback, 0.0)
    }

    #[test]
    fn test_prepare_validates() {
        let mut fx = StarlightDrift::with_parts(PassThrough, Rng::from_seed(1), Rng::from_seed(2));
        assert!(matches!(fx.prepare(0.0, 512), Err(Error::InvalidSampleRate(_))));
        assert!(matches!(fx.prepare(SR, 0), Err(Error::InvalidBlockSize(0))));
        assert!(!fx.is_prepared());

        fx.prepare(SR, 512).unwrap();
        assert!(fx.is_prepared());
        assert_eq!(fx.config().unwrap().max_block_size(), 512);
        assert!(fx.prepare(-1.0, 512).is_err());
        assert_eq!(fx.config().unwrap().sample_rate(), SR);
    }

    #[test]
    fn test_unprepared_passes_audio_through() {
        let mut fx = StarlightDrift::with_parts(PassThrough, Rng::from_seed(1), Rng::from_seed(2));
        let mut left = vec![0.3; 64];
        let mut right = vec![-0.3; 64];
        fx.process(&mut left, &mut right);
        assert!(left.iter().all(|&s| s == 0.3));
        assert!(right.iter().all(|&s| s == -0.3));
    }

    #[test]
    fn test_fully_dry_mix_applies_only_output_gain() {
        let mut fx = processor(256);
        fx.set_params(
            ParamSet::default()
                .with(ParamId::Mix, 0.0)
                .with(ParamId::OutputGainDb, 6.0),
        );
        let input: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.01).sin()).collect();
        let mut left = input.clone();
        let mut right = input.clone();
        fx.process(&mut left, &mut right);

        let gain = db_to_gain(6.0);
        for (out, x) in left.iter().zip(&input) {
            assert_relative_eq!(*out, x * gain, epsilon = 1e-12);
        }
        assert_eq!(left, right);
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut fx = processor(512);
        fx.set_params(plain_echo());
        let mut left = vec![0.0; 4096];
        let mut right = vec![0.0; 4096];
        for _ in 0..20 {
            fx.process(&mut left, &mut right);
            assert!(left.iter().chain(&right).all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_impulse_returns_after_the_delay_time() {
        let mut fx = processor(256);
        fx.set_params(
            plain_echo()
                .with(ParamId::DelayTimeMs, 100.0)
                .with(ParamId::GrainSizeMs, 250.0)
                .with(ParamId::Density, 40.0),
        );

        let len = 9600;
        let mut left = vec![0.0; len];
        let mut right = vec![0.0; len];
        left[0] = 1.0;
        right[0] = 1.0;
        fx.process(&mut left, &mut right);

        let delay = 4800;
        assert!(left[..delay].iter().all(|&s| s == 0.0));
        assert!(left[delay] > 0.0);
        assert!(left[delay + 1..].iter().all(|&s| s == 0.0));
        assert_eq!(left, right);
    }

    #[test]
    fn test_process_mono_folds_down() {
        let mut fx = processor(128);
        fx.set_params(ParamSet::default().with(ParamId::Mix, 0.0));
        let input: Vec<f64> = (0..500).map(|i| i as f64 / 500.0).collect();
        let mut samples = input.clone();
        fx.process_mono(&mut samples);
        for (out, x) in samples.iter().zip(&input) {
            assert_relative_eq!(*out, *x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_params_are_clamped_and_synced() {
        let mut fx = processor(64);
        fx.set_params(ParamSet {
            mix: 7.0,
            ..ParamSet::default()
        });
        assert_eq!(fx.params().mix, 1.0);

        let shared = SharedParams::default();
        shared.set(ParamId::Freeze, 1.0);
        fx.sync(&shared);
        assert!(fx.params().freeze);

        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        fx.process(&mut left, &mut right);
        assert!(fx.granular().params().freeze);
        assert!(fx.shimmer().params().freeze);
    }

    #[test]
    fn test_macros_reach_the_engines() {
        let mut fx = processor(64);
        fx.set_params(ParamSet::default().with(ParamId::Glass, 1.0));
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        fx.process(&mut left, &mut right);
        assert_eq!(fx.shimmer().params().pitch_semitones, 24.0);
        assert_eq!(fx.granular().params().pitch_semitones, 2.0);
    }

    #[test]
    fn test_reporting() {
        let fx = processor(64);
        assert_eq!(fx.tail_seconds(), 20.0);
        assert_eq!(fx.latency_samples(), 0);
    }

    #[test]
    fn test_same_seeds_same_output() {
        let render = || {
            let mut fx = StarlightDrift::with_parts(
                FreeverbReverb::new(),
                Rng::from_seed(5),
                Rng::from_seed(6),
            );
            fx.prepare(44100.0, 512).unwrap();
            let mut source = Rng::from_seed(7);
            let mut out = Vec::new();
            for _ in 0..40 {
                let mut left: Vec<f64> = (0..512).map(|_| source.next_bipolar()).collect();
                let mut right = left.clone();
                fx.process(&mut left, &mut right);
                out.extend(left);
            }
            out
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_noise_through_full_chain_stays_bounded() {
        let mut fx =
            StarlightDrift::with_parts(FreeverbReverb::new(), Rng::from_seed(8), Rng::from_seed(9));
        fx.prepare(SR, 512).unwrap();
        fx.set_params(
            ParamSet::default()
                .with(ParamId::Feedback, 0.95)
                .with(ParamId::ShimmerAmount, 1.0)
                .with(ParamId::ReverbSize, 1.0),
        );

        let mut source = Rng::from_seed(10);
        let blocks = (10.0 * SR) as usize / 512;
        for _ in 0..blocks {
            let mut left: Vec<f64> = (0..512).map(|_| source.next_bipolar()).collect();
            let mut right: Vec<f64> = (0..512).map(|_| source.next_bipolar()).collect();
            fx.process(&mut left, &mut right);
            assert!(left.iter().chain(&right).all(|s| s.is_finite() && s.abs() < 100.0));
        }
    }
}
