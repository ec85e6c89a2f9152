//! Parameters
//!
//! The host-facing parameter layout, the `air`/`glass` macro controls and the
//! per-block derivation of engine snapshots.
//!
//! A [`ParamSet`] is a plain value. The control thread edits its own copy and
//! publishes whole snapshots through [`SharedParams`]; the audio thread loads
//! one snapshot per block and never sees a half-written set.

use crate::granular::GranularParams;
use crate::shimmer::{ShimmerInterval, ShimmerParams};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifies one host parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamId {
    InputGainDb,
    DelayTimeMs,
    Feedback,
    GrainSizeMs,
    Density,
    Jitter,
    PitchSemitones,
    Spread,
    ReverbSize,
    PreDelayMs,
    Tone,
    ShimmerAmount,
    ShimmerInterval,
    ReverbMix,
    Mix,
    OutputGainDb,
    Drift,
    ModRateHz,
    ModDepth,
    Freeze,
    Air,
    Glass,
}

impl ParamId {
    pub const ALL: [ParamId; 22] = [
        ParamId::InputGainDb,
        ParamId::DelayTimeMs,
        ParamId::Feedback,
        ParamId::GrainSizeMs,
        ParamId::Density,
        ParamId::Jitter,
        ParamId::PitchSemitones,
        ParamId::Spread,
        ParamId::ReverbSize,
        ParamId::PreDelayMs,
        ParamId::Tone,
        ParamId::ShimmerAmount,
        ParamId::ShimmerInterval,
        ParamId::ReverbMix,
        ParamId::Mix,
        ParamId::OutputGainDb,
        ParamId::Drift,
        ParamId::ModRateHz,
        ParamId::ModDepth,
        ParamId::Freeze,
        ParamId::Air,
        ParamId::Glass,
    ];

    /// Position in [`PARAMS`] and [`ParamId::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn def(self) -> &'static ParamDef {
        &PARAMS[self.index()]
    }

    /// Stable string id, as used in preset files.
    pub fn key(self) -> &'static str {
        self.def().key
    }

    /// Look up a parameter by its string id.
    pub fn from_key(key: &str) -> Option<Self> {
        PARAMS.iter().find(|def| def.key == key).map(|def| def.id)
    }

    /// Whether the macro controls respect a lock on this parameter.
    pub fn is_macro_target(self) -> bool {
        matches!(
            self,
            ParamId::Density
                | ParamId::Tone
                | ParamId::ShimmerAmount
                | ParamId::GrainSizeMs
                | ParamId::Spread
                | ParamId::PitchSemitones
        )
    }
}

/// How a parameter's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Continuous,
    /// Integer index into the listed labels.
    Choice(&'static [&'static str]),
    /// Off below 0.5, on from 0.5.
    Toggle,
}

/// Static description of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDef {
    pub id: ParamId,
    pub key: &'static str,
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub unit: &'static str,
    pub kind: ParamKind,
}

impl ParamDef {
    const fn continuous(
        id: ParamId,
        key: &'static str,
        name: &'static str,
        min: f64,
        max: f64,
        default: f64,
        unit: &'static str,
    ) -> Self {
        Self {
            id,
            key,
            name,
            min,
            max,
            default,
            unit,
            kind: ParamKind::Continuous,
        }
    }

    /// Force `value` into range. Non-finite values fall back to the default.
    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.default;
        }
        match self.kind {
            ParamKind::Continuous => value.clamp(self.min, self.max),
            ParamKind::Choice(_) => value.round().clamp(self.min, self.max),
            ParamKind::Toggle => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Map a value to 0..1 across the range.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        (self.clamp(value) - self.min) / span
    }

    /// Map 0..1 back into the range.
    pub fn denormalize(&self, normalized: f64) -> f64 {
        let n = if normalized.is_finite() {
            normalized.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.clamp(self.min + n * (self.max - self.min))
    }
}

const INTERVAL_LABELS: &[&str] = &["+5", "+7", "+12", "+24"];

/// Every parameter, in [`ParamId`] order.
pub static PARAMS: [ParamDef; 22] = [
    ParamDef::continuous(
        ParamId::InputGainDb,
        "input_gain_db",
        "Input Gain",
        -24.0,
        24.0,
        0.0,
        "dB",
    ),
    ParamDef::continuous(
        ParamId::DelayTimeMs,
        "delay_time_ms",
        "Delay Time",
        1.0,
        2000.0,
        450.0,
        "ms",
    ),
    ParamDef::continuous(ParamId::Feedback, "feedback", "Feedback", 0.0, 0.95, 0.35, ""),
    ParamDef::continuous(
        ParamId::GrainSizeMs,
        "grain_size_ms",
        "Grain Size",
        10.0,
        250.0,
        70.0,
        "ms",
    ),
    ParamDef::continuous(ParamId::Density, "density", "Density", 0.2, 40.0, 40.0, "grains/s"),
    ParamDef::continuous(ParamId::Jitter, "jitter", "Jitter", 0.0, 1.0, 0.15, ""),
    ParamDef::continuous(
        ParamId::PitchSemitones,
        "pitch_semitones",
        "Pitch",
        -12.0,
        12.0,
        0.0,
        "st",
    ),
    ParamDef::continuous(ParamId::Spread, "spread", "Spread", 0.0, 1.0, 0.35, ""),
    ParamDef::continuous(ParamId::ReverbSize, "reverb_size", "Reverb Size", 0.0, 1.0, 0.55, ""),
    ParamDef::continuous(ParamId::PreDelayMs, "pre_delay_ms", "Pre-Delay", 0.0, 250.0, 20.0, "ms"),
    ParamDef::continuous(ParamId::Tone, "tone", "Tone", 0.0, 1.0, 0.55, ""),
    ParamDef::continuous(ParamId::ShimmerAmount, "shimmer_amount", "Shimmer", 0.0, 1.0, 0.25, ""),
    ParamDef {
        id: ParamId::ShimmerInterval,
        key: "shimmer_interval",
        name: "Shimmer Pitch",
        min: 0.0,
        max: 3.0,
        default: 2.0,
        unit: "",
        kind: ParamKind::Choice(INTERVAL_LABELS),
    },
    ParamDef::continuous(ParamId::ReverbMix, "reverb_mix", "Reverb Mix", 0.0, 1.0, 1.0, ""),
    ParamDef::continuous(ParamId::Mix, "mix", "Mix", 0.0, 1.0, 1.0, ""),
    ParamDef::continuous(
        ParamId::OutputGainDb,
        "output_gain_db",
        "Output Gain",
        -24.0,
        24.0,
        0.0,
        "dB",
    ),
    ParamDef::continuous(ParamId::Drift, "drift", "Drift", 0.0, 1.0, 0.25, ""),
    ParamDef::continuous(ParamId::ModRateHz, "mod_rate_hz", "Mod Rate", 0.01, 4.0, 0.35, "Hz"),
    ParamDef::continuous(ParamId::ModDepth, "mod_depth", "Mod Depth", 0.0, 1.0, 0.25, ""),
    ParamDef {
        id: ParamId::Freeze,
        key: "freeze",
        name: "Freeze",
        min: 0.0,
        max: 1.0,
        default: 0.0,
        unit: "",
        kind: ParamKind::Toggle,
    },
    ParamDef::continuous(ParamId::Air, "air", "Air", 0.0, 1.0, 0.0, ""),
    ParamDef::continuous(ParamId::Glass, "glass", "Glass", 0.0, 1.0, 0.0, ""),
];

/// Parameters shielded from the macro controls.
///
/// Session state only; never written to presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamLocks(u32);

impl ParamLocks {
    pub fn none() -> Self {
        Self(0)
    }

    pub fn is_locked(&self, id: ParamId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    pub fn set(&mut self, id: ParamId, locked: bool) {
        if locked {
            self.0 |= 1 << id.index();
        } else {
            self.0 &= !(1 << id.index());
        }
    }

    pub fn lock(mut self, id: ParamId) -> Self {
        self.set(id, true);
        self
    }

    pub fn toggle(&mut self, id: ParamId) {
        self.0 ^= 1 << id.index();
    }

    pub fn locked(&self) -> impl Iterator<Item = ParamId> + '_ {
        ParamId::ALL
            .into_iter()
            .filter(move |id| self.is_locked(*id))
    }
}

/// Complete host parameter snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamSet {
    pub input_gain_db: f64,
    pub delay_time_ms: f64,
    pub feedback: f64,
    pub grain_size_ms: f64,
    pub density: f64,
    pub jitter: f64,
    pub pitch_semitones: f64,
    pub spread: f64,
    pub reverb_size: f64,
    pub pre_delay_ms: f64,
    pub tone: f64,
    pub shimmer_amount: f64,
    pub shimmer_interval: ShimmerInterval,
    pub reverb_mix: f64,
    pub mix: f64,
    pub output_gain_db: f64,
    pub drift: f64,
    pub mod_rate_hz: f64,
    pub mod_depth: f64,
    pub freeze: bool,
    pub air: f64,
    pub glass: f64,
    #[serde(skip)]
    pub locks: ParamLocks,
}

impl Default for ParamSet {
    fn default() -> Self {
        let mut params = Self {
            input_gain_db: 0.0,
            delay_time_ms: 0.0,
            feedback: 0.0,
            grain_size_ms: 0.0,
            density: 0.0,
            jitter: 0.0,
            pitch_semitones: 0.0,
            spread: 0.0,
            reverb_size: 0.0,
            pre_delay_ms: 0.0,
            tone: 0.0,
            shimmer_amount: 0.0,
            shimmer_interval: ShimmerInterval::default(),
            reverb_mix: 0.0,
            mix: 0.0,
            output_gain_db: 0.0,
            drift: 0.0,
            mod_rate_hz: 0.0,
            mod_depth: 0.0,
            freeze: false,
            air: 0.0,
            glass: 0.0,
            locks: ParamLocks::none(),
        };
        for def in PARAMS.iter() {
            params.set(def.id, def.default);
        }
        params
    }
}

/// Engine snapshots derived from one [`ParamSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    pub granular: GranularParams,
    pub shimmer: ShimmerParams,
    /// Dry/wet balance, 0 is fully dry.
    pub mix: f64,
    /// Linear output gain.
    pub output_gain: f64,
}

impl ParamSet {
    /// Read a parameter as a plain number.
    pub fn get(&self, id: ParamId) -> f64 {
        match id {
            ParamId::InputGainDb => self.input_gain_db,
            ParamId::DelayTimeMs => self.delay_time_ms,
            ParamId::Feedback => self.feedback,
            ParamId::GrainSizeMs => self.grain_size_ms,
            ParamId::Density => self.density,
            ParamId::Jitter => self.jitter,
            ParamId::PitchSemitones => self.pitch_semitones,
            ParamId::Spread => self.spread,
            ParamId::ReverbSize => self.reverb_size,
            ParamId::PreDelayMs => self.pre_delay_ms,
            ParamId::Tone => self.tone,
            ParamId::ShimmerAmount => self.shimmer_amount,
            ParamId::ShimmerInterval => self.shimmer_interval.index() as f64,
            ParamId::ReverbMix => self.reverb_mix,
            ParamId::Mix => self.mix,
            ParamId::OutputGainDb => self.output_gain_db,
            ParamId::Drift => self.drift,
            ParamId::ModRateHz => self.mod_rate_hz,
            ParamId::ModDepth => self.mod_depth,
            ParamId::Freeze => {
                if self.freeze {
                    1.0
                } else {
                    0.0
                }
            }
            ParamId::Air => self.air,
            ParamId::Glass => self.glass,
        }
    }

    /// Write a parameter, clamped into its range.
    pub fn set(&mut self, id: ParamId, value: f64) {
        let value = id.def().clamp(value);
        match id {
            ParamId::InputGainDb => self.input_gain_db = value,
            ParamId::DelayTimeMs => self.delay_time_ms = value,
            ParamId::Feedback => self.feedback = value,
            ParamId::GrainSizeMs => self.grain_size_ms = value,
            ParamId::Density => self.density = value,
            ParamId::Jitter => self.jitter = value,
            ParamId::PitchSemitones => self.pitch_semitones = value,
            ParamId::Spread => self.spread = value,
            ParamId::ReverbSize => self.reverb_size = value,
            ParamId::PreDelayMs => self.pre_delay_ms = value,
            ParamId::Tone => self.tone = value,
            ParamId::ShimmerAmount => self.shimmer_amount = value,
            ParamId::ShimmerInterval => {
                self.shimmer_interval =
                    ShimmerInterval::from_index(value as usize).unwrap_or_default()
            }
            ParamId::ReverbMix => self.reverb_mix = value,
            ParamId::Mix => self.mix = value,
            ParamId::OutputGainDb => self.output_gain_db = value,
            ParamId::Drift => self.drift = value,
            ParamId::ModRateHz => self.mod_rate_hz = value,
            ParamId::ModDepth => self.mod_depth = value,
            ParamId::Freeze => self.freeze = value >= 0.5,
            ParamId::Air => self.air = value,
            ParamId::Glass => self.glass = value,
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, id: ParamId, value: f64) -> Self {
        self.set(id, value);
        self
    }

    /// Copy with every value forced into its range.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for id in ParamId::ALL {
            out.set(id, self.get(id));
        }
        out
    }

    pub fn is_locked(&self, id: ParamId) -> bool {
        self.locks.is_locked(id)
    }

    /// Derive the engine snapshots for one block, applying the macros to
    /// every unlocked target.
    pub fn engine_params(&self) -> EngineParams {
        let p = self.clamped();
        let (air, glass) = (p.air, p.glass);
        let unlocked = |id: ParamId| !p.locks.is_locked(id);

        let density = if unlocked(ParamId::Density) {
            p.density * (1.0 + 0.8 * air)
        } else {
            p.density
        };
        let tone = if unlocked(ParamId::Tone) {
            (p.tone + 0.25 * air).clamp(0.0, 1.0)
        } else {
            p.tone
        };
        let shimmer_amount = if unlocked(ParamId::ShimmerAmount) {
            (p.shimmer_amount + 0.35 * air).clamp(0.0, 1.0)
        } else {
            p.shimmer_amount
        };
        let grain_size_ms = if unlocked(ParamId::GrainSizeMs) {
            p.grain_size_ms * (1.0 - 0.35 * glass)
        } else {
            p.grain_size_ms
        };
        let spread = if unlocked(ParamId::Spread) {
            (p.spread + 0.5 * glass).clamp(0.0, 1.0)
        } else {
            p.spread
        };
        let pitch_semitones = if unlocked(ParamId::PitchSemitones) {
            p.pitch_semitones + 2.0 * glass
        } else {
            p.pitch_semitones
        };

        let granular = GranularParams {
            input_gain: db_to_gain(p.input_gain_db),
            delay_time_ms: p.delay_time_ms,
            feedback: p.feedback,
            grain_size_ms,
            density,
            jitter: p.jitter,
            pitch_semitones,
            spread,
            drift: p.drift,
            mod_rate_hz: p.mod_rate_hz,
            mod_depth: p.mod_depth,
            freeze: p.freeze,
        };

        let shimmer = ShimmerParams {
            room_size: p.reverb_size,
            pre_delay_ms: p.pre_delay_ms,
            tone,
            shimmer_amount,
            pitch_semitones: p.shimmer_interval.semitones() + 12.0 * glass,
            reverb_mix: p.reverb_mix,
            drift: p.drift,
            mod_rate_hz: p.mod_rate_hz,
            mod_depth: p.mod_depth,
            freeze: p.freeze,
        };

        EngineParams {
            granular,
            shimmer,
            mix: p.mix,
            output_gain: db_to_gain(p.output_gain_db),
        }
    }
}

/// Decibels to linear gain.
#[inline]
pub fn db_to_gain(db: f64) -> f64 {
    libm::pow(10.0, db / 20.0)
}

/// Lock-free parameter mailbox between the control and audio threads.
pub struct SharedParams {
    current: ArcSwap<ParamSet>,
}

impl SharedParams {
    pub fn new(params: ParamSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(params.clamped()),
        }
    }

    /// Publish a whole snapshot.
    pub fn store(&self, params: ParamSet) {
        self.current.store(Arc::new(params.clamped()));
    }

    /// Edit the current snapshot and publish the result.
    pub fn update(&self, mut edit: impl FnMut(&mut ParamSet)) {
        self.current.rcu(|current| {
            let mut next = **current;
            edit(&mut next);
            next.clamped()
        });
    }

    pub fn set(&self, id: ParamId, value: f64) {
        self.update(|params| params.set(id, value));
    }

    pub fn set_locked(&self, id: ParamId, locked: bool) {
        self.update(|params| params.locks.set(id, locked));
    }

    /// Copy of the latest snapshot.
    pub fn snapshot(&self) -> ParamSet {
        **self.current.load()
    }
}

impl Default for SharedParams {
    fn default() -> Self {
        Self::new(ParamSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_table_matches_ids() {
        for (i, def) in PARAMS.iter().enumerate() {
            assert_eq!(def.id.index(), i);
            assert_eq!(ParamId::ALL[i], def.id);
            assert!(def.min <= def.default && def.default <= def.max, "{}", def.key);
            assert_eq!(ParamId::from_key(def.key), Some(def.id));
        }
        assert_eq!(ParamId::from_key("nope"), None);
    }

    #[test]
    fn test_defaults_follow_the_table() {
        let params = ParamSet::default();
        for def in PARAMS.iter() {
            assert_eq!(params.get(def.id), def.default, "{}", def.key);
        }
        assert_eq!(params.density, 40.0);
        assert_eq!(params.shimmer_interval, ShimmerInterval::Octave);
        assert!(!params.freeze);
    }

    #[test]
    fn test_set_clamps() {
        let mut params = ParamSet::default();
        params.set(ParamId::Feedback, 3.0);
        assert_eq!(params.feedback, 0.95);
        params.set(ParamId::DelayTimeMs, -5.0);
        assert_eq!(params.delay_time_ms, 1.0);
        params.set(ParamId::Density, f64::NAN);
        assert_eq!(params.density, 40.0);
        params.set(ParamId::ShimmerInterval, 0.6);
        assert_eq!(params.shimmer_interval, ShimmerInterval::Fifth);
        params.set(ParamId::ShimmerInterval, 9.0);
        assert_eq!(params.shimmer_interval, ShimmerInterval::TwoOctaves);
        params.set(ParamId::Freeze, 0.7);
        assert!(params.freeze);
    }

    #[test]
    fn test_clamped_repairs_raw_values() {
        let raw = ParamSet {
            mix: 4.0,
            mod_rate_hz: 0.0,
            pitch_semitones: -40.0,
            ..ParamSet::default()
        };
        let fixed = raw.clamped();
        assert_eq!(fixed.mix, 1.0);
        assert_eq!(fixed.mod_rate_hz, 0.01);
        assert_eq!(fixed.pitch_semitones, -12.0);
    }

    #[test]
    fn test_normalize_round_trip_points() {
        let def = ParamId::DelayTimeMs.def();
        assert_eq!(def.normalize(1.0), 0.0);
        assert_eq!(def.normalize(2000.0), 1.0);
        assert_eq!(def.denormalize(1.0), 2000.0);
        assert_eq!(ParamId::ShimmerInterval.def().denormalize(0.5), 2.0);
    }

    #[test]
    fn test_macros_at_rest_change_nothing() {
        let params = ParamSet::default();
        let engine = params.engine_params();
        assert_eq!(engine.granular.density, 40.0);
        assert_eq!(engine.granular.grain_size_ms, 70.0);
        assert_eq!(engine.granular.pitch_semitones, 0.0);
        assert_eq!(engine.granular.input_gain, 1.0);
        assert_eq!(engine.shimmer.tone, 0.55);
        assert_eq!(engine.shimmer.pitch_semitones, 12.0);
        assert_eq!(engine.output_gain, 1.0);
    }

    #[test]
    fn test_air_and_glass() {
        let params = ParamSet {
            air: 1.0,
            glass: 1.0,
            density: 10.0,
            tone: 0.9,
            shimmer_amount: 0.5,
            grain_size_ms: 100.0,
            spread: 0.8,
            pitch_semitones: 3.0,
            shimmer_interval: ShimmerInterval::Fifth,
            ..ParamSet::default()
        };
        let engine = params.engine_params();
        assert_relative_eq!(engine.granular.density, 18.0);
        assert_eq!(engine.shimmer.tone, 1.0);
        assert_relative_eq!(engine.shimmer.shimmer_amount, 0.85);
        assert_relative_eq!(engine.granular.grain_size_ms, 65.0);
        assert_eq!(engine.granular.spread, 1.0);
        assert_eq!(engine.granular.pitch_semitones, 5.0);
        assert_eq!(engine.shimmer.pitch_semitones, 19.0);
    }

    #[test]
    fn test_locks_shield_macro_targets() {
        let locks = ParamLocks::none()
            .lock(ParamId::Density)
            .lock(ParamId::PitchSemitones);
        let params = ParamSet {
            air: 1.0,
            glass: 1.0,
            density: 10.0,
            locks,
            ..ParamSet::default()
        };
        let engine = params.engine_params();
        assert_eq!(engine.granular.density, 10.0);
        assert_eq!(engine.granular.pitch_semitones, 0.0);
        // the shimmer interval bend is not lockable
        assert_eq!(engine.shimmer.pitch_semitones, 24.0);
        assert!(engine.granular.grain_size_ms < 70.0);

        let listed: Vec<ParamId> = locks.locked().collect();
        assert_eq!(listed, vec![ParamId::Density, ParamId::PitchSemitones]);
    }

    #[test]
    fn test_lock_toggle() {
        let mut locks = ParamLocks::default();
        locks.toggle(ParamId::Tone);
        assert!(locks.is_locked(ParamId::Tone));
        locks.toggle(ParamId::Tone);
        assert!(!locks.is_locked(ParamId::Tone));
        assert!(ParamId::Tone.is_macro_target());
        assert!(!ParamId::Mix.is_macro_target());
    }

    #[test]
    fn test_gain_conversion() {
        assert_eq!(db_to_gain(0.0), 1.0);
        assert_relative_eq!(db_to_gain(20.0), 10.0, epsilon = 1e-12);
        assert_relative_eq!(db_to_gain(-6.0), 0.501_187_233_627_272_3, epsilon = 1e-12);

        let params = ParamSet {
            input_gain_db: -20.0,
            output_gain_db: 6.0,
            ..ParamSet::default()
        };
        let engine = params.engine_params();
        assert_relative_eq!(engine.granular.input_gain, 0.1, epsilon = 1e-12);
        assert_relative_eq!(engine.output_gain, 1.995_262_314_968_879_5, epsilon = 1e-12);
    }

    #[test]
    fn test_json_skips_locks_and_fills_defaults() {
        let params = ParamSet {
            locks: ParamLocks::none().lock(ParamId::Tone),
            ..ParamSet::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("locks"));

        let back: ParamSet =
            serde_json::from_str(r#"{ "mix": 0.3, "shimmer_interval": "fourth" }"#).unwrap();
        assert_eq!(back.mix, 0.3);
        assert_eq!(back.shimmer_interval, ShimmerInterval::Fourth);
        assert_eq!(back.delay_time_ms, 450.0);
        assert_eq!(back.locks, ParamLocks::none());
    }

    #[test]
    fn test_shared_params() {
        let shared = SharedParams::default();
        shared.set(ParamId::Mix, 0.25);
        shared.set_locked(ParamId::Spread, true);
        shared.update(|p| p.feedback = 10.0);

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.mix, 0.25);
        assert!(snapshot.is_locked(ParamId::Spread));
        assert_eq!(snapshot.feedback, 0.95);

        shared.store(ParamSet::default());
        assert_eq!(shared.snapshot(), ParamSet::default());
    }

    #[test]
    fn test_shared_params_across_threads() {
        let shared = Arc::new(SharedParams::new(
            ParamSet::default().with(ParamId::Mix, 0.0).with(ParamId::Tone, 0.0),
        ));
        let writer = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    let v = i as f64 / 1000.0;
                    shared.store(ParamSet::default().with(ParamId::Mix, v).with(ParamId::Tone, v));
                }
            })
        };
        for _ in 0..1000 {
            let snapshot = shared.snapshot();
            // both fields always come from the same store
            assert_eq!(snapshot.mix, snapshot.tone);
        }
        writer.join().unwrap();
    }
}
