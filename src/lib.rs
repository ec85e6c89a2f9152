//! # Starlight Drift: Granular Shimmer Delay
//!
//! `starlight_drift` is a real-time stereo effect that smears its input into a
//! cloud of pitched, panned grains and sends the cloud into a reverb whose own
//! output is pitch shifted and fed back, producing rising shimmer tails.
//!
//! ## Architecture
//!
//! The signal path is built from small owned engines, composed in series once
//! per block:
//!
//! - **Granular delay** - [`DelayLine`] history, [`DriftModulator`] wander and
//!   a pool of Hann-windowed grains scheduled at a fixed density
//! - **Shimmer stage** - two [`DualWindowPitchShifter`]s re-pitch the previous
//!   block's reverb output and mix it back in ahead of a pre-delay and the
//!   [`Reverberator`]
//! - **Processor** - [`StarlightDrift`] derives both engines' snapshots from a
//!   host [`ParamSet`] and mixes the result with the dry signal
//!
//! Nothing on the audio path allocates after `prepare`, locks, or returns an
//! error. Out-of-range values are clamped where they are used.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use starlight_drift::prelude::*;
//!
//! let mut fx = StarlightDrift::new();
//! fx.prepare(48000.0, 512).unwrap();
//!
//! fx.set_params(
//!     ParamSet::default()
//!         .with(ParamId::ShimmerAmount, 0.6)
//!         .with(ParamId::Mix, 0.5),
//! );
//!
//! let mut left = vec![0.0; 512];
//! let mut right = vec![0.0; 512];
//! fx.process(&mut left, &mut right);
//! ```
//!
//! Hosts that edit parameters on another thread publish snapshots through
//! [`SharedParams`] and call [`StarlightDrift::sync`] at the top of each block.

pub mod block;
pub mod config;
pub mod delay_line;
pub mod drift;
pub mod error;
pub mod granular;
pub mod params;
pub mod pitch;
pub mod presets;
pub mod processor;
pub mod reverb;
pub mod rng;
pub mod shimmer;
pub mod window;

/// Prelude module for convenient imports
pub mod prelude {
    // Building blocks
    pub use crate::block::{AudioBlock, StereoBlock, DEFAULT_BLOCK_SIZE};
    pub use crate::config::ProcessConfig;
    pub use crate::delay_line::DelayLine;
    pub use crate::drift::DriftModulator;
    pub use crate::rng::{RandomSource, Rng};
    pub use crate::window::{hann, hann_phase};

    // Engines
    pub use crate::granular::{Grain, GranularDelay, GranularParams};
    pub use crate::pitch::DualWindowPitchShifter;
    pub use crate::reverb::{FreeverbReverb, ReverbSettings, Reverberator};
    pub use crate::shimmer::{PreDelay, ShimmerFeedbackStage, ShimmerInterval, ShimmerParams};

    // Processor and parameters
    pub use crate::error::{Error, Result};
    pub use crate::params::{
        db_to_gain, EngineParams, ParamDef, ParamId, ParamKind, ParamLocks, ParamSet,
        SharedParams, PARAMS,
    };
    pub use crate::presets::{Preset, PresetCategory, PresetInfo, PresetLibrary};
    pub use crate::processor::StarlightDrift;
}

// Re-export key types at crate root for convenience
pub use prelude::*;
