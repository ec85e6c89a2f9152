//! Reverb backends for the shimmer stage.
//!
//! The shimmer stage owns the pitch-shifted feedback loop and pre-delay; the
//! diffuse tail itself comes from any [`Reverberator`]. The default backend is
//! the Schroeder/Moorer network from the `freeverb` crate.

use freeverb::Freeverb;

/// Stereo width handed to the reverberator.
pub const DEFAULT_WIDTH: f64 = 0.9;

/// Settings pushed to the reverberator once per block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbSettings {
    /// Room size, 0..1.
    pub room_size: f64,
    /// High-frequency damping, 0..1.
    pub damping: f64,
    /// Wet gain.
    pub wet: f64,
    /// Dry gain; the shimmer stage always uses 0.
    pub dry: f64,
    pub width: f64,
    /// Infinite sustain.
    pub freeze: bool,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            room_size: 0.55,
            damping: 0.45,
            wet: 1.0,
            dry: 0.0,
            width: DEFAULT_WIDTH,
            freeze: false,
        }
    }
}

impl ReverbSettings {
    /// Copy with every field forced into range.
    pub fn clamped(&self) -> Self {
        Self {
            room_size: unit(self.room_size),
            damping: unit(self.damping),
            wet: unit(self.wet),
            dry: unit(self.dry),
            width: unit(self.width),
            freeze: self.freeze,
        }
    }
}

/// A stereo reverberator processed in place.
pub trait Reverberator: Send {
    /// Rebuild internal state for `sample_rate`. Called outside the audio
    /// thread.
    fn prepare(&mut self, sample_rate: f64);

    fn set_settings(&mut self, settings: &ReverbSettings);

    /// Process a stereo block in place; both slices have the same length.
    fn process_stereo(&mut self, left: &mut [f64], right: &mut [f64]);

    /// Drop any ringing tail.
    fn reset(&mut self);
}

/// [`Reverberator`] backed by [`Freeverb`].
pub struct FreeverbReverb {
    sample_rate: usize,
    settings: ReverbSettings,
    inner: Option<Freeverb>,
}

impl FreeverbReverb {
    pub fn new() -> Self {
        Self {
            sample_rate: 0,
            settings: ReverbSettings::default(),
            inner: None,
        }
    }

    pub fn settings(&self) -> &ReverbSettings {
        &self.settings
    }

    fn apply(inner: &mut Freeverb, settings: &ReverbSettings) {
        inner.set_room_size(settings.room_size);
        inner.set_dampening(settings.damping);
        inner.set_wet(settings.wet);
        inner.set_dry(settings.dry);
        inner.set_width(settings.width);
        inner.set_freeze(settings.freeze);
    }
}

impl Default for FreeverbReverb {
    fn default() -> Self {
        Self::new()
    }
}

impl Reverberator for FreeverbReverb {
    fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate as usize;
        if self.sample_rate == 0 {
            self.inner = None;
            return;
        }
        let mut inner = Freeverb::new(self.sample_rate);
        Self::apply(&mut inner, &self.settings);
        self.inner = Some(inner);
    }

    fn set_settings(&mut self, settings: &ReverbSettings) {
        let settings = settings.clamped();
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        if let Some(inner) = &mut self.inner {
            Self::apply(inner, &self.settings);
        }
    }

    fn process_stereo(&mut self, left: &mut [f64], right: &mut [f64]) {
        let Some(inner) = &mut self.inner else {
            return;
        };
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (out_l, out_r) = inner.tick((*l, *r));
            *l = out_l;
            *r = out_r;
        }
    }

    fn reset(&mut self) {
        if self.sample_rate > 0 {
            let mut inner = Freeverb::new(self.sample_rate);
            Self::apply(&mut inner, &self.settings);
            self.inner = Some(inner);
        }
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
