//! Preset Library
//!
//! Named parameter snapshots:
//! - Factory presets covering the main textures of the effect
//! - User presets added at runtime
//! - JSON import/export of whole banks
//!
//! # Example
//!
//! ```ignore
//! use starlight_drift::prelude::*;
//!
//! let mut library = PresetLibrary::new();
//!
//! // List all presets
//! for preset in library.list() {
//!     println!("{}: {}", preset.name, preset.description);
//! }
//!
//! // Search by tags
//! let frozen = library.search_tags(&["freeze"]);
//!
//! // Load a preset into a running processor
//! let params = library.get("Glass Cathedral")?.params;
//! shared.store(params);
//! ```
//!
//! Lock state is session state and never stored with a preset.

use crate::error::{Error, Result};
use crate::params::{ParamId, ParamSet};
use crate::shimmer::ShimmerInterval;
use serde::{Deserialize, Serialize};

/// Preset category for organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetCategory {
    /// Neutral starting points
    Init,
    /// Grain clouds and smeared echoes
    Texture,
    /// Pitch-stacked reverb tails
    Shimmer,
    /// Held, infinite sustain
    Frozen,
    /// Audible, rhythmic repeats
    Echo,
    /// Anything saved by the user
    User,
}

/// Preset metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: String,
    pub category: PresetCategory,
    #[serde(default)]
    pub description: String,
    /// Tags for searching
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PresetInfo {
    pub fn new(name: impl Into<String>, category: PresetCategory) -> Self {
        Self {
            name: name.into(),
            category,
            description: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    fn matches_tag(&self, tag: &str) -> bool {
        let tag_lower = tag.to_lowercase();
        self.tags
            .iter()
            .any(|t| t.to_lowercase().contains(&tag_lower))
    }
}

/// A named parameter snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(flatten)]
    pub info: PresetInfo,
    pub params: ParamSet,
}

impl Preset {
    pub fn new(info: PresetInfo, params: ParamSet) -> Self {
        Self {
            info,
            params: params.clamped(),
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a single preset. Values are clamped into range.
    pub fn from_json(json: &str) -> Result<Self> {
        let preset: Preset = serde_json::from_str(json)?;
        Ok(Self::new(preset.info, preset.params))
    }
}

/// Factory and user presets
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    factory: Vec<Preset>,
    user: Vec<Preset>,
}

impl PresetLibrary {
    /// Create a library holding the factory presets.
    pub fn new() -> Self {
        Self {
            factory: factory_presets(),
            user: Vec::new(),
        }
    }

    /// Get a preset by name. User presets shadow factory ones.
    pub fn get(&self, name: &str) -> Result<&Preset> {
        self.user
            .iter()
            .chain(self.factory.iter())
            .find(|p| p.info.name == name)
            .ok_or_else(|| Error::PresetNotFound(name.to_string()))
    }

    /// Metadata for every preset, factory first.
    pub fn list(&self) -> Vec<&PresetInfo> {
        self.iter().map(|p| &p.info).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.factory.iter().chain(self.user.iter())
    }

    pub fn len(&self) -> usize {
        self.factory.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn by_category(&self, category: PresetCategory) -> Vec<&PresetInfo> {
        self.iter()
            .map(|p| &p.info)
            .filter(|info| info.category == category)
            .collect()
    }

    /// Search presets by tag (single tag)
    pub fn by_tag(&self, tag: &str) -> Vec<&PresetInfo> {
        self.search_tags(&[tag])
    }

    /// Search presets by multiple tags (matches any)
    pub fn search_tags(&self, tags: &[&str]) -> Vec<&PresetInfo> {
        self.iter()
            .map(|p| &p.info)
            .filter(|info| tags.iter().any(|tag| info.matches_tag(tag)))
            .collect()
    }

    /// Store a user preset, replacing any user preset with the same name.
    pub fn save(&mut self, preset: Preset) {
        let preset = Preset::new(preset.info, preset.params);
        if let Some(existing) = self
            .user
            .iter_mut()
            .find(|p| p.info.name == preset.info.name)
        {
            log::info!("replacing user preset '{}'", preset.info.name);
            *existing = preset;
        } else {
            log::info!("saving user preset '{}'", preset.info.name);
            self.user.push(preset);
        }
    }

    /// Remove a user preset. Factory presets cannot be removed.
    pub fn remove(&mut self, name: &str) -> Result<Preset> {
        let index = self
            .user
            .iter()
            .position(|p| p.info.name == name)
            .ok_or_else(|| Error::PresetNotFound(name.to_string()))?;
        Ok(self.user.remove(index))
    }

    /// Serialise the user presets as a JSON array.
    pub fn user_bank_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.user)?)
    }

    /// Load a JSON array of presets into the user bank.
    ///
    /// Returns how many presets were loaded.
    pub fn load_user_bank(&mut self, json: &str) -> Result<usize> {
        let presets: Vec<Preset> = serde_json::from_str(json).map_err(|e| {
            log::warn!("rejected preset bank: {}", e);
            e
        })?;
        let count = presets.len();
        for preset in presets {
            self.save(preset);
        }
        Ok(count)
    }
}

impl Default for PresetLibrary {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Factory Presets
// =============================================================================

fn factory_presets() -> Vec<Preset> {
    vec![
        Preset::new(
            PresetInfo::new("Init", PresetCategory::Init)
                .with_description("Every control at its default")
                .with_tag("init")
                .with_tag("default"),
            ParamSet::default(),
        ),
        Preset::new(
            PresetInfo::new("Starlight Drift", PresetCategory::Texture)
                .with_description("Slow wandering grain cloud into a soft octave shimmer")
                .with_tag("ambient")
                .with_tag("drift")
                .with_tag("lush"),
            ParamSet::default()
                .with(ParamId::DelayTimeMs, 620.0)
                .with(ParamId::Density, 18.0)
                .with(ParamId::GrainSizeMs, 140.0)
                .with(ParamId::Drift, 0.6)
                .with(ParamId::ModDepth, 0.5)
                .with(ParamId::Mix, 0.6),
        ),
        Preset::new(
            PresetInfo::new("Dust Cloud", PresetCategory::Texture)
                .with_description("Dense short grains scattered wide")
                .with_tag("granular")
                .with_tag("dense")
                .with_tag("wide"),
            ParamSet::default()
                .with(ParamId::GrainSizeMs, 25.0)
                .with(ParamId::Jitter, 0.8)
                .with(ParamId::Spread, 1.0)
                .with(ParamId::ShimmerAmount, 0.0)
                .with(ParamId::ReverbMix, 0.4)
                .with(ParamId::Mix, 0.5),
        ),
        Preset::new(
            PresetInfo::new("Glass Cathedral", PresetCategory::Shimmer)
                .with_description("Bright fifths climbing through a huge room")
                .with_tag("shimmer")
                .with_tag("bright")
                .with_tag("lush"),
            ParamSet {
                shimmer_interval: ShimmerInterval::Fifth,
                ..ParamSet::default()
            }
            .with(ParamId::ShimmerAmount, 0.7)
            .with(ParamId::ReverbSize, 0.9)
            .with(ParamId::Tone, 0.75)
            .with(ParamId::Glass, 0.4)
            .with(ParamId::PreDelayMs, 60.0),
        ),
        Preset::new(
            PresetInfo::new("Octave Rain", PresetCategory::Shimmer)
                .with_description("Grains an octave up falling into a two-octave tail")
                .with_tag("shimmer")
                .with_tag("octave")
                .with_tag("sparkle"),
            ParamSet {
                shimmer_interval: ShimmerInterval::TwoOctaves,
                ..ParamSet::default()
            }
            .with(ParamId::PitchSemitones, 12.0)
            .with(ParamId::ShimmerAmount, 0.45)
            .with(ParamId::Air, 0.5),
        ),
        Preset::new(
            PresetInfo::new("Frozen Horizon", PresetCategory::Frozen)
                .with_description("Holds the last four seconds forever")
                .with_tag("freeze")
                .with_tag("drone")
                .with_tag("pad"),
            ParamSet::default()
                .with(ParamId::Freeze, 1.0)
                .with(ParamId::Density, 30.0)
                .with(ParamId::GrainSizeMs, 220.0)
                .with(ParamId::Drift, 0.4)
                .with(ParamId::ReverbSize, 0.8),
        ),
        Preset::new(
            PresetInfo::new("Tape Echo", PresetCategory::Echo)
                .with_description("Steady repeats with a little wow")
                .with_tag("echo")
                .with_tag("rhythmic")
                .with_tag("vintage"),
            ParamSet::default()
                .with(ParamId::DelayTimeMs, 375.0)
                .with(ParamId::Feedback, 0.55)
                .with(ParamId::GrainSizeMs, 250.0)
                .with(ParamId::Jitter, 0.0)
                .with(ParamId::Spread, 0.1)
                .with(ParamId::ShimmerAmount, 0.0)
                .with(ParamId::ReverbMix, 0.25)
                .with(ParamId::Mix, 0.4),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_library_list() {
        let library = PresetLibrary::new();
        assert!(library.len() >= 7);
        assert_eq!(library.list().len(), library.len());
        assert_eq!(library.list()[0].name, "Init");
    }

    #[test]
    fn test_preset_library_by_category() {
        let library = PresetLibrary::new();
        let shimmer = library.by_category(PresetCategory::Shimmer);
        assert!(!shimmer.is_empty());
        for preset in &shimmer {
            assert_eq!(preset.category, PresetCategory::Shimmer);
        }
        assert!(library.by_category(PresetCategory::User).is_empty());
    }

    #[test]
    fn test_preset_library_search_tags() {
        let library = PresetLibrary::new();

        let results = library.search_tags(&["freeze"]);
        assert!(results.iter().any(|p| p.name == "Frozen Horizon"));

        let results = library.search_tags(&["echo", "SHIMMER"]);
        assert!(results.len() >= 3);

        assert!(library.by_tag("nonexistent_tag_xyz").is_empty());
    }

    #[test]
    fn test_factory_presets_are_in_range() {
        let library = PresetLibrary::new();
        for preset in library.iter() {
            assert_eq!(preset.params, preset.params.clamped(), "{}", preset.name());
            assert!(!preset.info.description.is_empty());
        }
        let frozen = library.get("Frozen Horizon").unwrap();
        assert!(frozen.params.freeze);
    }

    #[test]
    fn test_preset_library_get() {
        let library = PresetLibrary::new();
        let preset = library.get("Glass Cathedral").unwrap();
        assert_eq!(preset.params.shimmer_interval, ShimmerInterval::Fifth);

        match library.get("Nonexistent") {
            Err(Error::PresetNotFound(name)) => assert_eq!(name, "Nonexistent"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_user_presets_shadow_and_replace() {
        let mut library = PresetLibrary::new();
        let before = library.len();

        let info = PresetInfo::new("Init", PresetCategory::User);
        library.save(Preset::new(info.clone(), ParamSet::default().with(ParamId::Mix, 0.2)));
        assert_eq!(library.get("Init").unwrap().params.mix, 0.2);

        library.save(Preset::new(info, ParamSet::default().with(ParamId::Mix, 0.3)));
        assert_eq!(library.len(), before + 1);
        assert_eq!(library.get("Init").unwrap().params.mix, 0.3);

        library.remove("Init").unwrap();
        assert_eq!(library.get("Init").unwrap().params.mix, 1.0);
        assert!(library.remove("Init").is_err());
    }

    #[test]
    fn test_preset_json() {
        let library = PresetLibrary::new();
        let preset = library.get("Octave Rain").unwrap();
        let json = preset.to_json().unwrap();
        assert!(json.contains("\"name\": \"Octave Rain\""));
        assert!(json.contains("two_octaves"));

        let loaded = Preset::from_json(&json).unwrap();
        assert_eq!(&loaded, preset);
    }

    #[test]
    fn test_preset_json_is_clamped_and_defaulted() {
        let json = r#"{
            "name": "Hot",
            "category": "user",
            "params": { "feedback": 5.0 }
        }"#;
        let preset = Preset::from_json(json).unwrap();
        assert_eq!(preset.params.feedback, 0.95);
        assert_eq!(preset.params.delay_time_ms, 450.0);
        assert!(preset.info.tags.is_empty());
    }

    #[test]
    fn test_user_bank_round_trip() {
        let mut library = PresetLibrary::new();
        library.save(Preset::new(
            PresetInfo::new("Mine", PresetCategory::User).with_tag("personal"),
            ParamSet::default().with(ParamId::Drift, 0.9),
        ));
        let json = library.user_bank_json().unwrap();

        let mut other = PresetLibrary::new();
        assert_eq!(other.load_user_bank(&json).unwrap(), 1);
        assert_eq!(other.get("Mine").unwrap().params.drift, 0.9);
        assert_eq!(other.by_tag("personal").len(), 1);
    }

    #[test]
    fn test_bad_bank_is_rejected() {
        let mut library = PresetLibrary::new();
        assert!(matches!(
            library.load_user_bank("{ not json"),
            Err(Error::Json(_))
        ));
        assert_eq!(library.by_category(PresetCategory::User).len(), 0);
    }
}
