//! Tuning surface for a generation run, loaded once from TOML.

use std::{collections::HashSet, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Difficulty, HeightLockSetting, SegmentDescriptor, SegmentName, SegmentType, StageNumber,
};

/// Aggregated configuration controlling every adjustable aspect of generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Seed from which every random stream of the run is derived.
    pub seed: u64,
    /// Length of the first stage; later stages derive from it.
    pub base_stage_length: f32,
    /// Growth function applied to the stage length.
    pub stage_growth: StageGrowth,
    /// Upper bound on simultaneously active segments.
    pub max_active_segments: u32,
    /// Minimum look-ahead between the current exit and the window edge before spawning stops.
    pub lookahead_margin: f32,
    /// Delay in seconds between the first running tick and the first spawn.
    pub start_delay_secs: f32,
    /// Pool weight added to a segment when the difficulty reaches its unlock level.
    pub difficulty_weight_increment: u32,
    /// World position at which the first segment's entry anchor is placed.
    pub origin: Vec2,
    /// Vertical tiers segments can occupy.
    pub heights: HeightConfig,
    /// Gap tier distances.
    pub gaps: GapConfig,
    /// Baseline weight and repeat suppression per segment type.
    pub types: TypeTunings,
    /// Checkpoint insertion at stage boundaries.
    pub checkpoint: CheckpointConfig,
    /// Scripted sequence that replaces weighted selection.
    pub scripted: ScriptedConfig,
    /// Segment placed when generation starts, if any.
    pub opening: Option<OpeningConfig>,
    /// Spawn-point content table.
    pub spawnables: SpawnableConfig,
    /// Segment variants available to the catalog.
    pub segments: Vec<SegmentSpec>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_0f_1e7e1,
            base_stage_length: 100.0,
            stage_growth: StageGrowth::default(),
            max_active_segments: 15,
            lookahead_margin: 10.0,
            start_delay_secs: 1.0,
            difficulty_weight_increment: 10,
            origin: Vec2::ZERO,
            heights: HeightConfig::default(),
            gaps: GapConfig::default(),
            types: TypeTunings::default(),
            checkpoint: CheckpointConfig::default(),
            scripted: ScriptedConfig::default(),
            opening: None,
            spawnables: SpawnableConfig::default(),
            segments: Vec::new(),
        }
    }
}

impl GenerationConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Startup delay as a duration.
    #[must_use]
    pub fn start_delay(&self) -> Duration {
        crate::seconds(self.start_delay_secs)
    }

    /// Looks up a segment entry by name.
    #[must_use]
    pub fn segment(&self, name: &SegmentName) -> Option<&SegmentSpec> {
        self.segments.iter().find(|spec| &spec.name == name)
    }

    /// Rejects configurations that would break generation invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_stage_length.is_finite() && self.base_stage_length > 0.0) {
            return Err(ConfigError::InvalidDistance {
                field: "base_stage_length",
                value: self.base_stage_length,
            });
        }
        require_distance("lookahead_margin", self.lookahead_margin)?;
        require_distance("start_delay_secs", self.start_delay_secs)?;
        require_distance("heights.interval", self.heights.interval)?;
        require_distance("gaps.shortest", self.gaps.shortest)?;
        require_distance("gaps.short", self.gaps.short)?;
        require_distance("gaps.long", self.gaps.long)?;
        require_distance("gaps.longest", self.gaps.longest)?;
        require_distance("gaps.reach_factor", self.gaps.reach_factor)?;

        match self.stage_growth {
            StageGrowth::Exponential { factor } if !(factor.is_finite() && factor >= 1.0) => {
                return Err(ConfigError::InvalidStageGrowth);
            }
            StageGrowth::Linear { increment } if !(increment.is_finite() && increment >= 0.0) => {
                return Err(ConfigError::InvalidStageGrowth);
            }
            _ => {}
        }

        if self.max_active_segments == 0 {
            return Err(ConfigError::NoActiveBudget);
        }
        if self.heights.levels == 0 {
            return Err(ConfigError::NoHeightLevels);
        }
        if self.gaps.tiers == 0 {
            return Err(ConfigError::NoGapTiers);
        }

        for segment_type in SegmentType::ALL {
            let modifier = self.types.get(segment_type).repeat_modifier;
            if !(0.0..=1.0).contains(&modifier) {
                return Err(ConfigError::InvalidRepeatModifier {
                    segment_type,
                    value: modifier,
                });
            }
        }

        let none_chance = self.spawnables.none_chance;
        if !(0.0..=100.0).contains(&none_chance) {
            return Err(ConfigError::InvalidNoneChance { value: none_chance });
        }

        let mut seen = HashSet::with_capacity(self.segments.len());
        for spec in &self.segments {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateSegment {
                    name: spec.name.clone(),
                });
            }
        }

        for name in &self.scripted.sequence {
            self.require_segment("scripted sequence", name)?;
        }
        if let Some(name) = &self.checkpoint.segment {
            self.require_segment("checkpoint", name)?;
        }
        if let Some(opening) = &self.opening {
            self.require_segment("opening", &opening.segment)?;
        }

        Ok(())
    }

    fn require_segment(
        &self,
        context: &'static str,
        name: &SegmentName,
    ) -> Result<(), ConfigError> {
        if self.segment(name).is_some() {
            Ok(())
        } else {
            Err(ConfigError::UnknownSegment {
                context,
                name: name.clone(),
            })
        }
    }
}

fn require_distance(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDistance { field, value })
    }
}

/// Function used to lengthen successive stages.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageGrowth {
    /// `base × factor^(stage − 1)`.
    Exponential {
        /// Multiplier applied per stage.
        factor: f32,
    },
    /// `base + increment × (stage − 1)`.
    Linear {
        /// Length added per stage.
        increment: f32,
    },
}

impl Default for StageGrowth {
    fn default() -> Self {
        Self::Exponential { factor: 1.75 }
    }
}

impl StageGrowth {
    /// Length of the provided stage given the length of the first one.
    #[must_use]
    pub fn length_for(self, base: f32, stage: StageNumber) -> f32 {
        let steps = stage.get().saturating_sub(1);
        match self {
            Self::Exponential { factor } => {
                let exponent = i32::try_from(steps).unwrap_or(i32::MAX);
                base * factor.powi(exponent)
            }
            Self::Linear { increment } => base + increment * steps as f32,
        }
    }
}

/// Vertical tier settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeightConfig {
    /// Number of height levels; the walk stays within `[1, levels]`.
    pub levels: u32,
    /// World distance between adjacent height levels.
    pub interval: f32,
}

impl Default for HeightConfig {
    fn default() -> Self {
        Self {
            levels: 3,
            interval: 1.5,
        }
    }
}

/// Gap tier settings. The medium tier is derived at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GapConfig {
    /// Number of gap tiers eligible for the random draw after a ground segment.
    pub tiers: u32,
    /// Shortest gap distance.
    pub shortest: f32,
    /// Short gap distance.
    pub short: f32,
    /// Long gap distance.
    pub long: f32,
    /// Longest gap distance.
    pub longest: f32,
    /// Share of the player's jump carry distance used as the medium gap.
    pub reach_factor: f32,
    /// Forces every gap to the shortest distance.
    pub override_to_shortest: bool,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            tiers: 5,
            shortest: 1.0,
            short: 2.0,
            long: 6.0,
            longest: 8.0,
            reach_factor: 0.8,
            override_to_shortest: false,
        }
    }
}

/// Baseline weight and repeat suppression of one segment type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypeTuning {
    /// Weight restored whenever a different type is chosen.
    pub weight: u32,
    /// Multiplier in `[0, 1]` applied to the weight of the type chosen last.
    pub repeat_modifier: f32,
}

impl Default for TypeTuning {
    fn default() -> Self {
        Self {
            weight: 10,
            repeat_modifier: 0.5,
        }
    }
}

/// Per-type tuning table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypeTunings {
    /// Ground segments.
    pub ground: TypeTuning,
    /// Transition segments.
    pub transition: TypeTuning,
    /// Jumper segments.
    pub jumper: TypeTuning,
}

impl TypeTunings {
    /// Tuning for the provided segment type.
    #[must_use]
    pub const fn get(&self, segment_type: SegmentType) -> &TypeTuning {
        match segment_type {
            SegmentType::Ground => &self.ground,
            SegmentType::Transition => &self.transition,
            SegmentType::Jumper => &self.jumper,
        }
    }
}

/// Checkpoint insertion settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckpointConfig {
    /// Whether stage boundaries insert the checkpoint segment.
    pub enabled: bool,
    /// Segment spawned as the checkpoint.
    pub segment: Option<SegmentName>,
    /// Baseline y the checkpoint is placed at.
    pub baseline_y: f32,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            segment: None,
            baseline_y: 0.0,
        }
    }
}

/// Scripted selection settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptedConfig {
    /// Replaces weighted selection with the sequence below.
    pub enabled: bool,
    /// Ordered segment names cycled through while scripted.
    pub sequence: Vec<SegmentName>,
}

/// Segment placed when generation starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpeningConfig {
    /// Segment placed at the origin.
    pub segment: SegmentName,
}

/// Content table used to fill spawn points inside segments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnableConfig {
    /// Percentage chance in `[0, 100]` that a spawn point stays empty.
    pub none_chance: f32,
    /// Weighted spawnable kinds.
    pub kinds: Vec<SpawnableSpec>,
}

impl Default for SpawnableConfig {
    fn default() -> Self {
        Self {
            none_chance: 5.0,
            kinds: Vec::new(),
        }
    }
}

/// One weighted spawnable kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnableSpec {
    /// Name of the spawnable pool.
    pub name: String,
    /// Relative weight of the kind.
    pub weight: u32,
}

/// Configured segment variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentSpec {
    /// Unique catalog key.
    pub name: SegmentName,
    /// Structural type.
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    /// Height lock behaviour.
    #[serde(default)]
    pub height_lock: HeightLockSetting,
    /// Difficulty at which the pool weight is boosted.
    #[serde(default)]
    pub unlock_difficulty: u32,
    /// Pool weight at the start of the run.
    #[serde(default = "default_segment_weight")]
    pub weight: u32,
    /// Local entry anchor.
    #[serde(default)]
    pub entry_anchor: Vec2,
    /// Local exit anchor.
    pub exit_anchor: Vec2,
}

impl SegmentSpec {
    /// Builds the immutable descriptor stored in the catalog.
    #[must_use]
    pub fn descriptor(&self) -> SegmentDescriptor {
        SegmentDescriptor::new(
            self.name.clone(),
            self.segment_type,
            self.height_lock,
            Difficulty::new(self.unlock_difficulty),
            self.entry_anchor,
            self.exit_anchor,
        )
    }
}

const fn default_segment_weight() -> u32 {
    10
}

/// Reasons a configuration is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML text could not be parsed.
    #[error("could not parse generation config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A distance or duration was negative or not finite.
    #[error("`{field}` must be a finite, non-negative number (got {value})")]
    InvalidDistance {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: f32,
    },
    /// The stage growth parameters would shrink or break stage lengths.
    #[error("stage growth must not shrink stages")]
    InvalidStageGrowth,
    /// The active segment budget is zero.
    #[error("max_active_segments must be at least 1")]
    NoActiveBudget,
    /// No height levels were configured.
    #[error("heights.levels must be at least 1")]
    NoHeightLevels,
    /// No gap tiers were configured.
    #[error("gaps.tiers must be at least 1")]
    NoGapTiers,
    /// A repeat modifier fell outside `[0, 1]`.
    #[error("repeat modifier for {segment_type} must lie in [0, 1] (got {value})")]
    InvalidRepeatModifier {
        /// Type the modifier belongs to.
        segment_type: SegmentType,
        /// Offending value.
        value: f32,
    },
    /// The none-chance percentage fell outside `[0, 100]`.
    #[error("spawnables.none_chance must lie in [0, 100] (got {value})")]
    InvalidNoneChance {
        /// Offending value.
        value: f32,
    },
    /// Two segments share a name.
    #[error("segment `{name}` is declared more than once")]
    DuplicateSegment {
        /// Duplicated name.
        name: SegmentName,
    },
    /// A name refers to a segment that is not declared.
    #[error("{context} refers to unknown segment `{name}`")]
    UnknownSegment {
        /// Setting that holds the reference.
        context: &'static str,
        /// Unknown name.
        name: SegmentName,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        seed = 7
        base_stage_length = 120.0
        max_active_segments = 12

        [stage_growth]
        kind = "linear"
        increment = 50.0

        [types.jumper]
        weight = 4
        repeat_modifier = 0.25

        [checkpoint]
        segment = "shop"
        baseline_y = 2.0

        [opening]
        segment = "flat"

        [[segments]]
        name = "flat"
        type = "ground"
        exit_anchor = [10.0, 0.0]

        [[segments]]
        name = "ramp"
        type = "transition"
        height_lock = "lock_both"
        unlock_difficulty = 2
        weight = 0
        entry_anchor = [-1.0, 0.0]
        exit_anchor = [6.0, 0.0]

        [[segments]]
        name = "shop"
        type = "ground"
        exit_anchor = [20.0, 0.0]
    "#;

    #[test]
    fn parses_sample_configuration() {
        let config = GenerationConfig::from_toml_str(SAMPLE).expect("sample parses");
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_active_segments, 12);
        assert_eq!(
            config.stage_growth,
            StageGrowth::Linear { increment: 50.0 }
        );
        assert_eq!(config.types.jumper.weight, 4);
        assert_eq!(config.types.ground, TypeTuning::default());
        assert_eq!(config.segments.len(), 3);

        let ramp = config.segment(&SegmentName::new("ramp")).expect("ramp");
        assert_eq!(ramp.height_lock, HeightLockSetting::LockBoth);
        assert_eq!(ramp.unlock_difficulty, 2);
        assert_eq!(ramp.weight, 0);
        assert_eq!(ramp.entry_anchor, Vec2::new(-1.0, 0.0));

        let flat = config.segment(&SegmentName::new("flat")).expect("flat");
        assert_eq!(flat.weight, 10);
        assert_eq!(flat.entry_anchor, Vec2::ZERO);
    }

    #[test]
    fn defaults_match_reference_tuning() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_active_segments, 15);
        assert_eq!(config.heights.levels, 3);
        assert!((config.heights.interval - 1.5).abs() < f32::EPSILON);
        assert!((config.gaps.reach_factor - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.difficulty_weight_increment, 10);
        assert_eq!(config.start_delay(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn exponential_growth_matches_expected_lengths() {
        let growth = StageGrowth::default();
        let lengths: Vec<f32> = (1..=3)
            .map(|stage| growth.length_for(100.0, StageNumber::new(stage)))
            .collect();
        assert!((lengths[0] - 100.0).abs() < 1e-3);
        assert!((lengths[1] - 175.0).abs() < 1e-3);
        assert!((lengths[2] - 306.25).abs() < 1e-3);
    }

    #[test]
    fn linear_growth_adds_increment_per_stage() {
        let growth = StageGrowth::Linear { increment: 25.0 };
        assert!((growth.length_for(100.0, StageNumber::new(3)) - 150.0).abs() < 1e-3);
    }

    #[test]
    fn rejects_repeat_modifier_outside_unit_range() {
        let mut config = GenerationConfig::default();
        config.types.ground.repeat_modifier = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRepeatModifier {
                segment_type: SegmentType::Ground,
                ..
            })
        ));
    }

    #[test]
    fn rejects_duplicate_segment_names() {
        let mut config = GenerationConfig::from_toml_str(SAMPLE).expect("sample parses");
        let duplicate = config.segments[0].clone();
        config.segments.push(duplicate);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSegment { .. })
        ));
    }

    #[test]
    fn rejects_unknown_scripted_names() {
        let mut config = GenerationConfig::from_toml_str(SAMPLE).expect("sample parses");
        config.scripted.sequence.push(SegmentName::new("missing"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownSegment {
                context: "scripted sequence",
                ..
            })
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        let error = GenerationConfig::from_toml_str("mystery = 1").expect_err("unknown field");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_budgets() {
        let mut config = GenerationConfig::default();
        config.max_active_segments = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NoActiveBudget)));

        let mut config = GenerationConfig::default();
        config.heights.levels = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NoHeightLevels)));
    }
}
