#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Endless Runway level generator.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative level, and pure systems. The generation loop submits
//! [`Command`] values describing desired mutations, the level executes those
//! commands via its `apply` entry point, and then reports [`Event`] values that
//! adapters and observers react to. Collaborators that live outside the core
//! (segment pooling, player capability, simulation status) are reached only
//! through the traits declared here.

use std::{borrow::Borrow, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;

pub use config::{
    CheckpointConfig, ConfigError, GapConfig, GenerationConfig, HeightConfig, OpeningConfig,
    ScriptedConfig, SegmentSpec, SpawnableConfig, SpawnableSpec, StageGrowth, TypeTuning,
    TypeTunings,
};
pub use glam::Vec2;

/// Structural category of a level segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    /// Flat running ground.
    Ground,
    /// Piece that bridges two other segments without a gap.
    Transition,
    /// Segment that must be reached with a jump.
    Jumper,
}

impl SegmentType {
    /// Every segment type in declaration order.
    pub const ALL: [SegmentType; 3] = [Self::Ground, Self::Transition, Self::Jumper];

    /// Dense index used by enum-keyed tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Ground => 0,
            Self::Transition => 1,
            Self::Jumper => 2,
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ground => "ground",
            Self::Transition => "transition",
            Self::Jumper => "jumper",
        };
        f.write_str(label)
    }
}

/// Constrains whether the vertical offset next to a segment may vary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightLockSetting {
    /// The following segment may change height.
    #[default]
    None,
    /// Height is locked against the preceding segment.
    LockToPrevious,
    /// Height is locked against the following segment.
    LockToNext,
    /// Height is locked on both sides.
    LockBoth,
}

impl HeightLockSetting {
    /// Reports whether the segment following this one may change height.
    #[must_use]
    pub const fn allows_height_change(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Discrete gap tiers separating consecutive segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapLength {
    /// Segments touch edge to edge.
    #[default]
    NoGap,
    /// Smallest jumpable gap.
    Shortest,
    /// Short gap.
    Short,
    /// Gap derived from the player's jump reach at the current speed.
    Medium,
    /// Long gap.
    Long,
    /// Longest gap.
    Longest,
}

impl GapLength {
    /// Every gap tier in ascending order.
    pub const ALL: [GapLength; 6] = [
        Self::NoGap,
        Self::Shortest,
        Self::Short,
        Self::Medium,
        Self::Long,
        Self::Longest,
    ];

    /// Tiers eligible for the uniform draw that follows a ground segment.
    pub const AFTER_GROUND: [GapLength; 4] =
        [Self::NoGap, Self::Shortest, Self::Short, Self::Medium];

    /// Dense index used by the gap table.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::NoGap => 0,
            Self::Shortest => 1,
            Self::Short => 2,
            Self::Medium => 3,
            Self::Long => 4,
            Self::Longest => 5,
        }
    }
}

/// Jump variants the player capability provider can time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JumpKind {
    /// Standard single jump used to size medium gaps.
    Normal,
    /// Extended jump granted by abilities.
    Double,
}

/// Unique name identifying a segment variant in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentName(String);

impl SegmentName {
    /// Creates a segment name from the provided string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SegmentName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a pooled segment instance, allocated by the pooling collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Creates a new instance identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Monotonically increasing difficulty level.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Difficulty(u32);

impl Difficulty {
    /// Difficulty at the start of every run.
    pub const INITIAL: Difficulty = Difficulty(0);

    /// Creates a difficulty wrapper.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric difficulty.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Difficulty one step above this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// One-based stage counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageNumber(u32);

impl StageNumber {
    /// Stage every run begins in.
    pub const FIRST: StageNumber = StageNumber(1);

    /// Creates a stage number. Zero is promoted to the first stage.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value == 0 {
            Self::FIRST
        } else {
            Self(value)
        }
    }

    /// Retrieves the numeric stage.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Stage following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Discretized vertical tier, one-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeightLevel(u32);

impl HeightLevel {
    /// Lowest tier.
    pub const LOWEST: HeightLevel = HeightLevel(1);

    /// Creates a height level, clamped into `[1, levels]`.
    #[must_use]
    pub fn clamped(value: i64, levels: u32) -> Self {
        let upper = i64::from(levels.max(1));
        Self(value.clamp(1, upper) as u32)
    }

    /// Retrieves the numeric tier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Immutable per-variant record describing a segment.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentDescriptor {
    name: SegmentName,
    segment_type: SegmentType,
    height_lock: HeightLockSetting,
    unlock_difficulty: Difficulty,
    entry_anchor: Vec2,
    exit_anchor: Vec2,
}

impl SegmentDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(
        name: SegmentName,
        segment_type: SegmentType,
        height_lock: HeightLockSetting,
        unlock_difficulty: Difficulty,
        entry_anchor: Vec2,
        exit_anchor: Vec2,
    ) -> Self {
        Self {
            name,
            segment_type,
            height_lock,
            unlock_difficulty,
            entry_anchor,
            exit_anchor,
        }
    }

    /// Unique catalog key.
    #[must_use]
    pub fn name(&self) -> &SegmentName {
        &self.name
    }

    /// Structural type of the segment.
    #[must_use]
    pub const fn segment_type(&self) -> SegmentType {
        self.segment_type
    }

    /// Height lock behaviour of the segment.
    #[must_use]
    pub const fn height_lock(&self) -> HeightLockSetting {
        self.height_lock
    }

    /// Difficulty at which the segment's pool weight is boosted.
    #[must_use]
    pub const fn unlock_difficulty(&self) -> Difficulty {
        self.unlock_difficulty
    }

    /// Local offset of the point the previous segment connects to.
    #[must_use]
    pub const fn entry_anchor(&self) -> Vec2 {
        self.entry_anchor
    }

    /// Local offset of the point the next segment connects to.
    #[must_use]
    pub const fn exit_anchor(&self) -> Vec2 {
        self.exit_anchor
    }
}

/// Segment instance currently participating in the level.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveSegment {
    /// Pooled instance backing the segment.
    pub instance: InstanceId,
    /// Catalog name of the segment variant.
    pub name: SegmentName,
    /// Structural type copied from the descriptor.
    pub segment_type: SegmentType,
    /// Height lock copied from the descriptor.
    pub height_lock: HeightLockSetting,
    /// World position of the segment origin.
    pub position: Vec2,
    /// Local entry anchor copied from the descriptor.
    pub entry_anchor: Vec2,
    /// Local exit anchor copied from the descriptor.
    pub exit_anchor: Vec2,
}

impl ActiveSegment {
    /// Binds a descriptor to an instance placed at `position`.
    #[must_use]
    pub fn new(instance: InstanceId, descriptor: &SegmentDescriptor, position: Vec2) -> Self {
        Self {
            instance,
            name: descriptor.name().clone(),
            segment_type: descriptor.segment_type(),
            height_lock: descriptor.height_lock(),
            position,
            entry_anchor: descriptor.entry_anchor(),
            exit_anchor: descriptor.exit_anchor(),
        }
    }

    /// World position of the exit anchor.
    #[must_use]
    pub fn exit_position(&self) -> Vec2 {
        self.position + self.exit_anchor
    }

    /// World position of the entry anchor.
    #[must_use]
    pub fn entry_position(&self) -> Vec2 {
        self.position + self.entry_anchor
    }
}

/// Transform and bookkeeping computed for a segment about to be activated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// World position of the segment origin.
    pub position: Vec2,
    /// Gap tier chosen in front of the segment.
    pub gap: GapLength,
    /// Distance that separates the previous exit from the new entry.
    pub gap_distance: f32,
    /// Height level the level occupies after this placement.
    pub height_level: HeightLevel,
    /// Vertical offset applied relative to the previous segment.
    pub height_delta: f32,
}

/// Reason a segment was placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnKind {
    /// Opening segment placed when generation starts.
    Opening,
    /// Segment chosen by ordinary selection.
    Ordinary,
    /// Checkpoint forced at a stage boundary.
    Checkpoint,
}

/// Commands that express all permissible level mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the startup countdown by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Replaces the medium gap distance.
    ConfigureMediumGap {
        /// Distance assigned to [`GapLength::Medium`].
        distance: f32,
    },
    /// Registers an acquired instance as the new current segment.
    PlaceSegment {
        /// Instance handed out by the pooling collaborator.
        instance: InstanceId,
        /// Catalog name of the placed segment.
        name: SegmentName,
        /// Transform computed for the segment.
        placement: Placement,
        /// Reason the segment was placed.
        kind: SpawnKind,
    },
    /// Moves the level into the next stage and raises the difficulty.
    AdvanceStage {
        /// Total distance traveled when the stage boundary was reached.
        distance_traveled: f32,
    },
    /// Reports that a segment instance left the processing window.
    RecycleSegment {
        /// Instance that was returned to its pool.
        instance: InstanceId,
    },
    /// Reports that the player entered the checkpoint segment.
    EnterCheckpoint {
        /// Total distance traveled on entry; marks the start of the new stage.
        distance_traveled: f32,
    },
    /// Reports that the player left the checkpoint segment.
    ExitCheckpoint,
}

/// Events reported by the level after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the startup delay elapsed and spawning may begin.
    GenerationStarted,
    /// Announces a new medium gap distance.
    MediumGapChanged {
        /// Distance now assigned to [`GapLength::Medium`].
        distance: f32,
    },
    /// Confirms that a segment became the current segment.
    SegmentPlaced {
        /// Instance that was placed.
        instance: InstanceId,
        /// Catalog name of the placed segment.
        name: SegmentName,
        /// Structural type of the placed segment.
        segment_type: SegmentType,
        /// Transform applied to the segment.
        placement: Placement,
        /// Reason the segment was placed.
        kind: SpawnKind,
    },
    /// Confirms that a checkpoint was spawned and ordinary spawning is blocked.
    CheckpointSpawned {
        /// Instance backing the checkpoint segment.
        instance: InstanceId,
    },
    /// Announces a stage transition.
    StageAdvanced {
        /// Stage that just began.
        stage: StageNumber,
        /// Length of the stage that just began.
        stage_length: f32,
    },
    /// Difficulty observer notification emitted on every increment.
    DifficultyIncreased {
        /// Difficulty after the increment.
        difficulty: Difficulty,
    },
    /// Reports that a segment's pool weight was raised by a difficulty unlock.
    SegmentWeightBoosted {
        /// Segment whose weight changed.
        name: SegmentName,
        /// Weight after the boost.
        weight: u32,
    },
    /// Confirms that an instance was recycled.
    SegmentRecycled {
        /// Recycled instance.
        instance: InstanceId,
        /// Active segment count after the decrement.
        active_segments: u32,
    },
    /// Confirms the checkpoint entry signal.
    CheckpointEntered {
        /// Distance marker recorded as the start of the stage.
        stage_start: f32,
    },
    /// Confirms the checkpoint exit signal; ordinary spawning resumes.
    CheckpointExited,
}

/// Errors reported by the pooling collaborator when handing out an instance.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AcquireError {
    /// The collaborator holds no pool for the requested segment.
    #[error("no pool registered for segment `{name}`")]
    UnknownSegment {
        /// Requested segment.
        name: SegmentName,
    },
    /// The pool for the requested segment has no inactive instance left.
    #[error("pool for segment `{name}` is exhausted")]
    Exhausted {
        /// Requested segment.
        name: SegmentName,
    },
}

/// Pooling and lifecycle collaborator that owns segment instances.
///
/// The collaborator is also responsible for reporting instances that leave
/// the processing window back to the generation loop.
pub trait SegmentPooler {
    /// Hands out an inactive, reset instance of the named segment.
    fn acquire(&mut self, name: &SegmentName) -> Result<InstanceId, AcquireError>;

    /// Makes a previously acquired instance visible at the computed placement.
    fn activate(&mut self, instance: InstanceId, placement: &Placement);
}

/// Player capability collaborator used to size medium gaps.
pub trait PlayerCapability {
    /// Airborne time in seconds of the requested jump.
    fn jump_traversal_time(&self, kind: JumpKind) -> f32;

    /// Current horizontal scroll speed in world units per second.
    fn current_scroll_speed(&self) -> f32;
}

/// Simulation status collaborator consulted on every tick.
pub trait SimulationStatus {
    /// Reports whether the simulation is actively running.
    fn is_running(&self) -> bool;

    /// Total distance traveled since the run began.
    fn distance_traveled(&self) -> f32;

    /// Horizontal world position of the viewpoint.
    fn viewpoint_x(&self) -> f32;

    /// Far horizontal edge of the visible/recycle window.
    fn recycle_far_edge(&self) -> f32;
}

/// Converts a configured delay in seconds into a duration, treating invalid input as zero.
#[must_use]
pub fn seconds(value: f32) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f32(value)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_type_indices_are_dense() {
        for (position, segment_type) in SegmentType::ALL.iter().enumerate() {
            assert_eq!(segment_type.index(), position);
        }
    }

    #[test]
    fn gap_indices_are_dense() {
        for (position, gap) in GapLength::ALL.iter().enumerate() {
            assert_eq!(gap.index(), position);
        }
    }

    #[test]
    fn height_level_clamps_into_bounds() {
        assert_eq!(HeightLevel::clamped(0, 3).get(), 1);
        assert_eq!(HeightLevel::clamped(-4, 3).get(), 1);
        assert_eq!(HeightLevel::clamped(2, 3).get(), 2);
        assert_eq!(HeightLevel::clamped(9, 3).get(), 3);
        assert_eq!(HeightLevel::clamped(5, 0).get(), 1);
    }

    #[test]
    fn only_unlocked_segments_allow_height_change() {
        assert!(HeightLockSetting::None.allows_height_change());
        assert!(!HeightLockSetting::LockToPrevious.allows_height_change());
        assert!(!HeightLockSetting::LockToNext.allows_height_change());
        assert!(!HeightLockSetting::LockBoth.allows_height_change());
    }

    #[test]
    fn active_segment_anchors_follow_position() {
        let descriptor = SegmentDescriptor::new(
            SegmentName::new("flat"),
            SegmentType::Ground,
            HeightLockSetting::None,
            Difficulty::INITIAL,
            Vec2::new(-5.0, 0.0),
            Vec2::new(5.0, 1.0),
        );
        let active = ActiveSegment::new(InstanceId::new(3), &descriptor, Vec2::new(20.0, 2.0));
        assert_eq!(active.entry_position(), Vec2::new(15.0, 2.0));
        assert_eq!(active.exit_position(), Vec2::new(25.0, 3.0));
    }

    #[test]
    fn stage_number_never_drops_below_first() {
        assert_eq!(StageNumber::new(0), StageNumber::FIRST);
        assert_eq!(StageNumber::FIRST.next().get(), 2);
    }

    #[test]
    fn seconds_rejects_invalid_delays() {
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f32::NAN), Duration::ZERO);
        assert_eq!(seconds(1.5), Duration::from_millis(1_500));
    }
}
