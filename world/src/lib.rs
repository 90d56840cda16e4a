#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative level state for the Endless Runway generator.
//!
//! The [`Level`] owns the segment catalog, the gap table and the generation
//! bookkeeping. It is only ever mutated through [`apply`]; systems observe it
//! through the [`query`] module.

mod catalog;
mod gaps;

use std::time::Duration;

use endless_runway_core::{
    ActiveSegment, Command, ConfigError, Difficulty, Event, GapLength, GenerationConfig,
    HeightLevel, InstanceId, Placement, SegmentName, SpawnKind, StageNumber,
};
use endless_runway_pool::PoolError;
use thiserror::Error;

pub use catalog::Catalog;
pub use gaps::{medium_gap_distance, GapTable};

/// Errors raised while building or mutating the level.
#[derive(Debug, Error)]
pub enum LevelError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A segment name was declared twice.
    #[error("segment `{name}` is declared more than once")]
    DuplicateSegment {
        /// Duplicated name.
        name: SegmentName,
    },
    /// A command referenced a segment missing from the catalog.
    #[error("segment `{name}` is not in the catalog")]
    UnknownSegment {
        /// Unknown name.
        name: SegmentName,
    },
    /// An instance pool rejected an operation.
    #[error("instance pool rejected segment `{name}`")]
    Pool {
        /// Segment the operation targeted.
        name: SegmentName,
        /// Underlying pool failure.
        #[source]
        source: PoolError,
    },
    /// A placement would exceed the active segment budget.
    #[error("active segment budget of {max} is exhausted")]
    BudgetExceeded {
        /// Configured maximum.
        max: u32,
    },
}

/// Mutable bookkeeping of the generation run.
#[derive(Clone, Debug)]
struct GenerationState {
    previous: Option<ActiveSegment>,
    current: Option<ActiveSegment>,
    active_segments: u32,
    height_level: HeightLevel,
    gap: GapLength,
    stage: StageNumber,
    stage_length: f32,
    stage_start: f32,
    spawning_blocked: bool,
    difficulty: Difficulty,
    start_countdown: Duration,
    started: bool,
}

impl GenerationState {
    fn new(config: &GenerationConfig) -> Self {
        let stage = StageNumber::FIRST;
        Self {
            previous: None,
            current: None,
            active_segments: 0,
            height_level: HeightLevel::LOWEST,
            gap: GapLength::NoGap,
            stage,
            stage_length: config
                .stage_growth
                .length_for(config.base_stage_length, stage),
            stage_start: 0.0,
            spawning_blocked: false,
            difficulty: Difficulty::INITIAL,
            start_countdown: config.start_delay(),
            started: false,
        }
    }
}

/// Authoritative level state.
#[derive(Clone, Debug)]
pub struct Level {
    config: GenerationConfig,
    catalog: Catalog,
    gaps: GapTable,
    state: GenerationState,
}

impl Level {
    /// Creates a level from a configuration and the initial medium gap distance.
    pub fn new(config: GenerationConfig, medium_gap: f32) -> Result<Self, LevelError> {
        config.validate()?;
        let catalog = Catalog::from_config(&config)?;
        let gaps = GapTable::new(&config.gaps, medium_gap);
        let state = GenerationState::new(&config);
        Ok(Self {
            config,
            catalog,
            gaps,
            state,
        })
    }

    fn checkpoints_active(&self) -> bool {
        self.config.checkpoint.enabled && self.config.checkpoint.segment.is_some()
    }
}

/// Applies the provided command to the level, mutating state deterministically.
pub fn apply(
    level: &mut Level,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), LevelError> {
    match command {
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            if !level.state.started {
                level.state.start_countdown = level.state.start_countdown.saturating_sub(dt);
                if level.state.start_countdown.is_zero() {
                    level.state.started = true;
                    tracing::info!("start delay elapsed, generation started");
                    out_events.push(Event::GenerationStarted);
                }
            }
        }
        Command::ConfigureMediumGap { distance } => {
            level.gaps.set_medium(distance);
            out_events.push(Event::MediumGapChanged {
                distance: level.gaps.medium(),
            });
        }
        Command::PlaceSegment {
            instance,
            name,
            placement,
            kind,
        } => place_segment(level, instance, name, placement, kind, out_events)?,
        Command::AdvanceStage { distance_traveled } => {
            advance_stage(level, distance_traveled, out_events)?;
        }
        Command::RecycleSegment { instance } => {
            let state = &mut level.state;
            if state.active_segments == 0 {
                tracing::warn!(
                    instance = instance.get(),
                    "recycle notification with no active segments"
                );
            } else {
                state.active_segments -= 1;
            }
            out_events.push(Event::SegmentRecycled {
                instance,
                active_segments: state.active_segments,
            });
        }
        Command::EnterCheckpoint { distance_traveled } => {
            level.state.stage_start = distance_traveled;
            tracing::info!(stage_start = distance_traveled, "checkpoint entered");
            out_events.push(Event::CheckpointEntered {
                stage_start: distance_traveled,
            });
        }
        Command::ExitCheckpoint => {
            level.state.spawning_blocked = false;
            tracing::info!("checkpoint exited, spawning resumed");
            out_events.push(Event::CheckpointExited);
        }
    }
    Ok(())
}

fn place_segment(
    level: &mut Level,
    instance: InstanceId,
    name: SegmentName,
    placement: Placement,
    kind: SpawnKind,
    out_events: &mut Vec<Event>,
) -> Result<(), LevelError> {
    let max = level.config.max_active_segments;
    if level.state.active_segments >= max {
        return Err(LevelError::BudgetExceeded { max });
    }

    let descriptor = level.catalog.require(&name)?;
    let segment_type = descriptor.segment_type();
    let segment = ActiveSegment::new(instance, descriptor, placement.position);

    let state = &mut level.state;
    state.previous = state.current.replace(segment);
    state.active_segments += 1;
    state.height_level = HeightLevel::clamped(
        i64::from(placement.height_level.get()),
        level.config.heights.levels,
    );
    state.gap = placement.gap;

    tracing::debug!(
        instance = instance.get(),
        segment = %name,
        %segment_type,
        x = placement.position.x,
        y = placement.position.y,
        gap = ?placement.gap,
        height = state.height_level.get(),
        active = state.active_segments,
        "segment placed"
    );

    out_events.push(Event::SegmentPlaced {
        instance,
        name,
        segment_type,
        placement,
        kind,
    });

    if kind == SpawnKind::Checkpoint {
        state.spawning_blocked = true;
        tracing::info!(instance = instance.get(), "checkpoint spawned, spawning blocked");
        out_events.push(Event::CheckpointSpawned { instance });
    }
    Ok(())
}

fn advance_stage(
    level: &mut Level,
    distance_traveled: f32,
    out_events: &mut Vec<Event>,
) -> Result<(), LevelError> {
    let checkpoints_active = level.checkpoints_active();
    let state = &mut level.state;
    state.stage = state.stage.next();
    state.stage_length = level
        .config
        .stage_growth
        .length_for(level.config.base_stage_length, state.stage);
    state.difficulty = state.difficulty.next();
    if !checkpoints_active {
        state.stage_start = distance_traveled;
    }

    tracing::info!(
        stage = state.stage.get(),
        stage_length = state.stage_length,
        difficulty = state.difficulty.get(),
        "stage advanced"
    );
    out_events.push(Event::StageAdvanced {
        stage: state.stage,
        stage_length: state.stage_length,
    });
    out_events.push(Event::DifficultyIncreased {
        difficulty: state.difficulty,
    });

    let difficulty = state.difficulty;
    let boosted = level
        .catalog
        .boost_unlocked(difficulty, level.config.difficulty_weight_increment)?;
    for (name, weight) in boosted {
        tracing::info!(segment = %name, weight, "segment weight boosted");
        out_events.push(Event::SegmentWeightBoosted { name, weight });
    }
    Ok(())
}

/// Query functions that provide read-only access to the level state.
pub mod query {
    use endless_runway_core::{
        ActiveSegment, Difficulty, GapLength, GenerationConfig, HeightLevel, InstanceId,
        SegmentName, SegmentType, StageNumber, Vec2,
    };
    use serde::Serialize;

    use super::{Catalog, GapTable, Level};

    /// Configuration the level was built from.
    #[must_use]
    pub fn config(level: &Level) -> &GenerationConfig {
        &level.config
    }

    /// Segment catalog with its instance pools.
    #[must_use]
    pub fn catalog(level: &Level) -> &Catalog {
        &level.catalog
    }

    /// Gap tier distances.
    #[must_use]
    pub fn gap_table(level: &Level) -> &GapTable {
        &level.gaps
    }

    /// Most recently placed segment.
    #[must_use]
    pub fn current_segment(level: &Level) -> Option<&ActiveSegment> {
        level.state.current.as_ref()
    }

    /// Segment placed before the current one.
    #[must_use]
    pub fn previous_segment(level: &Level) -> Option<&ActiveSegment> {
        level.state.previous.as_ref()
    }

    /// Number of segments currently counted as active.
    #[must_use]
    pub fn active_segments(level: &Level) -> u32 {
        level.state.active_segments
    }

    /// Reports whether another segment fits in the active budget.
    #[must_use]
    pub fn has_budget(level: &Level) -> bool {
        level.state.active_segments < level.config.max_active_segments
    }

    /// Height level reached by the last placement.
    #[must_use]
    pub fn height_level(level: &Level) -> HeightLevel {
        level.state.height_level
    }

    /// Gap tier chosen for the last placement.
    #[must_use]
    pub fn current_gap(level: &Level) -> GapLength {
        level.state.gap
    }

    /// Stage the run is in.
    #[must_use]
    pub fn stage(level: &Level) -> StageNumber {
        level.state.stage
    }

    /// Length of the current stage.
    #[must_use]
    pub fn stage_length(level: &Level) -> f32 {
        level.state.stage_length
    }

    /// Distance traveled when the current stage started.
    #[must_use]
    pub fn stage_start(level: &Level) -> f32 {
        level.state.stage_start
    }

    /// Current difficulty.
    #[must_use]
    pub fn difficulty(level: &Level) -> Difficulty {
        level.state.difficulty
    }

    /// Reports whether ordinary spawning waits for a checkpoint exit.
    #[must_use]
    pub fn is_spawning_blocked(level: &Level) -> bool {
        level.state.spawning_blocked
    }

    /// Reports whether the start delay has elapsed.
    #[must_use]
    pub fn has_started(level: &Level) -> bool {
        level.state.started
    }

    /// Reports whether stage boundaries insert a checkpoint.
    #[must_use]
    pub fn checkpoints_active(level: &Level) -> bool {
        level.checkpoints_active()
    }

    /// Captures a serializable summary of the generation state.
    #[must_use]
    pub fn snapshot(level: &Level) -> GenerationSnapshot {
        let state = &level.state;
        GenerationSnapshot {
            stage: state.stage,
            stage_length: state.stage_length,
            stage_start: state.stage_start,
            difficulty: state.difficulty,
            active_segments: state.active_segments,
            max_active_segments: level.config.max_active_segments,
            height_level: state.height_level,
            gap: state.gap,
            medium_gap: level.gaps.medium(),
            spawning_blocked: state.spawning_blocked,
            started: state.started,
            current: state.current.as_ref().map(SegmentSnapshot::from),
        }
    }

    /// Serializable summary of the generation state.
    #[derive(Clone, Debug, PartialEq, Serialize)]
    pub struct GenerationSnapshot {
        /// Stage the run is in.
        pub stage: StageNumber,
        /// Length of the current stage.
        pub stage_length: f32,
        /// Distance marker of the stage start.
        pub stage_start: f32,
        /// Current difficulty.
        pub difficulty: Difficulty,
        /// Active segment count.
        pub active_segments: u32,
        /// Active segment budget.
        pub max_active_segments: u32,
        /// Current height level.
        pub height_level: HeightLevel,
        /// Gap tier of the last placement.
        pub gap: GapLength,
        /// Medium gap distance.
        pub medium_gap: f32,
        /// Whether ordinary spawning is blocked.
        pub spawning_blocked: bool,
        /// Whether the start delay has elapsed.
        pub started: bool,
        /// Current segment, if any.
        pub current: Option<SegmentSnapshot>,
    }

    /// Serializable view of a placed segment.
    #[derive(Clone, Debug, PartialEq, Serialize)]
    pub struct SegmentSnapshot {
        /// Backing instance.
        pub instance: InstanceId,
        /// Catalog name.
        pub name: SegmentName,
        /// Structural type.
        pub segment_type: SegmentType,
        /// World position of the origin.
        pub position: Vec2,
        /// World position of the exit anchor.
        pub exit: Vec2,
    }

    impl From<&ActiveSegment> for SegmentSnapshot {
        fn from(segment: &ActiveSegment) -> Self {
            Self {
                instance: segment.instance,
                name: segment.name.clone(),
                segment_type: segment.segment_type,
                position: segment.position,
                exit: segment.exit_position(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use endless_runway_core::{CheckpointConfig, SegmentSpec, SegmentType, Vec2};

    fn segment_entry(
        name: &str,
        segment_type: SegmentType,
        weight: u32,
        unlock: u32,
    ) -> SegmentSpec {
        SegmentSpec {
            name: SegmentName::new(name),
            segment_type,
            height_lock: Default::default(),
            unlock_difficulty: unlock,
            weight,
            entry_anchor: Vec2::ZERO,
            exit_anchor: Vec2::new(10.0, 0.0),
        }
    }

    fn config() -> GenerationConfig {
        GenerationConfig {
            max_active_segments: 2,
            segments: vec![
                segment_entry("flat", SegmentType::Ground, 10, 0),
                segment_entry("spikes", SegmentType::Jumper, 5, 2),
                segment_entry("shop", SegmentType::Ground, 10, 0),
            ],
            checkpoint: CheckpointConfig {
                enabled: true,
                segment: Some(SegmentName::new("shop")),
                baseline_y: 0.0,
            },
            ..GenerationConfig::default()
        }
    }

    fn level() -> Level {
        Level::new(config(), 4.0).expect("level builds")
    }

    fn placement(x: f32) -> Placement {
        Placement {
            position: Vec2::new(x, 0.0),
            gap: GapLength::NoGap,
            gap_distance: 0.0,
            height_level: HeightLevel::LOWEST,
            height_delta: 0.0,
        }
    }

    fn place(level: &mut Level, id: u32, name: &str, kind: SpawnKind, events: &mut Vec<Event>) {
        apply(
            level,
            Command::PlaceSegment {
                instance: InstanceId::new(id),
                name: SegmentName::new(name),
                placement: placement(id as f32 * 10.0),
                kind,
            },
            events,
        )
        .expect("placement applies");
    }

    fn spikes_weight(level: &Level) -> u32 {
        query::catalog(level)
            .pool(SegmentType::Jumper)
            .weight(&SegmentName::new("spikes"))
            .expect("spikes registered")
    }

    #[test]
    fn start_delay_counts_down_before_generation_starts() {
        let mut level = level();
        let mut events = Vec::new();

        apply(
            &mut level,
            Command::Tick {
                dt: Duration::from_millis(600),
            },
            &mut events,
        )
        .expect("tick");
        assert!(!query::has_started(&level));

        apply(
            &mut level,
            Command::Tick {
                dt: Duration::from_millis(600),
            },
            &mut events,
        )
        .expect("tick");
        assert!(query::has_started(&level));
        assert_eq!(
            events.iter().filter(|event| **event == Event::GenerationStarted).count(),
            1
        );
    }

    #[test]
    fn placement_rotates_current_into_previous() {
        let mut level = level();
        let mut events = Vec::new();
        place(&mut level, 1, "flat", SpawnKind::Ordinary, &mut events);
        place(&mut level, 2, "flat", SpawnKind::Ordinary, &mut events);

        let previous = query::previous_segment(&level).expect("previous");
        let current = query::current_segment(&level).expect("current");
        assert_eq!(previous.instance, InstanceId::new(1));
        assert_eq!(current.instance, InstanceId::new(2));
        assert_eq!(query::active_segments(&level), 2);
        assert!(!query::has_budget(&level));
    }

    #[test]
    fn placement_beyond_budget_is_rejected() {
        let mut level = level();
        let mut events = Vec::new();
        place(&mut level, 1, "flat", SpawnKind::Ordinary, &mut events);
        place(&mut level, 2, "flat", SpawnKind::Ordinary, &mut events);

        let result = apply(
            &mut level,
            Command::PlaceSegment {
                instance: InstanceId::new(3),
                name: SegmentName::new("flat"),
                placement: placement(30.0),
                kind: SpawnKind::Ordinary,
            },
            &mut events,
        );
        assert!(matches!(result, Err(LevelError::BudgetExceeded { max: 2 })));
        assert_eq!(query::active_segments(&level), 2);
    }

    #[test]
    fn unknown_segment_placement_fails() {
        let mut level = level();
        let mut events = Vec::new();
        let result = apply(
            &mut level,
            Command::PlaceSegment {
                instance: InstanceId::new(1),
                name: SegmentName::new("lava"),
                placement: placement(0.0),
                kind: SpawnKind::Ordinary,
            },
            &mut events,
        );
        assert!(matches!(result, Err(LevelError::UnknownSegment { .. })));
        assert!(events.is_empty());
    }

    #[test]
    fn recycle_at_zero_saturates() {
        let mut level = level();
        let mut events = Vec::new();
        apply(
            &mut level,
            Command::RecycleSegment {
                instance: InstanceId::new(9),
            },
            &mut events,
        )
        .expect("recycle");
        assert_eq!(query::active_segments(&level), 0);
        assert_eq!(
            events,
            vec![Event::SegmentRecycled {
                instance: InstanceId::new(9),
                active_segments: 0,
            }]
        );
    }

    #[test]
    fn difficulty_boosts_weight_exactly_at_unlock() {
        let mut level = level();
        let mut events = Vec::new();
        let baseline = spikes_weight(&level);

        apply(&mut level, Command::AdvanceStage { distance_traveled: 100.0 }, &mut events)
            .expect("advance to difficulty 1");
        assert_eq!(query::difficulty(&level), Difficulty::new(1));
        assert_eq!(spikes_weight(&level), baseline);

        apply(&mut level, Command::AdvanceStage { distance_traveled: 275.0 }, &mut events)
            .expect("advance to difficulty 2");
        assert_eq!(spikes_weight(&level), baseline + 10);
        assert!(events.contains(&Event::SegmentWeightBoosted {
            name: SegmentName::new("spikes"),
            weight: baseline + 10,
        }));

        apply(&mut level, Command::AdvanceStage { distance_traveled: 581.25 }, &mut events)
            .expect("advance to difficulty 3");
        assert_eq!(spikes_weight(&level), baseline + 10);
    }

    #[test]
    fn stage_lengths_grow_exponentially() {
        let mut level = level();
        let mut events = Vec::new();
        assert!((query::stage_length(&level) - 100.0).abs() < 1e-3);

        apply(&mut level, Command::AdvanceStage { distance_traveled: 100.0 }, &mut events)
            .expect("advance");
        assert_eq!(query::stage(&level).get(), 2);
        assert!((query::stage_length(&level) - 175.0).abs() < 1e-3);

        apply(&mut level, Command::AdvanceStage { distance_traveled: 275.0 }, &mut events)
            .expect("advance");
        assert!((query::stage_length(&level) - 306.25).abs() < 1e-3);
    }

    #[test]
    fn checkpoint_blocks_until_exit_signal() {
        let mut level = level();
        let mut events = Vec::new();
        place(&mut level, 1, "shop", SpawnKind::Checkpoint, &mut events);
        assert!(query::is_spawning_blocked(&level));
        assert!(events.contains(&Event::CheckpointSpawned {
            instance: InstanceId::new(1)
        }));

        apply(
            &mut level,
            Command::EnterCheckpoint {
                distance_traveled: 120.0,
            },
            &mut events,
        )
        .expect("enter");
        assert!(query::is_spawning_blocked(&level));
        assert_eq!(query::stage_start(&level), 120.0);

        apply(&mut level, Command::ExitCheckpoint, &mut events).expect("exit");
        assert!(!query::is_spawning_blocked(&level));
    }

    #[test]
    fn stage_start_resets_at_advance_without_checkpoints() {
        let mut config = config();
        config.checkpoint.enabled = false;
        let mut level = Level::new(config, 4.0).expect("level builds");
        let mut events = Vec::new();

        apply(&mut level, Command::AdvanceStage { distance_traveled: 104.0 }, &mut events)
            .expect("advance");
        assert_eq!(query::stage_start(&level), 104.0);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut level = level();
        let mut events = Vec::new();
        place(&mut level, 1, "flat", SpawnKind::Opening, &mut events);

        let snapshot = query::snapshot(&level);
        assert_eq!(snapshot.active_segments, 1);
        assert_eq!(snapshot.medium_gap, 4.0);
        let current = snapshot.current.expect("current segment");
        assert_eq!(current.exit, Vec2::new(20.0, 0.0));
    }
}
