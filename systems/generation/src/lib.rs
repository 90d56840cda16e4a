#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick driver of endless level generation.
//!
//! [`GenerationLoop`] owns the authoritative [`Level`] together with every
//! generation system. Each tick it consults the budget guard, lets the stage
//! controller claim the tick, and otherwise selects, places and activates the
//! next segment. All mutations go through `endless_runway_world::apply`, and
//! the resulting events are appended to the caller's buffer.

mod budget;

use std::time::Duration;

use endless_runway_core::{
    AcquireError, Command, Event, GenerationConfig, InstanceId, JumpKind, Placement,
    PlayerCapability, SegmentName, SegmentPooler, SimulationStatus, SpawnKind,
};
use endless_runway_system_placement::{place_at_origin, PlacementCalculator};
use endless_runway_system_selection::{SelectionError, Selector, SpawnablePicker};
use endless_runway_system_stage::{medium_gap, StageController, StageDecision};
use endless_runway_world::{apply, medium_gap_distance, query, Level, LevelError};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use budget::{BudgetGuard, SpawnGate};

const RNG_STREAM_SELECTION: &str = "selection";
const RNG_STREAM_PLACEMENT: &str = "placement";
const RNG_STREAM_SPAWNABLES: &str = "spawnables";

/// Failures that stop generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The level rejected a command or could not be built.
    #[error(transparent)]
    Level(#[from] LevelError),
    /// Segment selection failed.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// The pooling collaborator could not hand out an instance.
    #[error(transparent)]
    Acquire(#[from] AcquireError),
}

/// Endless level generator driven once per simulation tick.
#[derive(Debug)]
pub struct GenerationLoop {
    level: Level,
    selector: Selector,
    placement: PlacementCalculator,
    stage: StageController,
    spawnables: SpawnablePicker,
    guard: BudgetGuard,
    pending: Vec<Command>,
    scratch: Vec<Command>,
    opening: Option<SegmentName>,
    enabled: bool,
}

impl GenerationLoop {
    /// Builds the loop, sizing the medium gap from the player's capability.
    pub fn new<P>(config: GenerationConfig, capability: &P) -> Result<Self, GenerationError>
    where
        P: PlayerCapability + ?Sized,
    {
        let seed = config.seed;
        let medium = medium_gap_distance(
            capability.jump_traversal_time(JumpKind::Normal),
            capability.current_scroll_speed(),
            config.gaps.reach_factor,
        );
        let level = Level::new(config, medium)?;
        let config = query::config(&level);

        let selector = Selector::new(
            config,
            &level,
            derive_labeled_seed(seed, RNG_STREAM_SELECTION),
        )?;
        let placement = PlacementCalculator::new(derive_labeled_seed(seed, RNG_STREAM_PLACEMENT));
        let spawnables = SpawnablePicker::new(
            &config.spawnables,
            derive_labeled_seed(seed, RNG_STREAM_SPAWNABLES),
        );
        let stage = StageController::new(&level);
        let guard = BudgetGuard::new(config.lookahead_margin);
        let opening = config.opening.as_ref().map(|opening| opening.segment.clone());

        Ok(Self {
            level,
            selector,
            placement,
            stage,
            spawnables,
            guard,
            pending: vec![Command::ConfigureMediumGap { distance: medium }],
            scratch: Vec::new(),
            opening,
            enabled: true,
        })
    }

    /// Advances generation by one simulation tick.
    pub fn tick<S, P, C>(
        &mut self,
        dt: Duration,
        status: &S,
        pooler: &mut P,
        capability: &C,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GenerationError>
    where
        S: SimulationStatus + ?Sized,
        P: SegmentPooler + ?Sized,
        C: PlayerCapability + ?Sized,
    {
        if !self.enabled || !status.is_running() {
            return Ok(());
        }

        for command in self.pending.drain(..) {
            apply(&mut self.level, command, out_events)?;
        }

        apply(&mut self.level, Command::Tick { dt }, out_events)?;
        if !query::has_started(&self.level) {
            return Ok(());
        }

        if let Some(name) = self.opening.take() {
            let descriptor = query::catalog(&self.level).require(&name)?;
            let placement = place_at_origin(&self.level, descriptor);
            return self.spawn(name, placement, SpawnKind::Opening, pooler, out_events);
        }

        let gate = self.guard.check(&self.level, status.recycle_far_edge());
        if gate != SpawnGate::Open {
            tracing::trace!(?gate, "spawn skipped");
            return Ok(());
        }

        let decision = self.stage.handle(
            &self.level,
            status.distance_traveled(),
            status.viewpoint_x(),
            capability,
            &mut self.scratch,
        );
        for command in self.scratch.drain(..) {
            apply(&mut self.level, command, out_events)?;
        }
        if let StageDecision::Advanced { checkpoint } = decision {
            if let Some(name) = checkpoint {
                self.spawn_checkpoint(name, pooler, out_events)?;
            }
            return Ok(());
        }

        let Some(name) = self.selector.select(&self.level)? else {
            return Ok(());
        };
        let descriptor = query::catalog(&self.level).require(&name)?;
        let placement = self.placement.place_next(&self.level, descriptor);
        self.spawn(name, placement, SpawnKind::Ordinary, pooler, out_events)
    }

    fn spawn_checkpoint<P>(
        &mut self,
        name: SegmentName,
        pooler: &mut P,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GenerationError>
    where
        P: SegmentPooler + ?Sized,
    {
        let baseline_y = query::config(&self.level).checkpoint.baseline_y;
        let descriptor = query::catalog(&self.level).require(&name)?;
        let placement = self
            .placement
            .place_forced(&self.level, descriptor, baseline_y);
        self.spawn(name, placement, SpawnKind::Checkpoint, pooler, out_events)
    }

    fn spawn<P>(
        &mut self,
        name: SegmentName,
        placement: Placement,
        kind: SpawnKind,
        pooler: &mut P,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GenerationError>
    where
        P: SegmentPooler + ?Sized,
    {
        let instance = pooler.acquire(&name)?;
        apply(
            &mut self.level,
            Command::PlaceSegment {
                instance,
                name,
                placement,
                kind,
            },
            out_events,
        )?;
        pooler.activate(instance, &placement);
        Ok(())
    }

    /// Handles the pooling collaborator reporting an instance that left the window.
    pub fn on_instance_exited_window(
        &mut self,
        instance: InstanceId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GenerationError> {
        apply(
            &mut self.level,
            Command::RecycleSegment { instance },
            out_events,
        )?;
        Ok(())
    }

    /// Handles the player entering the checkpoint segment.
    pub fn enter_checkpoint(
        &mut self,
        distance_traveled: f32,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GenerationError> {
        apply(
            &mut self.level,
            Command::EnterCheckpoint { distance_traveled },
            out_events,
        )?;
        Ok(())
    }

    /// Handles the player leaving the checkpoint segment; ordinary spawning resumes.
    pub fn exit_checkpoint(&mut self, out_events: &mut Vec<Event>) -> Result<(), GenerationError> {
        apply(&mut self.level, Command::ExitCheckpoint, out_events)?;
        Ok(())
    }

    /// Refreshes the medium gap outside a stage transition, for example after a speed change.
    pub fn refresh_medium_gap<C>(
        &mut self,
        capability: &C,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GenerationError>
    where
        C: PlayerCapability + ?Sized,
    {
        let distance = medium_gap(&self.level, capability);
        apply(
            &mut self.level,
            Command::ConfigureMediumGap { distance },
            out_events,
        )?;
        Ok(())
    }

    /// Chooses the content of a spawn point, or `None` when it stays empty.
    pub fn choose_spawnable(&mut self) -> Option<&str> {
        self.spawnables.pick()
    }

    /// Enables or freezes generation. Frozen loops ignore ticks entirely.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Reports whether the loop processes ticks.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Read-only access to the level for queries.
    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }
}

fn derive_labeled_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
