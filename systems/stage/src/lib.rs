#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Stage progression and difficulty escalation.
//!
//! The controller watches how far the level reaches past the start of the
//! current stage. Once the stage length is covered it requests a stage advance
//! and a medium gap refresh, and tells the caller whether a checkpoint segment
//! must be forced in.

use endless_runway_core::{Command, JumpKind, PlayerCapability, SegmentName};
use endless_runway_world::{medium_gap_distance, query, Level};

/// Outcome of a stage check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// The stage boundary has not been reached.
    Continue,
    /// The stage advanced; ordinary spawning is skipped this tick.
    Advanced {
        /// Checkpoint segment that must be force-spawned, if checkpoints are active.
        checkpoint: Option<SegmentName>,
    },
}

/// Pure system that decides when the level enters the next stage.
#[derive(Debug)]
pub struct StageController {
    checkpoint: Option<SegmentName>,
}

impl StageController {
    /// Creates a controller for the provided level.
    #[must_use]
    pub fn new(level: &Level) -> Self {
        let checkpoint = query::checkpoints_active(level)
            .then(|| query::config(level).checkpoint.segment.clone())
            .flatten();
        Self { checkpoint }
    }

    /// Checks the stage boundary and emits the commands that advance it.
    pub fn handle<P>(
        &self,
        level: &Level,
        distance_traveled: f32,
        viewpoint_x: f32,
        capability: &P,
        out: &mut Vec<Command>,
    ) -> StageDecision
    where
        P: PlayerCapability + ?Sized,
    {
        let Some(progress) = stage_progress(level, distance_traveled, viewpoint_x) else {
            return StageDecision::Continue;
        };
        if progress < query::stage_length(level) {
            return StageDecision::Continue;
        }

        tracing::debug!(
            progress,
            stage_length = query::stage_length(level),
            "stage boundary reached"
        );
        out.push(Command::AdvanceStage { distance_traveled });
        out.push(Command::ConfigureMediumGap {
            distance: medium_gap(level, capability),
        });

        StageDecision::Advanced {
            checkpoint: self.checkpoint.clone(),
        }
    }
}

/// Distance covered in the current stage, counting the generated look-ahead.
///
/// Returns `None` while the level has no current segment.
#[must_use]
pub fn stage_progress(level: &Level, distance_traveled: f32, viewpoint_x: f32) -> Option<f32> {
    let current = query::current_segment(level)?;
    let since_start = distance_traveled - query::stage_start(level);
    Some(since_start + (current.exit_position().x - viewpoint_x))
}

/// Medium gap distance for the player's current capability.
#[must_use]
pub fn medium_gap<P>(level: &Level, capability: &P) -> f32
where
    P: PlayerCapability + ?Sized,
{
    medium_gap_distance(
        capability.jump_traversal_time(JumpKind::Normal),
        capability.current_scroll_speed(),
        query::config(level).gaps.reach_factor,
    )
}
