#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Placement of a newly chosen segment relative to the level's current segment.

use endless_runway_core::{GapLength, HeightLevel, Placement, SegmentDescriptor, SegmentType, Vec2};
use endless_runway_world::{query, GapTable, Level};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Computes gap distances and vertical offsets for new segments.
#[derive(Debug)]
pub struct PlacementCalculator {
    rng: ChaCha8Rng,
}

impl PlacementCalculator {
    /// Creates a calculator whose random stream starts at `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Places an ordinarily selected segment after the current one.
    ///
    /// Without a current segment the entry anchor lands on the configured origin.
    pub fn place_next(&mut self, level: &Level, descriptor: &SegmentDescriptor) -> Placement {
        let Some(current) = query::current_segment(level) else {
            return place_at_origin(level, descriptor);
        };

        let (gap, gap_distance) =
            self.resolve_gap(level, descriptor.segment_type(), current.segment_type);
        let previous_level = query::height_level(level);
        let height_level = if current.height_lock.allows_height_change() {
            self.step_height(previous_level, query::config(level).heights.levels)
        } else {
            previous_level
        };
        let height_delta = height_offset(level, previous_level, height_level);

        Placement {
            position: Vec2::new(
                current.exit_position().x + gap_distance - descriptor.entry_anchor().x,
                current.position.y + height_delta,
            ),
            gap,
            gap_distance,
            height_level,
            height_delta,
        }
    }

    /// Places a forced segment at its own baseline height.
    ///
    /// The gap rule still applies and the height level snaps to the tier
    /// nearest `baseline_y`.
    pub fn place_forced(
        &mut self,
        level: &Level,
        descriptor: &SegmentDescriptor,
        baseline_y: f32,
    ) -> Placement {
        let height_level = baseline_height_level(level, baseline_y);
        let Some(current) = query::current_segment(level) else {
            let mut placement = place_at_origin(level, descriptor);
            placement.position.y = baseline_y;
            placement.height_level = height_level;
            return placement;
        };

        let (gap, gap_distance) =
            self.resolve_gap(level, descriptor.segment_type(), current.segment_type);
        Placement {
            position: Vec2::new(
                current.exit_position().x + gap_distance - descriptor.entry_anchor().x,
                baseline_y,
            ),
            gap,
            gap_distance,
            height_level,
            height_delta: 0.0,
        }
    }

    fn resolve_gap(
        &mut self,
        level: &Level,
        new_type: SegmentType,
        previous_type: SegmentType,
    ) -> (GapLength, f32) {
        let table = query::gap_table(level);
        let gap = self.choose_gap(table, new_type, previous_type, query::current_gap(level));
        let distance = if query::config(level).gaps.override_to_shortest {
            table.distance(GapLength::Shortest)
        } else {
            table.distance(gap)
        };
        (gap, distance)
    }

    /// Applies the gap rule table.
    ///
    /// After a jumper the previous gap choice is carried over unchanged.
    pub fn choose_gap(
        &mut self,
        table: &GapTable,
        new_type: SegmentType,
        previous_type: SegmentType,
        carried: GapLength,
    ) -> GapLength {
        match (new_type, previous_type) {
            (SegmentType::Jumper, _) => GapLength::Medium,
            (SegmentType::Transition, _) => GapLength::NoGap,
            (_, SegmentType::Ground) => {
                let tiers = table.after_ground_tiers();
                tiers[self.rng.gen_range(0..tiers.len())]
            }
            (_, SegmentType::Transition) => GapLength::NoGap,
            (_, SegmentType::Jumper) => carried,
        }
    }

    /// Performs one clamped random-walk step of the height level.
    pub fn step_height(&mut self, current: HeightLevel, levels: u32) -> HeightLevel {
        let value = i64::from(current.get());
        let upper = i64::from(levels.max(1));
        let min = if value <= 1 { 0 } else { -1 };
        let max = if value >= upper { 0 } else { 1 };
        let step = self.rng.gen_range(min..=max);
        HeightLevel::clamped(value + step, levels)
    }
}

/// Places a segment with its entry anchor on the configured origin.
#[must_use]
pub fn place_at_origin(level: &Level, descriptor: &SegmentDescriptor) -> Placement {
    let origin = query::config(level).origin;
    Placement {
        position: Vec2::new(origin.x - descriptor.entry_anchor().x, origin.y),
        gap: GapLength::NoGap,
        gap_distance: 0.0,
        height_level: query::height_level(level),
        height_delta: 0.0,
    }
}

/// Height tier whose world y is nearest `baseline_y`, counted up from the origin.
#[must_use]
pub fn baseline_height_level(level: &Level, baseline_y: f32) -> HeightLevel {
    let config = query::config(level);
    let interval = config.heights.interval;
    let steps = if interval > 0.0 && interval.is_finite() {
        ((baseline_y - config.origin.y) / interval).round()
    } else {
        0.0
    };
    let steps = if steps.is_finite() { steps as i64 } else { 0 };
    HeightLevel::clamped(
        i64::from(HeightLevel::LOWEST.get()) + steps,
        config.heights.levels,
    )
}

fn height_offset(level: &Level, from: HeightLevel, to: HeightLevel) -> f32 {
    let steps = i64::from(to.get()) - i64::from(from.get());
    steps as f32 * query::config(level).heights.interval
}
