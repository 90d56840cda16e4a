use endless_runway_core::{GapConfig, GapLength};

/// Lookup from gap tier to world distance.
#[derive(Clone, Debug, PartialEq)]
pub struct GapTable {
    distances: [f32; GapLength::ALL.len()],
    tiers: usize,
}

impl GapTable {
    /// Builds the table from configured distances and an initial medium gap.
    #[must_use]
    pub fn new(config: &GapConfig, medium: f32) -> Self {
        let mut distances = [0.0; GapLength::ALL.len()];
        distances[GapLength::Shortest.index()] = config.shortest;
        distances[GapLength::Short.index()] = config.short;
        distances[GapLength::Medium.index()] = sanitize(medium);
        distances[GapLength::Long.index()] = config.long;
        distances[GapLength::Longest.index()] = config.longest;

        let tiers = usize::try_from(config.tiers).unwrap_or(usize::MAX);
        Self {
            distances,
            tiers: tiers.clamp(1, GapLength::AFTER_GROUND.len()),
        }
    }

    /// Distance associated with the gap tier.
    #[must_use]
    pub fn distance(&self, gap: GapLength) -> f32 {
        self.distances[gap.index()]
    }

    /// Current medium gap distance.
    #[must_use]
    pub fn medium(&self) -> f32 {
        self.distance(GapLength::Medium)
    }

    pub(crate) fn set_medium(&mut self, distance: f32) {
        self.distances[GapLength::Medium.index()] = sanitize(distance);
    }

    /// Tiers eligible for the uniform draw after a ground segment.
    #[must_use]
    pub fn after_ground_tiers(&self) -> &'static [GapLength] {
        let tiers: &'static [GapLength; 4] = &GapLength::AFTER_GROUND;
        &tiers[..self.tiers]
    }
}

/// Medium gap sized from the player's jump carry at the current scroll speed.
#[must_use]
pub fn medium_gap_distance(jump_time: f32, scroll_speed: f32, reach_factor: f32) -> f32 {
    sanitize(jump_time * scroll_speed * reach_factor)
}

fn sanitize(distance: f32) -> f32 {
    if distance.is_finite() {
        distance.max(0.0)
    } else {
        0.0
    }
}
