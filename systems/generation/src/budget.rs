use endless_runway_world::{query, Level};

/// Result of the per-tick spawn gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnGate {
    /// Spawning may proceed.
    Open,
    /// A checkpoint is active and ordinary spawning waits for its exit.
    Blocked,
    /// The active segment budget is used up.
    BudgetExhausted,
    /// Enough level is generated ahead of the window edge.
    LookAheadSatisfied,
}

/// Enforces the active segment cap and the look-ahead margin.
#[derive(Clone, Copy, Debug)]
pub struct BudgetGuard {
    margin: f32,
}

impl BudgetGuard {
    /// Creates a guard that stops spawning once the current exit is `margin` past the far edge.
    #[must_use]
    pub const fn new(margin: f32) -> Self {
        Self { margin }
    }

    /// Decides whether the level may spawn this tick.
    #[must_use]
    pub fn check(&self, level: &Level, far_edge: f32) -> SpawnGate {
        if query::is_spawning_blocked(level) {
            return SpawnGate::Blocked;
        }
        if !query::has_budget(level) {
            return SpawnGate::BudgetExhausted;
        }
        if let Some(current) = query::current_segment(level) {
            if far_edge - current.exit_position().x < self.margin {
                return SpawnGate::LookAheadSatisfied;
            }
        }
        SpawnGate::Open
    }
}
