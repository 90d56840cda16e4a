use endless_runway_core::SpawnableConfig;
use endless_runway_pool::WeightedPool;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Chooses the content of segment spawn points.
#[derive(Debug)]
pub struct SpawnablePicker {
    pool: WeightedPool<String>,
    none_chance: f32,
    rng: ChaCha8Rng,
}

impl SpawnablePicker {
    /// Builds the picker from the configured spawnable table.
    ///
    /// Duplicate kinds keep the first declared weight.
    #[must_use]
    pub fn new(config: &SpawnableConfig, seed: u64) -> Self {
        let mut pool = WeightedPool::new();
        for kind in &config.kinds {
            if pool.add(kind.name.clone(), kind.weight).is_err() {
                tracing::warn!(spawnable = %kind.name, "duplicate spawnable kind ignored");
            }
        }

        Self {
            pool,
            none_chance: config.none_chance.clamp(0.0, 100.0),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Draws a spawnable kind, or `None` when the spawn point stays empty.
    pub fn pick(&mut self) -> Option<&str> {
        if self.pool.total_weight() == 0 {
            return None;
        }
        if self.rng.gen_range(0.0..100.0) < self.none_chance {
            return None;
        }
        self.pool.sample(&mut self.rng).ok().map(String::as_str)
    }
}
