#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Two-tier segment selection with repeat suppression and a scripted override.

mod spawnables;

use endless_runway_core::{GenerationConfig, SegmentName, SegmentType, TypeTunings};
use endless_runway_pool::{PoolError, WeightedPool};
use endless_runway_world::{query, Level};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

pub use spawnables::SpawnablePicker;

/// Failures raised while choosing a segment.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The type-level pool could not be sampled.
    #[error("segment type pool cannot be sampled")]
    TypePool(#[source] PoolError),
    /// A sampled type has no selectable segment.
    #[error("no selectable {segment_type} segment")]
    InstancePool {
        /// Type whose instance pool failed.
        segment_type: SegmentType,
        /// Underlying pool failure.
        #[source]
        source: PoolError,
    },
    /// A type with a positive weight has no segment at all.
    #[error("{segment_type} segments are weighted but none are configured")]
    MissingSegments {
        /// Type without segments.
        segment_type: SegmentType,
    },
}

/// Scripted sequence cycled instead of weighted selection.
#[derive(Clone, Debug)]
struct Script {
    sequence: Vec<SegmentName>,
    cursor: usize,
}

impl Script {
    fn advance(&mut self) -> Option<SegmentName> {
        if self.sequence.is_empty() {
            return None;
        }
        if self.cursor >= self.sequence.len() {
            self.cursor = 0;
        }
        let name = self.sequence[self.cursor].clone();
        self.cursor += 1;
        Some(name)
    }
}

/// Chooses the next segment to spawn.
#[derive(Debug)]
pub struct Selector {
    type_pool: WeightedPool<SegmentType>,
    tunings: TypeTunings,
    script: Option<Script>,
    rng: ChaCha8Rng,
}

impl Selector {
    /// Creates a selector whose random stream starts at `seed`.
    pub fn new(
        config: &GenerationConfig,
        level: &Level,
        seed: u64,
    ) -> Result<Self, SelectionError> {
        let mut type_pool = WeightedPool::new();
        for segment_type in SegmentType::ALL {
            let weight = config.types.get(segment_type).weight;
            type_pool
                .add(segment_type, weight)
                .map_err(SelectionError::TypePool)?;
        }

        let script = config.scripted.enabled.then(|| Script {
            sequence: config.scripted.sequence.clone(),
            cursor: 0,
        });

        if script.is_none() {
            let catalog = query::catalog(level);
            for segment_type in SegmentType::ALL {
                let weighted = config.types.get(segment_type).weight > 0;
                if weighted && catalog.pool(segment_type).is_empty() {
                    return Err(SelectionError::MissingSegments { segment_type });
                }
            }
        }

        Ok(Self {
            type_pool,
            tunings: config.types,
            script,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Chooses the segment that follows the level's current segment.
    ///
    /// Returns `None` only in scripted mode with an empty sequence.
    pub fn select(&mut self, level: &Level) -> Result<Option<SegmentName>, SelectionError> {
        if let Some(script) = self.script.as_mut() {
            return Ok(script.advance());
        }

        let previous = query::current_segment(level).map(|segment| segment.segment_type);
        let segment_type = self.select_type(previous)?;
        let name = query::catalog(level)
            .sample(segment_type, &mut self.rng)
            .map_err(|source| SelectionError::InstancePool {
                segment_type,
                source,
            })?;

        tracing::trace!(%segment_type, segment = %name, "segment selected");
        Ok(Some(name.clone()))
    }

    fn select_type(
        &mut self,
        previous: Option<SegmentType>,
    ) -> Result<SegmentType, SelectionError> {
        if let Some(previous) = previous {
            let weight = self.type_weight(previous);
            let modifier = self.tunings.get(previous).repeat_modifier;
            let suppressed = suppressed_weight(weight, modifier);
            self.set_type_weight(previous, suppressed)?;
        }

        let chosen = *self
            .type_pool
            .sample(&mut self.rng)
            .map_err(SelectionError::TypePool)?;

        if let Some(previous) = previous {
            if chosen != previous {
                let baseline = self.tunings.get(previous).weight;
                self.set_type_weight(previous, baseline)?;
            }
        }
        Ok(chosen)
    }

    fn set_type_weight(
        &mut self,
        segment_type: SegmentType,
        weight: u32,
    ) -> Result<(), SelectionError> {
        self.type_pool
            .set_weight(&segment_type, weight)
            .map_err(SelectionError::TypePool)
    }

    /// Current weight of a segment type, including any repeat suppression.
    #[must_use]
    pub fn type_weight(&self, segment_type: SegmentType) -> u32 {
        self.type_pool.weight(&segment_type).unwrap_or(0)
    }

    /// Reports whether the scripted sequence replaces weighted selection.
    #[must_use]
    pub fn is_scripted(&self) -> bool {
        self.script.is_some()
    }
}

/// Repeat-suppressed weight, `floor(weight × modifier)`.
fn suppressed_weight(weight: u32, modifier: f32) -> u32 {
    (f64::from(weight) * f64::from(modifier)).floor() as u32
}
