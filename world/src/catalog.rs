use std::collections::BTreeMap;

use endless_runway_core::{
    Difficulty, GenerationConfig, SegmentDescriptor, SegmentName, SegmentType,
};
use endless_runway_pool::{PoolError, WeightedPool};
use rand::Rng;

use crate::LevelError;

/// Registry of segment descriptors and the per-type instance pools.
///
/// The checkpoint segment is registered as a descriptor but kept out of the
/// instance pools so it is only ever spawned by force.
#[derive(Clone, Debug)]
pub struct Catalog {
    descriptors: BTreeMap<SegmentName, SegmentDescriptor>,
    pools: [WeightedPool<SegmentName>; 3],
}

impl Catalog {
    /// Builds the catalog from the configured segment list.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, LevelError> {
        let mut catalog = Self {
            descriptors: BTreeMap::new(),
            pools: Default::default(),
        };

        for spec in &config.segments {
            let descriptor = spec.descriptor();
            if catalog.descriptors.contains_key(descriptor.name()) {
                return Err(LevelError::DuplicateSegment {
                    name: spec.name.clone(),
                });
            }

            if config.checkpoint.segment.as_ref() != Some(&spec.name) {
                catalog.pools[spec.segment_type.index()]
                    .add(spec.name.clone(), spec.weight)
                    .map_err(|source| LevelError::Pool {
                        name: spec.name.clone(),
                        source,
                    })?;
            }

            let _ = catalog.descriptors.insert(spec.name.clone(), descriptor);
        }

        Ok(catalog)
    }

    /// Looks up a descriptor by name.
    #[must_use]
    pub fn descriptor(&self, name: &SegmentName) -> Option<&SegmentDescriptor> {
        self.descriptors.get(name)
    }

    /// Looks up a descriptor by name, failing on unknown names.
    pub fn require(&self, name: &SegmentName) -> Result<&SegmentDescriptor, LevelError> {
        self.descriptor(name).ok_or_else(|| LevelError::UnknownSegment { name: name.clone() })
    }

    /// Instance pool of the provided type.
    #[must_use]
    pub fn pool(&self, segment_type: SegmentType) -> &WeightedPool<SegmentName> {
        &self.pools[segment_type.index()]
    }

    /// Draws a concrete segment name of the provided type.
    pub fn sample<R>(
        &self,
        segment_type: SegmentType,
        rng: &mut R,
    ) -> Result<&SegmentName, PoolError>
    where
        R: Rng + ?Sized,
    {
        self.pool(segment_type).sample(rng)
    }

    /// Number of registered descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Reports whether no descriptor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Adds `increment` to the pool weight of every entry unlocked at `difficulty`.
    ///
    /// Returns the boosted names with their new weights, in name order.
    pub(crate) fn boost_unlocked(
        &mut self,
        difficulty: Difficulty,
        increment: u32,
    ) -> Result<Vec<(SegmentName, u32)>, LevelError> {
        let mut boosted = Vec::new();
        for descriptor in self.descriptors.values() {
            if descriptor.unlock_difficulty() != difficulty {
                continue;
            }

            let pool = &mut self.pools[descriptor.segment_type().index()];
            if !pool.contains(descriptor.name()) {
                continue;
            }

            let name = descriptor.name();
            let weight = pool
                .weight(name)
                .and_then(|weight| {
                    let raised = weight.saturating_add(increment);
                    pool.set_weight(name, raised).map(|()| raised)
                })
                .map_err(|source| LevelError::Pool {
                    name: name.clone(),
                    source,
                })?;
            boosted.push((name.clone(), weight));
        }
        Ok(boosted)
    }
}
