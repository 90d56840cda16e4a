#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted random container used by every selection tier of the generator.
//!
//! Entries keep their insertion order and a cumulative weight table is rebuilt
//! after every mutation, so sampling only needs a shared reference and runs a
//! binary search over the table.

use std::{collections::HashMap, hash::Hash};

use rand::Rng;
use thiserror::Error;

/// Failures reported by [`WeightedPool`] operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The key is already present in the pool.
    #[error("key is already present in the pool")]
    DuplicateKey,
    /// The key is not present in the pool.
    #[error("key is not present in the pool")]
    MissingKey,
    /// The pool holds no entries.
    #[error("cannot sample from an empty pool")]
    Empty,
    /// Every entry has weight zero.
    #[error("cannot sample from a pool whose total weight is zero")]
    ZeroTotalWeight,
}

/// Weighted container sampled with replacement.
#[derive(Clone, Debug)]
pub struct WeightedPool<K> {
    entries: Vec<(K, u32)>,
    index: HashMap<K, usize>,
    cumulative: Vec<u64>,
}

impl<K> Default for WeightedPool<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            cumulative: Vec::new(),
        }
    }
}

impl<K> WeightedPool<K>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new key with the provided weight.
    pub fn add(&mut self, key: K, weight: u32) -> Result<(), PoolError> {
        if self.index.contains_key(&key) {
            return Err(PoolError::DuplicateKey);
        }

        let _ = self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, weight));
        self.rebuild();
        Ok(())
    }

    /// Removes a key and returns the weight it carried.
    pub fn remove(&mut self, key: &K) -> Result<u32, PoolError> {
        let position = self.index.remove(key).ok_or(PoolError::MissingKey)?;
        let (_, weight) = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        self.rebuild();
        Ok(weight)
    }

    /// Replaces the weight of an existing key. Zero keeps the key but makes it unselectable.
    pub fn set_weight(&mut self, key: &K, weight: u32) -> Result<(), PoolError> {
        let position = *self.index.get(key).ok_or(PoolError::MissingKey)?;
        self.entries[position].1 = weight;
        self.rebuild();
        Ok(())
    }

    /// Returns the weight of an existing key.
    pub fn weight(&self, key: &K) -> Result<u32, PoolError> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1)
            .ok_or(PoolError::MissingKey)
    }

    /// Reports whether the key is present.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Draws a key with probability proportional to its weight.
    pub fn sample<R>(&self, rng: &mut R) -> Result<&K, PoolError>
    where
        R: Rng + ?Sized,
    {
        if self.entries.is_empty() {
            return Err(PoolError::Empty);
        }

        let total = self.total_weight();
        if total == 0 {
            return Err(PoolError::ZeroTotalWeight);
        }

        let roll = rng.gen_range(0..total);
        let position = self.cumulative.partition_point(|&bound| bound <= roll);
        Ok(&self.entries[position].0)
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Number of keys, including those with weight zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the pool holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over keys and weights in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u32)> + '_ {
        self.entries.iter().map(|(key, weight)| (key, *weight))
    }

    fn rebuild(&mut self) {
        self.cumulative.clear();
        let mut running = 0_u64;
        for (_, weight) in &self.entries {
            running += u64::from(*weight);
            self.cumulative.push(running);
        }
    }
}
