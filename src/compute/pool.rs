//! Live pool of environmental particles still available for elimination.
use crate::store::{CategoryKey, MatchingCriteria, Particle, ParticleId, ParticleTable};
use std::collections::{BTreeMap, HashMap};

/// Candidate index keyed by the categorical tuple of the matching criteria.
///
/// Each bucket is an id-ordered map from particle id to its row in the source
/// table, so iteration order is the tie-break order and removal is cheap.
#[derive(Debug)]
pub struct CandidatePool<'t> {
    table: &'t ParticleTable,
    criteria: MatchingCriteria,
    buckets: HashMap<CategoryKey, BTreeMap<ParticleId, usize>>,
    consumed: Vec<bool>,
    remaining: usize,
}

impl<'t> CandidatePool<'t> {
    pub fn new(table: &'t ParticleTable, criteria: &MatchingCriteria) -> Self {
        let mut buckets: HashMap<CategoryKey, BTreeMap<ParticleId, usize>> = HashMap::new();
        for (row, p) in table.iter().enumerate() {
            buckets.entry(criteria.key_for(p)).or_default().insert(p.id.clone(), row);
        }
        Self {
            table,
            criteria: criteria.clone(),
            buckets,
            consumed: vec![false; table.len()],
            remaining: table.len(),
        }
    }

    pub fn remaining(&self) -> usize { self.remaining }

    pub fn particle(&self, row: usize) -> &'t Particle { &self.table.particles()[row] }

    /// Live candidates sharing `key`, in ascending id order.
    pub fn candidates(&self, key: &CategoryKey) -> impl Iterator<Item = (usize, &'t Particle)> + '_ {
        let table = self.table;
        self.buckets
            .get(key)
            .into_iter()
            .flat_map(|bucket| bucket.values())
            .map(move |&row| (row, &table.particles()[row]))
    }

    /// Removes a particle from the pool. Returns false if it was already consumed.
    pub fn consume(&mut self, row: usize) -> bool {
        if self.consumed[row] {
            return false;
        }
        let table = self.table;
        let p = &table.particles()[row];
        let key = self.criteria.key_for(p);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(&p.id);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
        self.consumed[row] = true;
        self.remaining -= 1;
        true
    }

    /// Unconsumed particles in their original table order.
    pub fn into_remaining(self) -> ParticleTable {
        let consumed = self.consumed;
        let mut row = 0;
        // `filtered` visits rows in table order.
        self.table.filtered(|_| {
            let keep = !consumed[row];
            row += 1;
            keep
        })
    }
}
