//! Elimination records produced by a correction run.
use crate::store::ParticleId;
use serde::{Deserialize, Serialize};

/// One environmental particle removed because it matched a control particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminationRecord {
    pub eliminated_particle_id: ParticleId,
    pub control_particle_id: ParticleId,
    pub control_source: String,
    pub size_difference: f64,
    pub polymer_type: String,
    pub color: String,
    pub shape: String,
}

/// Append-only, ordered log of eliminations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EliminationLog {
    records: Vec<EliminationRecord>,
}

impl EliminationLog {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
    pub fn records(&self) -> &[EliminationRecord] { &self.records }
    pub fn iter(&self) -> std::slice::Iter<'_, EliminationRecord> { self.records.iter() }

    pub fn push(&mut self, record: EliminationRecord) { self.records.push(record); }

    /// Appends all records of a later pass.
    pub fn append(&mut self, mut later: EliminationLog) { self.records.append(&mut later.records); }

    pub fn eliminated_ids(&self) -> impl Iterator<Item = &ParticleId> {
        self.records.iter().map(|r| &r.eliminated_particle_id)
    }
}

impl<'a> IntoIterator for &'a EliminationLog {
    type Item = &'a EliminationRecord;
    type IntoIter = std::slice::Iter<'a, EliminationRecord>;
    fn into_iter(self) -> Self::IntoIter { self.records.iter() }
}
