use super::types::*;
use crate::error::{CorrectionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An ordered, id-unique collection of particles with a name and a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TableRecord")]
pub struct ParticleTable {
    name: String,
    role: TableRole,
    particles: Vec<Particle>,

    // Ephemeral lookup (not serialized, rebuilt on load)
    #[serde(skip)]
    positions: HashMap<ParticleId, usize>,
}

/// Serialized form of a table; the id index is rebuilt on conversion.
#[derive(Deserialize)]
struct TableRecord {
    name: String,
    role: TableRole,
    particles: Vec<Particle>,
}

impl TryFrom<TableRecord> for ParticleTable {
    type Error = CorrectionError;

    fn try_from(record: TableRecord) -> Result<Self> {
        ParticleTable::from_particles(record.name, record.role, record.particles)
    }
}

impl PartialEq for ParticleTable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.role == other.role && self.particles == other.particles
    }
}

impl ParticleTable {
    pub fn new(name: impl Into<String>, role: TableRole) -> Self {
        Self { name: name.into(), role, particles: Vec::new(), positions: HashMap::new() }
    }

    pub fn from_particles(
        name: impl Into<String>,
        role: TableRole,
        particles: impl IntoIterator<Item = Particle>,
    ) -> Result<Self> {
        let mut table = Self::new(name, role);
        for p in particles {
            table.push(p)?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn role(&self) -> TableRole { self.role }
    pub fn len(&self) -> usize { self.particles.len() }
    pub fn is_empty(&self) -> bool { self.particles.is_empty() }
    pub fn particles(&self) -> &[Particle] { &self.particles }
    pub fn iter(&self) -> std::slice::Iter<'_, Particle> { self.particles.iter() }

    /// Mutable access for in-crate transforms that leave ids untouched.
    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] { &mut self.particles }

    pub fn get(&self, id: &ParticleId) -> Option<&Particle> {
        self.positions.get(id).map(|&i| &self.particles[i])
    }

    pub fn contains(&self, id: &ParticleId) -> bool { self.positions.contains_key(id) }

    /// Appends a particle, rejecting ids already present.
    pub fn push(&mut self, particle: Particle) -> Result<()> {
        if self.positions.contains_key(&particle.id) {
            return Err(CorrectionError::DuplicateParticleId {
                table: self.name.clone(),
                id: particle.id.0,
            });
        }
        self.positions.insert(particle.id.clone(), self.particles.len());
        self.particles.push(particle);
        Ok(())
    }

    /// A new table of the same identity holding the particles that pass `keep`,
    /// in their original order.
    pub fn filtered(&self, mut keep: impl FnMut(&Particle) -> bool) -> ParticleTable {
        let mut out = ParticleTable::new(self.name.clone(), self.role);
        for p in self.particles.iter().filter(|p| keep(p)) {
            out.positions.insert(p.id.clone(), out.particles.len());
            out.particles.push(p.clone());
        }
        out
    }
}
