//! Particle data model and its JSON boundary.
pub mod io;
pub mod table;
pub mod types;

pub use table::ParticleTable;
pub use types::{
    CategoricalField, CategoryKey, MatchingCriteria, Particle, ParticleId, ParticleRecord,
    SizeDimension, TableRole,
};
