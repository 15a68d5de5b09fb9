//! Synthetic controls: several control tables pooled into one.
use crate::error::{CorrectionError, Result};
use crate::store::{ParticleId, ParticleTable, TableRole};
use std::collections::{BTreeMap, HashSet};

/// Separator between the source table name and the original particle id.
pub const NAMESPACE_SEPARATOR: &str = "::";

pub fn namespaced_id(source: &str, id: &ParticleId) -> ParticleId {
    ParticleId(format!("{}{}{}", source, NAMESPACE_SEPARATOR, id))
}

/// Concatenates `controls` into one table named `name`.
///
/// Particles keep their order (all of the first source, then the second, ...)
/// and their ids are prefixed with the source table name. Nothing is merged or
/// deduplicated.
pub fn build_synthetic_control<'t>(
    name: &str,
    controls: impl IntoIterator<Item = &'t ParticleTable>,
) -> Result<ParticleTable> {
    let mut composite = ParticleTable::new(name, TableRole::Synthetic);
    let mut sources = HashSet::new();

    for control in controls {
        if !sources.insert(control.name()) {
            return Err(CorrectionError::Composition {
                name: name.to_string(),
                reason: format!("source '{}' appears more than once", control.name()),
            });
        }
        for p in control.iter() {
            let mut pooled = p.clone();
            pooled.id = namespaced_id(control.name(), &p.id);
            composite.push(pooled).map_err(|e| CorrectionError::Composition {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        }
    }

    if sources.is_empty() {
        return Err(CorrectionError::Composition {
            name: name.to_string(),
            reason: "no control tables given".to_string(),
        });
    }

    tracing::info!(
        synthetic = name,
        sources = sources.len(),
        particles = composite.len(),
        "built synthetic control"
    );
    Ok(composite)
}

/// Reduces a pooled control built from `source_count` tables to a single
/// representative population.
///
/// Within each phenotype (polymer, color, shape) particles are ranked by
/// geometric mean size, largest first with ties broken by id, and every
/// `source_count`-th one is kept starting from the largest. Phenotypes appear
/// in ascending (polymer, color, shape) order.
pub fn thin_by_phenotype(pooled: &ParticleTable, source_count: usize) -> Result<ParticleTable> {
    if source_count <= 1 {
        return Ok(pooled.clone());
    }

    let mut by_phenotype: BTreeMap<(&str, &str, &str), Vec<usize>> = BTreeMap::new();
    for (row, p) in pooled.iter().enumerate() {
        let key = (p.polymer_type.as_str(), p.color.as_str(), p.shape.as_str());
        by_phenotype.entry(key).or_default().push(row);
    }
    let mut groups: Vec<Vec<usize>> = by_phenotype.into_values().collect();

    let particles = pooled.particles();
    let mut keep = vec![false; pooled.len()];
    for rows in &mut groups {
        rows.sort_by(|&a, &b| {
            let (pa, pb) = (&particles[a], &particles[b]);
            pb.geometric_mean_size()
                .total_cmp(&pa.geometric_mean_size())
                .then_with(|| pa.id.cmp(&pb.id))
        });
        for &row in rows.iter().step_by(source_count) {
            keep[row] = true;
        }
    }

    let out = ParticleTable::from_particles(
        pooled.name(),
        pooled.role(),
        groups.into_iter().flatten().filter(|&row| keep[row]).map(|row| particles[row].clone()),
    )?;
    tracing::info!(
        synthetic = pooled.name(),
        before = pooled.len(),
        after = out.len(),
        "thinned synthetic control"
    );
    Ok(out)
}
