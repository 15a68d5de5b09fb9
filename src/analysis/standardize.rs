//! Canonicalization of categorical particle attributes.
use crate::config::StandardizationMap;
use crate::store::ParticleTable;
use std::collections::BTreeMap;

/// Returns a copy of `table` with `color` and `shape` mapped to their canonical
/// values. Values missing from the map pass through unchanged.
pub fn standardize(table: &ParticleTable, map: &StandardizationMap) -> ParticleTable {
    let mut out = table.clone();
    for p in out.particles_mut() {
        canonicalize(&mut p.color, &map.color);
        canonicalize(&mut p.shape, &map.shape);
    }
    out
}

fn canonicalize(value: &mut String, map: &BTreeMap<String, String>) {
    if let Some(canonical) = map.get(value.as_str()) {
        value.clone_from(canonical);
    }
}
