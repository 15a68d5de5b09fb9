//! Table preparation that runs before a table reaches the correction engine:
//! polymer exclusion, amplification by analysed fraction, size filtering and
//! category standardization.
use super::standardize::standardize;
use crate::config::{ProcessingConfig, SizeFilter};
use crate::error::{CorrectionError, Result};
use crate::store::{ParticleId, ParticleTable, SizeDimension};
use std::collections::HashSet;

/// Drops particles whose polymer type is on the exclusion list.
pub fn exclude_polymers(table: &ParticleTable, excluded: &[String]) -> ParticleTable {
    let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
    let out = table.filtered(|p| !excluded.contains(p.polymer_type.as_str()));
    tracing::debug!(
        table = table.name(),
        excluded = table.len() - out.len(),
        "polymer exclusion"
    );
    out
}

/// Keeps particles with `low <= size <= high` on the filter's dimension.
/// Particles without a value for that dimension are dropped.
pub fn apply_size_filter(table: &ParticleTable, filter: &SizeFilter) -> Result<ParticleTable> {
    let dim: SizeDimension = filter.dimension.parse()?;
    let out = table.filtered(|p| {
        p.size(dim).is_some_and(|v| v >= filter.low && v <= filter.high)
    });
    tracing::debug!(
        table = table.name(),
        removed = table.len() - out.len(),
        low = filter.low,
        high = filter.high,
        "size filter"
    );
    Ok(out)
}

/// Upper bound on copies per particle; smaller analysed fractions are rejected.
pub const MAX_AMPLIFICATION: f64 = 10_000.0;

/// Extrapolates partially analysed samples to the whole sample.
///
/// A particle with analysed fraction `f` appears `round(1/f)` times; the first
/// copy keeps its id, later copies get `{id}_{k}`. A suffix already taken by
/// another particle of the table is skipped.
pub fn amplify(table: &ParticleTable) -> Result<ParticleTable> {
    let mut factors = Vec::with_capacity(table.len());
    for p in table.iter() {
        let fraction = p.fraction_analysed.unwrap_or(1.0);
        let factor = (1.0 / fraction).round();
        if !(fraction > 0.0 && fraction <= 1.0) || !(factor <= MAX_AMPLIFICATION) {
            return Err(CorrectionError::InvalidFraction { id: p.id.0.clone(), fraction });
        }
        factors.push(factor as usize);
    }

    let mut out = ParticleTable::new(table.name(), table.role());
    for (p, factor) in table.iter().zip(factors) {
        out.push(p.clone())?;
        let mut k = 0;
        for _ in 1..factor {
            let id = loop {
                k += 1;
                let id = ParticleId(format!("{}_{}", p.id, k));
                if !table.contains(&id) && !out.contains(&id) {
                    break id;
                }
            };
            let mut replica = p.clone();
            replica.id = id;
            out.push(replica)?;
        }
    }
    if out.len() != table.len() {
        tracing::info!(table = table.name(), from = table.len(), to = out.len(), "amplified particles");
    }
    Ok(out)
}

/// Runs the full preparation pipeline configured in `config`.
pub fn prepare(table: &ParticleTable, config: &ProcessingConfig) -> Result<ParticleTable> {
    let mut out = exclude_polymers(table, &config.excluded_polymers);
    if config.amplify_by_fraction {
        out = amplify(&out)?;
    }
    if let Some(filter) = &config.size_filter {
        out = apply_size_filter(&out, filter)?;
    }
    let out = standardize(&out, &config.standardization);
    tracing::info!(table = table.name(), before = table.len(), after = out.len(), "prepared table");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Particle, TableRole};
    use rstest::rstest;

    fn ids(table: &ParticleTable) -> Vec<&str> {
        table.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_exclude_polymers() {
        let table = ParticleTable::from_particles(
            "env",
            TableRole::Environmental,
            vec![
                Particle::new("1", "PE", "blue", "fibre", 100.0, 100.0),
                Particle::new("2", "Parafilm", "blue", "fibre", 100.0, 100.0),
                Particle::new("3", "PB15", "blue", "fibre", 100.0, 100.0),
            ],
        )
        .unwrap();
        let out = exclude_polymers(&table, &ProcessingConfig::default().excluded_polymers);
        assert_eq!(ids(&out), vec!["1"]);
    }

    #[rstest]
    #[case(49.9, false)]
    #[case(50.0, true)]
    #[case(5000.0, true)]
    #[case(5000.1, false)]
    fn test_size_filter_bounds_are_inclusive(#[case] size_1: f64, #[case] kept: bool) {
        let table = ParticleTable::from_particles(
            "env",
            TableRole::Environmental,
            vec![Particle::new("1", "PE", "blue", "fibre", size_1, 10.0)],
        )
        .unwrap();
        let out = apply_size_filter(&table, &SizeFilter::default()).unwrap();
        assert_eq!(out.len() == 1, kept);
    }

    #[test]
    fn test_size_filter_drops_missing_dimension() {
        let table = ParticleTable::from_particles(
            "env",
            TableRole::Environmental,
            vec![
                Particle::new("1", "PE", "blue", "fibre", 100.0, 10.0).with_area(300.0),
                Particle::new("2", "PE", "blue", "fibre", 100.0, 10.0),
            ],
        )
        .unwrap();
        let filter = SizeFilter { dimension: "area".into(), low: 0.0, high: 1000.0 };
        assert_eq!(ids(&apply_size_filter(&table, &filter).unwrap()), vec!["1"]);
    }

    #[test]
    fn test_amplify_by_fraction() {
        let table = ParticleTable::from_particles(
            "env",
            TableRole::Environmental,
            vec![
                Particle::new("a", "PE", "blue", "fibre", 100.0, 10.0).with_fraction_analysed(0.25),
                Particle::new("b", "PE", "blue", "fibre", 100.0, 10.0),
            ],
        )
        .unwrap();
        let out = amplify(&table).unwrap();
        assert_eq!(ids(&out), vec!["a", "a_1", "a_2", "a_3", "b"]);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.5)]
    #[case(1.5)]
    #[case(f64::NAN)]
    #[case(1e-300)]
    #[case(1.0 / 20_000.0)]
    fn test_amplify_rejects_invalid_fraction(#[case] fraction: f64) {
        let table = ParticleTable::from_particles(
            "env",
            TableRole::Environmental,
            vec![Particle::new("a", "PE", "blue", "fibre", 100.0, 10.0).with_fraction_analysed(fraction)],
        )
        .unwrap();
        assert!(matches!(amplify(&table), Err(CorrectionError::InvalidFraction { .. })));
    }

    #[test]
    fn test_amplify_accepts_largest_factor() {
        let table = ParticleTable::from_particles(
            "env",
            TableRole::Environmental,
            vec![Particle::new("a", "PE", "blue", "fibre", 100.0, 10.0)
                .with_fraction_analysed(1.0 / MAX_AMPLIFICATION)],
        )
        .unwrap();
        assert_eq!(amplify(&table).unwrap().len(), MAX_AMPLIFICATION as usize);
    }

    #[test]
    fn test_amplify_skips_taken_replica_ids() {
        let table = ParticleTable::from_particles(
            "env",
            TableRole::Environmental,
            vec![
                Particle::new("7", "PE", "blue", "fibre", 100.0, 10.0).with_fraction_analysed(0.5),
                Particle::new("7_1", "PE", "blue", "fibre", 100.0, 10.0),
            ],
        )
        .unwrap();
        let out = amplify(&table).unwrap();
        assert_eq!(ids(&out), vec!["7", "7_2", "7_1"]);
    }

    #[test]
    fn test_prepare_pipeline() {
        let table = ParticleTable::from_particles(
            "env",
            TableRole::Environmental,
            vec![
                Particle::new("1", "PE", "violet", "fibre", 100.0, 10.0),
                Particle::new("2", "PE", "blue", "fibre", 10.0, 10.0),
                Particle::new("3", "PV23", "blue", "fibre", 100.0, 10.0),
            ],
        )
        .unwrap();
        let out = prepare(&table, &ProcessingConfig::default()).unwrap();
        assert_eq!(ids(&out), vec!["1"]);
        assert_eq!(out.particles()[0].color, "blue");
    }
}
