//! A synchronous, single-threaded correction engine.
use super::ledger::{EliminationLog, EliminationRecord};
use super::matcher::Matcher;
use super::pool::CandidatePool;
use crate::store::{MatchingCriteria, ParticleTable};

/// Result of correcting one environmental table.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionOutcome {
    pub corrected: ParticleTable,
    pub log: EliminationLog,
}

pub struct CorrectionEngine<'c> {
    criteria: &'c MatchingCriteria,
}

impl<'c> CorrectionEngine<'c> {
    pub fn new(criteria: &'c MatchingCriteria) -> Self {
        Self { criteria }
    }

    /// Removes from `environmental` the best match of every control particle.
    ///
    /// Control particles are processed in table order against one shared pool,
    /// so an environmental particle is eliminated at most once. The inputs are
    /// left untouched; surviving particles keep their relative order.
    pub fn apply(&self, environmental: &ParticleTable, control: &ParticleTable) -> CorrectionOutcome {
        tracing::info!(
            environmental = environmental.name(),
            control = control.name(),
            environmental_particles = environmental.len(),
            control_particles = control.len(),
            "starting correction"
        );

        let matcher = Matcher::new(self.criteria);
        let mut pool = CandidatePool::new(environmental, self.criteria);
        let mut log = EliminationLog::new();

        for c in control.iter() {
            match matcher.take_best(c, &mut pool) {
                Some(m) => {
                    let eliminated = pool.particle(m.row);
                    tracing::debug!(
                        eliminated = %eliminated.id,
                        control_particle = %c.id,
                        size_difference = m.size_difference,
                        "eliminated particle"
                    );
                    log.push(EliminationRecord {
                        eliminated_particle_id: eliminated.id.clone(),
                        control_particle_id: c.id.clone(),
                        control_source: control.name().to_string(),
                        size_difference: m.size_difference,
                        polymer_type: eliminated.polymer_type.clone(),
                        color: eliminated.color.clone(),
                        shape: eliminated.shape.clone(),
                    });
                }
                None => tracing::debug!(control_particle = %c.id, "no matching particle"),
            }
        }

        let corrected = pool.into_remaining();
        tracing::info!(
            environmental = environmental.name(),
            eliminated = log.len(),
            remaining = corrected.len(),
            "correction complete"
        );
        CorrectionOutcome { corrected, log }
    }

    /// Applies each control as its own correction, each starting from the
    /// previous corrected output. Logs are concatenated in control order.
    pub fn apply_sequential<'t>(
        &self,
        environmental: &ParticleTable,
        controls: impl IntoIterator<Item = &'t ParticleTable>,
    ) -> CorrectionOutcome {
        let mut outcome = CorrectionOutcome { corrected: environmental.clone(), log: EliminationLog::new() };
        for control in controls {
            let step = self.apply(&outcome.corrected, control);
            outcome.corrected = step.corrected;
            outcome.log.append(step.log);
        }
        outcome
    }
}

/// Convenience wrapper around [`CorrectionEngine::apply`].
pub fn apply_correction(
    environmental: &ParticleTable,
    control: &ParticleTable,
    criteria: &MatchingCriteria,
) -> (ParticleTable, EliminationLog) {
    let outcome = CorrectionEngine::new(criteria).apply(environmental, control);
    (outcome.corrected, outcome.log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Particle, ParticleId, TableRole};
    use std::collections::HashSet;

    fn square(id: &str, polymer: &str, size: f64) -> Particle {
        Particle::new(id, polymer, "white", "fibre", size, size)
    }

    fn table(name: &str, role: TableRole, particles: Vec<Particle>) -> ParticleTable {
        ParticleTable::from_particles(name, role, particles).unwrap()
    }

    fn ids(table: &ParticleTable) -> Vec<&str> {
        table.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_closest_particle_is_eliminated() {
        let env = table("env", TableRole::Environmental, vec![square("1", "PE", 100.0), square("2", "PE", 105.0)]);
        let blank = table("blank", TableRole::Blank, vec![square("b1", "PE", 102.0)]);

        let (corrected, log) = apply_correction(&env, &blank, &MatchingCriteria::default());

        assert_eq!(ids(&corrected), vec!["2"]);
        assert_eq!(log.len(), 1);
        let record = &log.records()[0];
        assert_eq!(record.eliminated_particle_id, ParticleId::from("1"));
        assert_eq!(record.control_particle_id, ParticleId::from("b1"));
        assert_eq!(record.control_source, "blank");
        assert!((record.size_difference - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_candidates_leaves_table_intact() {
        let env = table("env", TableRole::Environmental, vec![square("1", "PE", 100.0)]);
        let blank = table("blank", TableRole::Blank, vec![square("b1", "PA", 100.0)]);
        let (corrected, log) = apply_correction(&env, &blank, &MatchingCriteria::default());
        assert!(log.is_empty());
        assert_eq!(corrected, env);
    }

    #[test]
    fn test_first_control_consumes_shared_candidate() {
        let env = table("env", TableRole::Environmental, vec![square("1", "PE", 100.0)]);
        let blank = table("blank", TableRole::Blank, vec![square("b1", "PE", 150.0), square("b2", "PE", 100.0)]);
        let (corrected, log) = apply_correction(&env, &blank, &MatchingCriteria::default());
        assert!(corrected.is_empty());
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].control_particle_id, ParticleId::from("b1"));
    }

    #[test]
    fn test_each_particle_eliminated_at_most_once() {
        let env = table(
            "env",
            TableRole::Environmental,
            (0..20).map(|i| square(&i.to_string(), if i % 2 == 0 { "PE" } else { "PP" }, 50.0 + i as f64)).collect(),
        );
        let blank = table(
            "blank",
            TableRole::Blank,
            (0..30).map(|i| square(&format!("b{}", i), "PE", 60.0)).collect(),
        );
        let (corrected, log) = apply_correction(&env, &blank, &MatchingCriteria::default());

        let unique: HashSet<&ParticleId> = log.eliminated_ids().collect();
        assert_eq!(unique.len(), log.len());
        assert_eq!(log.len(), 10);
        assert_eq!(corrected.len(), 10);
        assert!(corrected.iter().all(|p| p.polymer_type == "PP"));
    }

    #[test]
    fn test_unmatched_control_does_not_affect_others() {
        let env = table("env", TableRole::Environmental, vec![square("1", "PE", 100.0), square("2", "PE", 110.0)]);
        let with_extra = table(
            "blank",
            TableRole::Blank,
            vec![square("b1", "PE", 108.0), square("x", "PVC", 100.0), square("b2", "PE", 90.0)],
        );
        let without_extra = table("blank", TableRole::Blank, vec![square("b1", "PE", 108.0), square("b2", "PE", 90.0)]);
        let criteria = MatchingCriteria::default();
        assert_eq!(apply_correction(&env, &with_extra, &criteria), apply_correction(&env, &without_extra, &criteria));
    }

    #[test]
    fn test_runs_are_deterministic() {
        let env = table(
            "env",
            TableRole::Environmental,
            (0..50).map(|i| square(&format!("e{}", i), "PE", 10.0 + (i % 7) as f64)).collect(),
        );
        let blank = table(
            "blank",
            TableRole::Blank,
            (0..25).map(|i| square(&format!("b{}", i), "PE", 10.0 + (i % 5) as f64)).collect(),
        );
        let criteria = MatchingCriteria::default();
        let a = CorrectionEngine::new(&criteria).apply(&env, &blank);
        let b = CorrectionEngine::new(&criteria).apply(&env, &blank);
        assert_eq!(serde_json::to_string(&a.log).unwrap(), serde_json::to_string(&b.log).unwrap());
        assert_eq!(a.corrected, b.corrected);
    }

    #[test]
    fn test_sequential_controls_accumulate() {
        let env = table(
            "env",
            TableRole::Environmental,
            vec![square("1", "PE", 100.0), square("2", "PE", 101.0), square("3", "PE", 200.0)],
        );
        let blank = table("blank", TableRole::Blank, vec![square("b1", "PE", 100.0)]);
        let blind = table("blind", TableRole::Blind, vec![square("d1", "PE", 100.0)]);

        let criteria = MatchingCriteria::default();
        let outcome = CorrectionEngine::new(&criteria).apply_sequential(&env, [&blank, &blind]);

        assert_eq!(ids(&outcome.corrected), vec!["3"]);
        let sources: Vec<&str> = outcome.log.iter().map(|r| r.control_source.as_str()).collect();
        assert_eq!(sources, vec!["blank", "blind"]);
        assert_eq!(outcome.log.records()[1].eliminated_particle_id, ParticleId::from("2"));
        assert_eq!(env.len(), 3);
    }
}
