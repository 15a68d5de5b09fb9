//! Best-match selection for a single control particle.
use super::pool::CandidatePool;
use crate::store::{MatchingCriteria, Particle};

/// The environmental particle chosen for a control particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Row of the matched particle in the environmental table.
    pub row: usize,
    pub size_difference: f64,
}

/// Greedy matcher: candidates must share every configured categorical field;
/// the smallest size difference wins and ties go to the lowest id.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'c> {
    criteria: &'c MatchingCriteria,
}

impl<'c> Matcher<'c> {
    pub fn new(criteria: &'c MatchingCriteria) -> Self {
        Self { criteria }
    }

    /// Finds the best live candidate for `control` without consuming it.
    pub fn best_match(&self, control: &Particle, pool: &CandidatePool<'_>) -> Option<Match> {
        let dim = self.criteria.size_dimension;
        let target = control.size(dim)?;
        let key = self.criteria.key_for(control);

        let mut best: Option<Match> = None;
        // Candidates arrive in ascending id order, so only a strictly smaller
        // difference may replace the current best.
        for (row, candidate) in pool.candidates(&key) {
            let Some(size) = candidate.size(dim) else { continue };
            let diff = (size - target).abs();
            if !diff.is_finite() {
                continue;
            }
            if best.map_or(true, |b| diff < b.size_difference) {
                best = Some(Match { row, size_difference: diff });
            }
        }
        best
    }

    /// Finds the best candidate and removes it from the pool.
    pub fn take_best(&self, control: &Particle, pool: &mut CandidatePool<'_>) -> Option<Match> {
        let found = self.best_match(control, pool)?;
        pool.consume(found.row);
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CategoricalField, ParticleTable, SizeDimension, TableRole};

    fn env(particles: Vec<Particle>) -> ParticleTable {
        ParticleTable::from_particles("env", TableRole::Environmental, particles).unwrap()
    }

    fn square(id: &str, polymer: &str, size: f64) -> Particle {
        Particle::new(id, polymer, "white", "fibre", size, size)
    }

    #[test]
    fn test_smallest_difference_wins() {
        let table = env(vec![square("1", "PE", 100.0), square("2", "PE", 105.0)]);
        let criteria = MatchingCriteria::default();
        let pool = CandidatePool::new(&table, &criteria);
        let m = Matcher::new(&criteria).best_match(&square("c", "PE", 102.0), &pool).unwrap();
        assert_eq!(pool.particle(m.row).id.as_str(), "1");
        assert!((m.size_difference - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_goes_to_lowest_id_regardless_of_row_order() {
        for rows in [vec!["9", "10"], vec!["10", "9"]] {
            // 98 and 102 are both 2 away from 100.
            let table = env(vec![square(rows[0], "PE", 98.0), square(rows[1], "PE", 102.0)]);
            let criteria = MatchingCriteria::default();
            let pool = CandidatePool::new(&table, &criteria);
            let m = Matcher::new(&criteria).best_match(&square("c", "PE", 100.0), &pool).unwrap();
            assert_eq!(pool.particle(m.row).id.as_str(), "9");
        }
    }

    #[test]
    fn test_no_candidates_is_no_match() {
        let table = env(vec![square("1", "PE", 100.0)]);
        let criteria = MatchingCriteria::default();
        let pool = CandidatePool::new(&table, &criteria);
        assert!(Matcher::new(&criteria).best_match(&square("c", "PP", 100.0), &pool).is_none());
        assert!(Matcher::new(&criteria)
            .best_match(&Particle::new("c", "PE", "red", "fibre", 100.0, 100.0), &pool)
            .is_none());
    }

    #[test]
    fn test_consumed_particles_are_never_selected() {
        let table = env(vec![square("1", "PE", 100.0)]);
        let criteria = MatchingCriteria::default();
        let mut pool = CandidatePool::new(&table, &criteria);
        let matcher = Matcher::new(&criteria);
        assert!(matcher.take_best(&square("a", "PE", 100.0), &mut pool).is_some());
        assert!(matcher.take_best(&square("b", "PE", 100.0), &mut pool).is_none());
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn test_missing_dimension_is_skipped() {
        let table = env(vec![
            square("1", "PE", 100.0),
            square("2", "PE", 100.0).with_area(40.0),
        ]);
        let criteria = MatchingCriteria::new(&[CategoricalField::PolymerType], SizeDimension::Area);
        let pool = CandidatePool::new(&table, &criteria);
        let matcher = Matcher::new(&criteria);

        let m = matcher.best_match(&square("c", "PE", 1.0).with_area(10.0), &pool).unwrap();
        assert_eq!(pool.particle(m.row).id.as_str(), "2");
        assert!(matcher.best_match(&square("d", "PE", 1.0), &pool).is_none());
    }

    #[test]
    fn test_reduced_criteria_ignores_other_fields() {
        let table = env(vec![Particle::new("1", "PE", "red", "sphere", 50.0, 50.0)]);
        let criteria = MatchingCriteria::new(&[CategoricalField::PolymerType], SizeDimension::Size1);
        let pool = CandidatePool::new(&table, &criteria);
        assert!(Matcher::new(&criteria).best_match(&square("c", "PE", 10.0), &pool).is_some());
    }
}
