//! Budgeted clip selection.
//!
//! Candidates are sorted shortest first. For every target count between the
//! configured bounds one greedy scan collects clips while they still fit the
//! total budget; each scan that reaches its target count yields a valid set.
//! One valid set is then drawn at random. The greedy bias favours fitting more
//! clips under the cap and makes no optimality claim.

use crate::candidate::{Candidate, Selection, SelectionCriteria};
use crate::error::SelectionError;
use rand::Rng;
use rand::seq::SliceRandom;

/// Every valid set the greedy scans produce, ordered by ascending target
/// count. Each set is in ascending duration order.
pub fn valid_sets(
    candidates: &[Candidate],
    criteria: &SelectionCriteria,
) -> Result<Vec<Vec<Candidate>>, SelectionError> {
    criteria.validate()?;

    let mut sorted: Vec<&Candidate> = candidates.iter().collect();
    sorted.sort_by_key(|c| c.duration_secs);

    let mut sets = Vec::new();
    for target in criteria.min_clips..=criteria.max_clips {
        let mut picked: Vec<Candidate> = Vec::with_capacity(target);
        let mut total: u64 = 0;
        for candidate in &sorted {
            if picked.len() == target {
                break;
            }
            let next = total + u64::from(candidate.duration_secs);
            if next > u64::from(criteria.max_total_secs) {
                break;
            }
            total = next;
            picked.push((*candidate).clone());
        }
        if picked.len() == target {
            sets.push(picked);
        }
    }
    Ok(sets)
}

pub fn select<R: Rng + ?Sized>(
    candidates: &[Candidate],
    criteria: &SelectionCriteria,
    rng: &mut R,
) -> Result<Selection, SelectionError> {
    criteria.validate()?;
    if candidates.is_empty() {
        return Err(SelectionError::NoCandidates);
    }

    let sets = valid_sets(candidates, criteria)?;
    let Some(chosen) = sets.choose(rng) else {
        return Err(SelectionError::Infeasible {
            candidates: candidates.len(),
            min_clips: criteria.min_clips,
            max_clips: criteria.max_clips,
            max_total_secs: criteria.max_total_secs,
        });
    };

    Ok(Selection::new(chosen.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::SourceTag;
    use crate::error::CriteriaError;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn clip(id: &str, secs: u32) -> Candidate {
        Candidate {
            id: id.to_string(),
            title: format!("clip {id}"),
            url: format!("https://example.com/{id}"),
            duration_secs: secs,
            published_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            source: SourceTag::Youtube,
        }
    }

    fn criteria(min: usize, max: usize, budget: u32) -> SelectionCriteria {
        SelectionCriteria::new(min, max, budget, Vec::<String>::new()).unwrap()
    }

    fn ids(clips: &[Candidate]) -> Vec<&str> {
        clips.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn empty_input_is_infeasible() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = select(&[], &criteria(1, 2, 58), &mut rng).unwrap_err();
        assert_eq!(err, SelectionError::NoCandidates);
    }

    #[test]
    fn too_few_candidates_is_infeasible() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = vec![clip("a", 5), clip("b", 5), clip("c", 5)];
        let err = select(&pool, &criteria(4, 8, 58), &mut rng).unwrap_err();
        assert!(matches!(err, SelectionError::Infeasible { candidates: 3, .. }));
    }

    #[test]
    fn budget_too_small_for_min_count_is_infeasible() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = vec![clip("a", 20), clip("b", 20), clip("c", 25), clip("d", 30)];
        let err = select(&pool, &criteria(3, 4, 58), &mut rng).unwrap_err();
        assert!(matches!(err, SelectionError::Infeasible { .. }));
    }

    #[test]
    fn invalid_criteria_is_reported() {
        let mut rng = StdRng::seed_from_u64(1);
        let bad = SelectionCriteria {
            min_clips: 3,
            max_clips: 2,
            max_total_secs: 58,
            keywords: Default::default(),
        };
        let err = select(&[clip("a", 1)], &bad, &mut rng).unwrap_err();
        assert_eq!(
            err,
            SelectionError::InvalidCriteria(CriteriaError::MinAboveMax { min: 3, max: 2 })
        );
    }

    #[test]
    fn valid_sets_are_shortest_first_prefixes() {
        let pool = vec![
            clip("a", 12),
            clip("b", 3),
            clip("c", 9),
            clip("d", 3),
            clip("e", 30),
        ];
        let sets = valid_sets(&pool, &criteria(2, 5, 30)).unwrap();
        let as_ids: Vec<Vec<&str>> = sets.iter().map(|s| ids(s)).collect();
        assert_eq!(
            as_ids,
            vec![vec!["b", "d"], vec!["b", "d", "c"], vec!["b", "d", "c", "a"]]
        );
    }

    #[test]
    fn every_selection_respects_count_and_budget() {
        let pool: Vec<Candidate> = [14, 3, 22, 8, 9, 11, 5, 17, 2, 6]
            .iter()
            .enumerate()
            .map(|(i, s)| clip(&format!("c{i}"), *s))
            .collect();
        let crit = criteria(4, 8, 58);
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let selection = select(&pool, &crit, &mut rng).unwrap();
            assert!(selection.len() >= crit.min_clips);
            assert!(selection.len() <= crit.max_clips);
            assert!(selection.total_secs() <= crit.max_total_secs);
            let durations: Vec<u32> = selection.iter().map(|c| c.duration_secs).collect();
            let mut sorted = durations.clone();
            sorted.sort();
            assert_eq!(durations, sorted);
        }
    }

    #[test]
    fn same_seed_same_selection() {
        let pool: Vec<Candidate> = (0..12).map(|i| clip(&format!("c{i}"), 2 + i)).collect();
        let crit = criteria(2, 6, 40);
        let first = select(&pool, &crit, &mut StdRng::seed_from_u64(42)).unwrap();
        let second = select(&pool, &crit, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn random_choice_reaches_every_valid_set() {
        let pool: Vec<Candidate> = (0..6).map(|i| clip(&format!("c{i}"), 5)).collect();
        let crit = criteria(2, 4, 58);
        let expected = valid_sets(&pool, &crit).unwrap().len();
        assert_eq!(expected, 3);

        let mut seen = HashSet::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            seen.insert(select(&pool, &crit, &mut rng).unwrap().len());
        }
        assert_eq!(seen, HashSet::from([2, 3, 4]));
    }

    #[test]
    fn equal_durations_keep_input_order() {
        let pool = vec![clip("x", 4), clip("y", 4), clip("z", 1)];
        let sets = valid_sets(&pool, &criteria(3, 3, 58)).unwrap();
        assert_eq!(ids(&sets[0]), ["z", "x", "y"]);
    }
}
