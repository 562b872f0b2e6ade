use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

use gpa_planner::planner::{
    compute_average, search, Average, Catalog, ScoreAssignment, SearchOptions, SearchRequest,
    Subject, Target,
};

/// Brute force: rebuild every assignment explicitly and average it through the public API.
fn oracle(
    catalog: &Catalog,
    current: &ScoreAssignment,
    locked: &BTreeSet<String>,
    target: Target,
) -> (Vec<(u64, ScoreAssignment, Average)>, Average) {
    fn walk(
        idx: usize,
        catalog: &Catalog,
        current: &ScoreAssignment,
        locked: &BTreeSet<String>,
        partial: &mut ScoreAssignment,
        out: &mut Vec<ScoreAssignment>,
    ) {
        let Some(subject) = catalog.subjects().get(idx) else {
            out.push(partial.clone());
            return;
        };
        let start = current.get(&subject.name).unwrap();
        let end = if locked.contains(&subject.name) {
            start
        } else {
            catalog.max_score()
        };
        for score in start..=end {
            partial.set(subject.name.clone(), score);
            walk(idx + 1, catalog, current, locked, partial, out);
        }
    }

    let mut all = Vec::new();
    walk(0, catalog, current, locked, &mut ScoreAssignment::new(), &mut all);

    let mut max = Average::ZERO;
    let mut feasible = Vec::new();
    for assignment in all {
        let avg = compute_average(&assignment, catalog).unwrap();
        max = max.max(avg);
        if target.is_met_by(avg) {
            let effort: u64 = catalog
                .subjects()
                .iter()
                .map(|s| {
                    let diff = assignment.get(&s.name).unwrap() - current.get(&s.name).unwrap();
                    diff as u64 * s.credits as u64
                })
                .sum();
            feasible.push((effort, assignment, avg));
        }
    }
    feasible.sort_by_key(|(effort, _, _)| *effort);
    (feasible, max)
}

struct Instance {
    catalog: Catalog,
    current: ScoreAssignment,
    locked: BTreeSet<String>,
}

fn random_instance(rng: &mut StdRng) -> Instance {
    let max_score: u8 = rng.gen_range(3..=10);
    let count = rng.gen_range(1..=4);
    let subjects: Vec<Subject> = (0..count)
        .map(|i| Subject::new(format!("S{}", i), rng.gen_range(1..=5)))
        .collect();
    let current: ScoreAssignment = subjects
        .iter()
        .map(|s| (s.name.clone(), rng.gen_range(0..=max_score)))
        .collect();
    let locked: BTreeSet<String> = subjects
        .iter()
        .filter(|_| rng.gen_bool(0.3))
        .map(|s| s.name.clone())
        .collect();
    Instance {
        catalog: Catalog::with_max_score(subjects, max_score).unwrap(),
        current,
        locked,
    }
}

fn request(instance: &Instance, target: Target) -> SearchRequest {
    SearchRequest {
        current: instance.current.clone(),
        locked: instance.locked.clone(),
        target,
        options: SearchOptions::default(),
    }
}

#[test]
fn test_matches_brute_force_oracle() {
    let mut rng = StdRng::seed_from_u64(0x6a7);

    for _ in 0..200 {
        let instance = random_instance(&mut rng);
        let ceiling = instance.catalog.max_score() as u32 * 100;
        let target = Target::from_hundredths(rng.gen_range(0..=ceiling + 50));

        let outcome = search(&request(&instance, target), &instance.catalog).unwrap();
        let (expected, expected_max) =
            oracle(&instance.catalog, &instance.current, &instance.locked, target);

        assert_eq!(outcome.max_achievable, expected_max);
        assert_eq!(outcome.total_feasible, expected.len());
        assert_eq!(outcome.feasible.len(), expected.len());
        for (candidate, (effort, assignment, avg)) in outcome.feasible.iter().zip(&expected) {
            assert_eq!(candidate.effort, *effort);
            assert_eq!(&candidate.assignment, assignment);
            assert_eq!(candidate.achieved_average, *avg);
        }
    }
}

#[test]
fn test_first_candidate_has_minimum_effort() {
    let mut rng = StdRng::seed_from_u64(17);

    for _ in 0..100 {
        let instance = random_instance(&mut rng);
        let target = Target::from_hundredths(rng.gen_range(0..=instance.catalog.max_score() as u32 * 100));
        let outcome = search(&request(&instance, target), &instance.catalog).unwrap();

        if let Some(first) = outcome.feasible.first() {
            let min = outcome.feasible.iter().map(|c| c.effort).min().unwrap();
            assert_eq!(first.effort, min);
            assert!(outcome.feasible.windows(2).all(|w| w[0].effort <= w[1].effort));
        }
    }
}

#[test]
fn test_stricter_target_admits_subset() {
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..100 {
        let instance = random_instance(&mut rng);
        let low = rng.gen_range(0..=instance.catalog.max_score() as u32 * 100);
        let high = low + rng.gen_range(0..=150);

        let loose = search(&request(&instance, Target::from_hundredths(low)), &instance.catalog).unwrap();
        let strict = search(&request(&instance, Target::from_hundredths(high)), &instance.catalog).unwrap();

        assert!(strict.total_feasible <= loose.total_feasible);
        assert_eq!(strict.max_achievable, loose.max_achievable);
        for candidate in &strict.feasible {
            assert!(loose.feasible.contains(candidate));
        }
    }
}

#[test]
fn test_locked_everything_returns_current() {
    let mut rng = StdRng::seed_from_u64(5);

    for _ in 0..50 {
        let mut instance = random_instance(&mut rng);
        instance.locked = instance
            .catalog
            .subjects()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        let current_avg = compute_average(&instance.current, &instance.catalog).unwrap();
        let target = Target::from_hundredths(rng.gen_range(0..=instance.catalog.max_score() as u32 * 100));

        let outcome = search(&request(&instance, target), &instance.catalog).unwrap();
        assert_eq!(outcome.max_achievable, current_avg);
        if target.is_met_by(current_avg) {
            assert_eq!(outcome.feasible.len(), 1);
            assert_eq!(outcome.feasible[0].assignment, instance.current);
            assert_eq!(outcome.feasible[0].effort, 0);
        } else {
            assert!(outcome.feasible.is_empty());
        }
    }
}

#[test]
fn test_documented_scenario() {
    let catalog = Catalog::new(vec![
        Subject::new("A", 4),
        Subject::new("B", 4),
        Subject::new("C", 2),
    ])
    .unwrap();
    let current: ScoreAssignment = [("A", 6), ("B", 6), ("C", 6)].into_iter().collect();
    assert_eq!(compute_average(&current, &catalog).unwrap().to_string(), "6.00");

    let target: Target = "7.00".parse().unwrap();
    let outcome = search(&SearchRequest::new(current.clone(), target), &catalog).unwrap();
    let (expected, _) = oracle(&catalog, &current, &BTreeSet::new(), target);

    assert_eq!(outcome.feasible[0].effort, expected[0].0);
    assert_eq!(outcome.feasible[0].assignment, expected[0].1);

    // Raising A alone to 10 is feasible but costs more
    let a_only: ScoreAssignment = [("A", 10), ("B", 6), ("C", 6)].into_iter().collect();
    let a_only = outcome
        .feasible
        .iter()
        .find(|c| c.assignment == a_only)
        .unwrap();
    assert_eq!(a_only.effort, 16);
    assert_eq!(a_only.achieved_average.to_string(), "7.60");

    // Raising C alone never gets there
    let c_only: ScoreAssignment = [("A", 6), ("B", 6), ("C", 10)].into_iter().collect();
    assert!(!outcome.feasible.iter().any(|c| c.assignment == c_only));
}
