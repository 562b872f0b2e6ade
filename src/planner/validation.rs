use std::collections::{BTreeSet, HashSet};

use super::model::{Catalog, ScoreAssignment, Subject, MAX_SCORE_LIMIT};

/// Validate the subject list of a catalog.
///
/// Returns a list of all validation errors found (not just the first).
pub fn validate_catalog(subjects: &[Subject], max_score: u8) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if max_score == 0 || max_score > MAX_SCORE_LIMIT {
        errors.push(format!(
            "max_score: must be between 1 and {}, got {}",
            MAX_SCORE_LIMIT, max_score
        ));
    }

    if subjects.is_empty() {
        errors.push("subjects: at least one subject is required".to_string());
    }

    let mut seen = HashSet::new();
    for (i, subject) in subjects.iter().enumerate() {
        if subject.name.trim().is_empty() {
            errors.push(format!("subjects[{}].name: must not be empty", i));
        } else if !seen.insert(subject.name.as_str()) {
            errors.push(format!("subjects[{}].name: duplicate subject '{}'", i, subject.name));
        }
        if subject.credits == 0 {
            errors.push(format!(
                "subjects[{}].credits: '{}' must have a positive credit weight",
                i, subject.name
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate that an assignment holds exactly one in-range score per catalog subject.
pub fn validate_assignment(catalog: &Catalog, scores: &ScoreAssignment) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    collect_assignment_errors(catalog, scores, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the inputs of a search: the current scores and the lock set.
pub fn validate_request(
    catalog: &Catalog,
    current: &ScoreAssignment,
    locked: &BTreeSet<String>,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    collect_assignment_errors(catalog, current, &mut errors);

    for name in locked {
        if !catalog.contains(name) {
            errors.push(format!("locked.{}: unknown subject", name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_assignment_errors(catalog: &Catalog, scores: &ScoreAssignment, errors: &mut Vec<String>) {
    let max = catalog.max_score();

    for subject in catalog.subjects() {
        match scores.get(&subject.name) {
            None => errors.push(format!("scores.{}: missing score", subject.name)),
            Some(score) if score > max => errors.push(format!(
                "scores.{}: {} exceeds max score {}",
                subject.name, score, max
            )),
            Some(_) => {}
        }
    }

    for (name, _) in scores.iter() {
        if !catalog.contains(name) {
            errors.push(format!("scores.{}: unknown subject", name));
        }
    }
}
