use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::error::{PlanError, PlanResult};
use super::model::{weighted_sum, Average, Catalog, ScoreAssignment, Target};
use super::validation::validate_request;

/// Largest search space enumerated by default. Covers seven subjects starting at zero on a 0-10 scale.
pub const DEFAULT_MAX_COMBINATIONS: u64 = 20_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Return only the first `limit` ranked candidates. `None` returns all of them.
    pub limit: Option<usize>,
    /// Refuse to enumerate more combinations than this. `None` disables the bound.
    pub max_combinations: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: None,
            max_combinations: Some(DEFAULT_MAX_COMBINATIONS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub current: ScoreAssignment,
    pub locked: BTreeSet<String>,
    pub target: Target,
    pub options: SearchOptions,
}

impl SearchRequest {
    pub fn new(current: ScoreAssignment, target: Target) -> Self {
        Self {
            current,
            locked: BTreeSet::new(),
            target,
            options: SearchOptions::default(),
        }
    }

    pub fn lock(mut self, subject: impl Into<String>) -> Self {
        self.locked.insert(subject.into());
        self
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }
}

/// A score distribution that reaches the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub achieved_average: Average,
    /// Credit-weighted sum of score increases over the current scores.
    pub effort: u64,
    pub assignment: ScoreAssignment,
    /// `candidate - current` for every subject. Locked subjects are always 0.
    pub deltas: BTreeMap<String, i32>,
}

/// A subject whose score goes up in a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Raise<'a> {
    pub subject: &'a str,
    pub score: u8,
    pub delta: i32,
}

impl Candidate {
    /// Subjects with a positive delta, in catalog order.
    pub fn raised<'a>(&'a self, catalog: &'a Catalog) -> Vec<Raise<'a>> {
        catalog
            .subjects()
            .iter()
            .filter_map(|s| {
                let delta = self.deltas.get(&s.name).copied().unwrap_or(0);
                if delta <= 0 {
                    return None;
                }
                Some(Raise {
                    subject: s.name.as_str(),
                    score: self.assignment.get(&s.name).unwrap_or(0),
                    delta,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    /// Feasible candidates, effort ascending, ties in enumeration order.
    pub feasible: Vec<Candidate>,
    /// Best average anywhere in the enumerated space. Independent of the target.
    pub max_achievable: Average,
    pub current_average: Average,
    /// Combinations enumerated.
    pub explored: u64,
    /// Feasible candidates found, before `limit` was applied.
    pub total_feasible: usize,
}

impl SearchOutcome {
    pub fn is_feasible(&self) -> bool {
        self.total_feasible > 0
    }
}

/// Number of combinations a search would enumerate: the product of
/// `max_score - current + 1` over unlocked subjects. Saturates at `u64::MAX`.
pub fn search_space_size(
    catalog: &Catalog,
    current: &ScoreAssignment,
    locked: &BTreeSet<String>,
) -> u64 {
    catalog
        .subjects()
        .iter()
        .filter(|s| !locked.contains(&s.name))
        .map(|s| {
            let score = current.get(&s.name).unwrap_or(0).min(catalog.max_score());
            (catalog.max_score() - score) as u64 + 1
        })
        .fold(1u64, |acc, n| acc.saturating_mul(n))
}

/// Find every way to raise unlocked scores so the rounded average meets the
/// target, ranked by effort.
///
/// The whole Cartesian product of `[current, max_score]` over unlocked
/// subjects is enumerated, so the ranking is exact. When nothing meets the
/// target, `feasible` is empty and `max_achievable` carries the best average
/// the lock set allows.
///
/// # Errors
///
/// - [`PlanError::InvalidInput`] if scores or locked subjects don't match the catalog
/// - [`PlanError::SearchSpaceExceeded`] if the space is larger than
///   `options.max_combinations`; nothing is enumerated in that case
pub fn search(request: &SearchRequest, catalog: &Catalog) -> PlanResult<SearchOutcome> {
    validate_request(catalog, &request.current, &request.locked)
        .map_err(|errors| PlanError::InvalidInput { errors })?;

    let combinations = search_space_size(catalog, &request.current, &request.locked);
    let current = request.current.in_catalog_order(catalog);
    let modifiable: Vec<usize> = catalog
        .subjects()
        .iter()
        .enumerate()
        .filter(|(_, s)| !request.locked.contains(&s.name))
        .map(|(i, _)| i)
        .collect();

    debug!(
        subjects = catalog.len(),
        modifiable = modifiable.len(),
        combinations,
        target = %request.target,
        "enumerating search space"
    );

    if let Some(limit) = request.options.max_combinations {
        if combinations > limit {
            warn!(combinations, limit, "search space too large, refusing to enumerate");
            return Err(PlanError::SearchSpaceExceeded {
                combinations,
                limit,
            });
        }
    }

    let start = Instant::now();
    let total_credits = catalog.total_credits();
    let base_sum = weighted_sum(catalog, &current);
    let credits: Vec<u64> = modifiable
        .iter()
        .map(|&i| catalog.subjects()[i].credits as u64)
        .collect();
    let headroom: Vec<u8> = modifiable
        .iter()
        .map(|&i| catalog.max_score() - current[i])
        .collect();

    // Odometer over raise amounts; the last modifiable subject turns fastest.
    let mut raises = vec![0u8; modifiable.len()];
    let mut effort = 0u64;
    let mut ordinal = 0u64;
    let mut max_achievable = Average::ZERO;
    let mut hits = Hits::new(request.options.limit);
    let mut total_feasible = 0usize;

    'enumerate: loop {
        // Raising a score by one adds exactly its credits to the weighted sum,
        // so effort doubles as the weighted-sum gain.
        let achieved = Average::from_weighted(base_sum + effort, total_credits);
        max_achievable = max_achievable.max(achieved);
        if request.target.is_met_by(achieved) {
            hits.push((effort, ordinal, achieved));
            total_feasible += 1;
        }
        ordinal += 1;

        let mut pos = raises.len();
        loop {
            if pos == 0 {
                break 'enumerate;
            }
            pos -= 1;
            if raises[pos] < headroom[pos] {
                raises[pos] += 1;
                effort += credits[pos];
                break;
            }
            effort -= raises[pos] as u64 * credits[pos];
            raises[pos] = 0;
        }
    }

    let feasible = hits
        .into_ranked()
        .into_iter()
        .map(|(effort, ordinal, achieved)| {
            let scores = decode_ordinal(ordinal, &current, &modifiable, &headroom);
            build_candidate(catalog, &current, &scores, achieved, effort)
        })
        .collect();

    let current_average = Average::from_weighted(base_sum, total_credits);
    info!(
        explored = ordinal,
        feasible = total_feasible,
        max_achievable = %max_achievable,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search finished"
    );

    Ok(SearchOutcome {
        feasible,
        max_achievable,
        current_average,
        explored: ordinal,
        total_feasible,
    })
}

/// A feasible combination: `(effort, ordinal, average)`.
type Hit = (u64, u64, Average);

/// Collects feasible combinations. With a limit only the best `limit` are
/// kept, in a max-heap keyed on `(effort, ordinal)`.
enum Hits {
    All(Vec<Hit>),
    Top { limit: usize, heap: BinaryHeap<Hit> },
}

impl Hits {
    fn new(limit: Option<usize>) -> Self {
        match limit {
            None => Hits::All(Vec::new()),
            Some(limit) => Hits::Top {
                limit,
                heap: BinaryHeap::with_capacity(limit.min(1024) + 1),
            },
        }
    }

    fn push(&mut self, hit: Hit) {
        match self {
            Hits::All(hits) => hits.push(hit),
            Hits::Top { limit, heap } => {
                if heap.len() < *limit {
                    heap.push(hit);
                } else if heap.peek().is_some_and(|worst| (hit.0, hit.1) < (worst.0, worst.1)) {
                    heap.pop();
                    heap.push(hit);
                }
            }
        }
    }

    /// Effort ascending; equal efforts keep enumeration order.
    fn into_ranked(self) -> Vec<Hit> {
        match self {
            Hits::All(mut hits) => {
                hits.sort_by_key(|(effort, _, _)| *effort);
                hits
            }
            // Ordinals are unique, so the tuple order is effort then enumeration order
            Hits::Top { heap, .. } => heap.into_sorted_vec(),
        }
    }
}

/// Turn an enumeration ordinal back into full catalog-order scores.
fn decode_ordinal(mut ordinal: u64, current: &[u8], modifiable: &[usize], headroom: &[u8]) -> Vec<u8> {
    let mut scores = current.to_vec();
    for (pos, &idx) in modifiable.iter().enumerate().rev() {
        let radix = headroom[pos] as u64 + 1;
        scores[idx] = current[idx] + (ordinal % radix) as u8;
        ordinal /= radix;
    }
    scores
}

fn build_candidate(
    catalog: &Catalog,
    current: &[u8],
    scores: &[u8],
    achieved: Average,
    effort: u64,
) -> Candidate {
    let deltas = catalog
        .subjects()
        .iter()
        .zip(current.iter().zip(scores))
        .map(|(s, (before, after))| (s.name.clone(), *after as i32 - *before as i32))
        .collect();

    Candidate {
        achieved_average: achieved,
        effort,
        assignment: ScoreAssignment::from_catalog_order(catalog, scores),
        deltas,
    }
}
