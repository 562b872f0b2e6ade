use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::planner::{ScoreAssignment, SearchOptions, SearchRequest, Target};

/// The inputs of one planning session, as written in a plan file.
///
/// Example YAML:
/// ```yaml
/// course: Science
/// elective: Biology
/// target: 8.5
/// scores:
///   Mathematics: 7
///   Physics: 8
/// locked: [English]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlanInput {
    #[serde(default)]
    pub course: Option<String>,

    #[serde(default)]
    pub elective: Option<String>,

    #[serde(default)]
    pub scores: BTreeMap<String, u8>,

    /// Subjects whose scores must stay as they are
    #[serde(default)]
    pub locked: Vec<String>,

    /// Minimum average, as a number or a quoted decimal
    #[serde(default)]
    pub target: Option<Target>,
}

/// Load a plan file
pub fn load_plan_input(path: &Path) -> Result<PlanInput> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file at {}", path.display()))?;

    serde_saphyr::from_str(&content)
        .with_context(|| format!("Failed to parse plan file: invalid YAML in {}", path.display()))
}

/// Parse a `--score` argument of the form `NAME=SCORE`.
///
/// Splits on the last `=`, so subject names may contain spaces but not `=`.
pub fn parse_score_arg(s: &str) -> Result<(String, u8), String> {
    let (name, score) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=SCORE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing subject name in '{}'", s));
    }
    let score = score
        .trim()
        .parse::<u8>()
        .map_err(|_| format!("invalid score '{}' for {}", score.trim(), name))?;
    Ok((name.to_string(), score))
}

impl PlanInput {
    /// Layer command-line values over the file. Flags win; locks accumulate.
    pub fn apply_overrides(
        &mut self,
        course: Option<String>,
        elective: Option<String>,
        scores: Vec<(String, u8)>,
        locked: Vec<String>,
    ) {
        if course.is_some() {
            self.course = course;
        }
        if elective.is_some() {
            self.elective = elective;
        }
        self.scores.extend(scores);
        for name in locked {
            if !self.locked.contains(&name) {
                self.locked.push(name);
            }
        }
    }

    pub fn current_scores(&self) -> ScoreAssignment {
        self.scores
            .iter()
            .map(|(name, score)| (name.clone(), *score))
            .collect()
    }

    /// Build a search request. A target given on the command line beats the file's.
    pub fn to_request(&self, target: Option<Target>, options: SearchOptions) -> Result<SearchRequest> {
        let Some(target) = target.or(self.target) else {
            bail!("No target given. Pass --target or set `target` in the plan file");
        };

        let locked: BTreeSet<String> = self.locked.iter().cloned().collect();
        Ok(SearchRequest {
            current: self.current_scores(),
            locked,
            target,
            options,
        })
    }
}
