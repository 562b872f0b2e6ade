use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::planner::{
    validate_catalog, Catalog, SearchOptions, Subject, DEFAULT_MAX_COMBINATIONS, DEFAULT_MAX_SCORE,
};

/// Top-level configuration: the grading scale and the subject catalog.
///
/// Example YAML:
/// ```yaml
/// max_score: 10
/// search:
///   max_combinations: 20000000
///   top: 3
/// courses:
///   - name: Science
///     subjects:
///       - { name: Math, credits: 4 }
///       - { name: Physics, credits: 4 }
///     electives:
///       - name: Biology
///         subjects:
///           - { name: Biology, credits: 2 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Highest score on the grading scale (default: 10)
    #[serde(default)]
    pub max_score: Option<u8>,

    #[serde(default)]
    pub search: Option<SearchConfig>,

    pub courses: Vec<CourseConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Refuse searches larger than this many combinations
    #[serde(default)]
    pub max_combinations: Option<u64>,

    /// How many plans `plan` shows by default
    #[serde(default)]
    pub top: Option<usize>,
}

/// A course: subjects every student takes, plus optional electives.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CourseConfig {
    pub name: String,
    pub subjects: Vec<SubjectConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub electives: Vec<ElectiveConfig>,
}

/// An elective adds its subjects to the course's core subjects.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ElectiveConfig {
    pub name: String,
    pub subjects: Vec<SubjectConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SubjectConfig {
    pub name: String,
    pub credits: u32,
}

pub const DEFAULT_TOP: usize = 3;

fn subjects(list: &[(&str, u32)]) -> Vec<SubjectConfig> {
    list.iter()
        .map(|(name, credits)| SubjectConfig {
            name: name.to_string(),
            credits: *credits,
        })
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_score: Some(DEFAULT_MAX_SCORE),
            search: Some(SearchConfig {
                max_combinations: Some(DEFAULT_MAX_COMBINATIONS),
                top: Some(DEFAULT_TOP),
            }),
            courses: vec![
                CourseConfig {
                    name: "Science".to_string(),
                    subjects: subjects(&[
                        ("Mathematics", 4),
                        ("Physics", 4),
                        ("Chemistry", 3),
                        ("English", 2),
                    ]),
                    electives: vec![
                        ElectiveConfig {
                            name: "Biology".to_string(),
                            subjects: subjects(&[("Biology", 3)]),
                        },
                        ElectiveConfig {
                            name: "Computer Science".to_string(),
                            subjects: subjects(&[("Computer Science", 3)]),
                        },
                    ],
                },
                CourseConfig {
                    name: "Commerce".to_string(),
                    subjects: subjects(&[
                        ("Accountancy", 4),
                        ("Economics", 4),
                        ("Business Studies", 3),
                        ("English", 2),
                    ]),
                    electives: vec![],
                },
            ],
        }
    }
}

impl Config {
    pub fn max_score(&self) -> u8 {
        self.max_score.unwrap_or(DEFAULT_MAX_SCORE)
    }

    pub fn default_top(&self) -> usize {
        self.search
            .as_ref()
            .and_then(|s| s.top)
            .unwrap_or(DEFAULT_TOP)
    }

    pub fn search_options(&self) -> SearchOptions {
        let max_combinations = self
            .search
            .as_ref()
            .and_then(|s| s.max_combinations)
            .unwrap_or(DEFAULT_MAX_COMBINATIONS);
        SearchOptions {
            limit: None,
            max_combinations: Some(max_combinations),
        }
    }

    /// Find a course by name (case-insensitive). With no name, the only course is used.
    pub fn course(&self, name: Option<&str>) -> Result<&CourseConfig> {
        match name {
            Some(name) => self
                .courses
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .with_context(|| {
                    format!("Unknown course '{}'. Available: {}", name, self.course_names())
                }),
            None if self.courses.len() == 1 => Ok(&self.courses[0]),
            None => bail!("Pick a course with --course. Available: {}", self.course_names()),
        }
    }

    /// Build the subject catalog for a course and elective selection.
    pub fn catalog(&self, course: Option<&str>, elective: Option<&str>) -> Result<Catalog> {
        let course = self.course(course)?;
        let mut subjects: Vec<Subject> =
            course.subjects.iter().map(SubjectConfig::to_subject).collect();

        if let Some(elective) = course.elective(elective)? {
            subjects.extend(elective.subjects.iter().map(SubjectConfig::to_subject));
        }

        Catalog::with_max_score(subjects, self.max_score())
            .with_context(|| format!("Invalid subjects for course '{}'", course.name))
    }

    fn course_names(&self) -> String {
        self.courses
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl CourseConfig {
    /// Resolve the elective selection. Naming an elective for a course without
    /// electives is an error; a course with exactly one elective uses it when none is named.
    pub fn elective(&self, name: Option<&str>) -> Result<Option<&ElectiveConfig>> {
        if self.electives.is_empty() {
            if let Some(name) = name {
                bail!("Course '{}' has no electives (got '{}')", self.name, name);
            }
            return Ok(None);
        }

        match name {
            Some(name) => self
                .electives
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(name))
                .map(Some)
                .with_context(|| {
                    format!(
                        "Unknown elective '{}' for course '{}'. Available: {}",
                        name,
                        self.name,
                        self.elective_names()
                    )
                }),
            None if self.electives.len() == 1 => Ok(Some(&self.electives[0])),
            None => bail!(
                "Course '{}' needs an elective (--elective). Available: {}",
                self.name,
                self.elective_names()
            ),
        }
    }

    fn elective_names(&self) -> String {
        self.electives
            .iter()
            .map(|e| e.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl SubjectConfig {
    fn to_subject(&self) -> Subject {
        Subject::new(self.name.clone(), self.credits)
    }
}

/// Validate the whole configuration: every course/elective combination must
/// form a valid catalog.
///
/// Returns a list of all validation errors found (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.courses.is_empty() {
        errors.push("courses: at least one course is required".to_string());
    }

    if let Some(SearchConfig {
        max_combinations: Some(0),
        ..
    }) = config.search
    {
        errors.push("search.max_combinations: must be positive".to_string());
    }

    let mut course_names = HashSet::new();
    for (i, course) in config.courses.iter().enumerate() {
        if !course_names.insert(course.name.to_lowercase()) {
            errors.push(format!("courses[{}].name: duplicate course '{}'", i, course.name));
        }

        let core: Vec<Subject> = course.subjects.iter().map(SubjectConfig::to_subject).collect();
        let mut combos: Vec<(String, Vec<Subject>)> = Vec::new();
        if course.electives.is_empty() {
            combos.push((format!("courses[{}]", i), core));
        } else {
            for (j, elective) in course.electives.iter().enumerate() {
                let mut subjects = core.clone();
                subjects.extend(elective.subjects.iter().map(SubjectConfig::to_subject));
                combos.push((format!("courses[{}].electives[{}]", i, j), subjects));
            }
        }

        for (path, subjects) in combos {
            if let Err(catalog_errors) = validate_catalog(&subjects, config.max_score()) {
                errors.extend(catalog_errors.into_iter().map(|e| format!("{}: {}", path, e)));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        errors.dedup();
        Err(errors)
    }
}
