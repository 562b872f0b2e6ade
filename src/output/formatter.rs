use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::config::Config;
use crate::planner::{Average, Candidate, Catalog, SearchOutcome, Target};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format the subject changes of one candidate, one per line:
/// "  • Physics → 7 (+1)"
fn format_changes(candidate: &Candidate, catalog: &Catalog, use_colors: bool) -> String {
    let raised = candidate.raised(catalog);
    if raised.is_empty() {
        return "  • no changes needed".to_string();
    }

    raised
        .iter()
        .map(|r| {
            let delta = format!("(+{})", r.delta);
            if use_colors {
                format!("  • {} → {} {}", r.subject.bold(), r.score, delta.green())
            } else {
                format!("  • {} → {} {}", r.subject, r.score, delta)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format ranked plans as numbered options with their subject changes.
///
/// When nothing reaches the target, reports the best achievable average instead.
pub fn format_plan_table(
    outcome: &SearchOutcome,
    catalog: &Catalog,
    target: Target,
    use_colors: bool,
) -> String {
    if !outcome.is_feasible() {
        return format_infeasible(outcome.max_achievable, target, use_colors);
    }

    outcome
        .feasible
        .iter()
        .enumerate()
        .map(|(idx, candidate)| {
            let header = format!(
                "Option {}: average {} | effort {}",
                idx + 1,
                candidate.achieved_average,
                candidate.effort
            );
            let header = if use_colors {
                header.bold().to_string()
            } else {
                header
            };
            format!("{}\n{}", header, format_changes(candidate, catalog, use_colors))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_infeasible(max_achievable: Average, target: Target, use_colors: bool) -> String {
    let max = max_achievable.to_string();
    let max = if use_colors {
        max.yellow().bold().to_string()
    } else {
        max
    };
    format!(
        "Target {} is out of reach. Maximum achievable average with current constraints: {}",
        target, max
    )
}

/// Format plans as tab-separated values for scripting
/// Columns: rank, average, effort, changes (no headers, no colors)
/// Changes are comma-separated `NAME=SCORE` pairs, empty when nothing changes.
pub fn format_tsv(outcome: &SearchOutcome, catalog: &Catalog) -> String {
    outcome
        .feasible
        .iter()
        .enumerate()
        .map(|(idx, candidate)| {
            let changes = candidate
                .raised(catalog)
                .iter()
                .map(|r| format!("{}={}", r.subject, r.score))
                .collect::<Vec<_>>()
                .join(",");
            format!(
                "{}\t{}\t{}\t{}",
                idx + 1,
                candidate.achieved_average,
                candidate.effort,
                changes
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the full outcome as pretty-printed JSON
pub fn format_json(outcome: &SearchOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("Failed to serialize search outcome")
}

/// One-line summary of a search, for verbose mode
pub fn format_summary(outcome: &SearchOutcome) -> String {
    format!(
        "Showing {} of {} plans (current average {}, explored {} combinations)",
        outcome.feasible.len(),
        outcome.total_feasible,
        outcome.current_average,
        outcome.explored
    )
}

/// Format an average with the catalog it was computed over
pub fn format_average(average: Average, catalog: &Catalog, use_colors: bool) -> String {
    let value = average.to_string();
    let value = if use_colors {
        value.bold().to_string()
    } else {
        value
    };
    format!(
        "Average: {} ({} subjects, {} credits)",
        value,
        catalog.len(),
        catalog.total_credits()
    )
}

/// List courses, electives and subjects with their credits
pub fn format_catalog(config: &Config, use_colors: bool) -> String {
    let mut lines = Vec::new();

    for course in &config.courses {
        if use_colors {
            lines.push(course.name.bold().to_string());
        } else {
            lines.push(course.name.clone());
        }
        for subject in &course.subjects {
            lines.push(format!("  {:<24} {:>2} credits", subject.name, subject.credits));
        }
        for elective in &course.electives {
            let label = format!("  elective: {}", elective.name);
            if use_colors {
                lines.push(label.cyan().to_string());
            } else {
                lines.push(label);
            }
            for subject in &elective.subjects {
                lines.push(format!("    {:<22} {:>2} credits", subject.name, subject.credits));
            }
        }
    }

    lines.join("\n")
}
