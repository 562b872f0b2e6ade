use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::{PlanError, PlanResult};
use super::validation::{validate_assignment, validate_catalog};

/// Highest score on the default grading scale.
pub const DEFAULT_MAX_SCORE: u8 = 10;

/// Upper bound for a configurable grading scale.
pub const MAX_SCORE_LIMIT: u8 = 100;

/// A subject and its credit weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub credits: u32,
}

impl Subject {
    pub fn new(name: impl Into<String>, credits: u32) -> Self {
        Self {
            name: name.into(),
            credits,
        }
    }
}

/// The subjects of one planning session, in display order.
///
/// Built once and never mutated. Construction rejects empty subject lists,
/// duplicate names, zero credits and grading scales outside `1..=100`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    subjects: Vec<Subject>,
    max_score: u8,
}

impl Catalog {
    pub fn new(subjects: Vec<Subject>) -> PlanResult<Self> {
        Self::with_max_score(subjects, DEFAULT_MAX_SCORE)
    }

    pub fn with_max_score(subjects: Vec<Subject>, max_score: u8) -> PlanResult<Self> {
        validate_catalog(&subjects, max_score).map_err(|errors| PlanError::InvalidInput { errors })?;
        Ok(Self {
            subjects,
            max_score,
        })
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn max_score(&self) -> u8 {
        self.max_score
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn total_credits(&self) -> u64 {
        self.subjects.iter().map(|s| s.credits as u64).sum()
    }
}

/// One score per subject, keyed by subject name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreAssignment(BTreeMap<String, u8>);

impl ScoreAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a subject's score, returning the previous one.
    pub fn set(&mut self, subject: impl Into<String>, score: u8) -> Option<u8> {
        self.0.insert(subject.into(), score)
    }

    pub fn get(&self, subject: &str) -> Option<u8> {
        self.0.get(subject).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.0.iter().map(|(name, score)| (name.as_str(), *score))
    }

    /// Scores laid out in catalog order. Callers validate first.
    pub(crate) fn in_catalog_order(&self, catalog: &Catalog) -> Vec<u8> {
        catalog
            .subjects()
            .iter()
            .map(|s| self.get(&s.name).unwrap_or(0))
            .collect()
    }

    pub(crate) fn from_catalog_order(catalog: &Catalog, scores: &[u8]) -> Self {
        catalog
            .subjects()
            .iter()
            .zip(scores)
            .map(|(s, score)| (s.name.clone(), *score))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, u8)> for ScoreAssignment {
    fn from_iter<I: IntoIterator<Item = (S, u8)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, score)| (name.into(), score)).collect())
    }
}

/// A weighted average in fixed point: a whole number of hundredths.
///
/// Every comparison against a target happens at this granularity, so `6.995`
/// and `7.00` are the same average once rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Average(u32);

impl Average {
    pub const ZERO: Average = Average(0);

    pub fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    pub fn hundredths(self) -> u32 {
        self.0
    }

    /// Round `weighted_sum / total_credits` to two decimals the way rounding
    /// the `f64` quotient does: nearest hundredth of the binary value, exact
    /// ties to even.
    ///
    /// Only a rational that sits exactly on a half hundredth needs the float.
    /// Its nearest `f64` lands above, below or on the tie, and that decides
    /// the direction (`2.675` rounds down, `6.625` rounds to even `6.62`).
    pub(crate) fn from_weighted(weighted_sum: u64, total_credits: u64) -> Self {
        debug_assert!(total_credits > 0);
        let scaled = weighted_sum * 100;
        let floor = scaled / total_credits;
        let twice_rem = 2 * (scaled % total_credits);

        let round_up = match twice_rem.cmp(&total_credits) {
            Ordering::Less => false,
            Ordering::Greater => true,
            Ordering::Equal => {
                let quotient = weighted_sum as f64 / total_credits as f64;
                match cmp_with_half_hundredth(quotient, floor) {
                    Ordering::Less => false,
                    Ordering::Greater => true,
                    Ordering::Equal => floor % 2 == 1,
                }
            }
        };
        Self((floor + round_up as u64) as u32)
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Average {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Compare a finite, non-negative `f64` exactly against `(2 * floor + 1) / 200`.
fn cmp_with_half_hundredth(value: f64, floor: u64) -> Ordering {
    let bits = value.to_bits();
    let exp_bits = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exp) = if exp_bits == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), exp_bits - 1075)
    };

    // value = mantissa * 2^exp; compare mantissa * 200 with (2 * floor + 1) * 2^-exp
    let lhs = mantissa as u128 * 200;
    let tie = 2 * floor as u128 + 1;
    if exp >= 0 {
        return (lhs << exp).cmp(&tie);
    }
    let shift = (-exp) as u32;
    match tie.checked_shl(shift).filter(|r| r >> shift == tie) {
        Some(rhs) => lhs.cmp(&rhs),
        None => Ordering::Less,
    }
}

/// Minimum average a plan has to reach.
///
/// Stored as hundredths rounded up, so that `achieved >= target` on rounded
/// averages keeps at-least semantics for targets with more than two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Target(Average);

impl Target {
    pub fn from_hundredths(hundredths: u32) -> Self {
        Self(Average(hundredths))
    }

    /// Read a float by its shortest decimal form, so `0.07` is 7 hundredths
    /// and `7.0000001` still needs `7.01`.
    pub fn from_f64(value: f64) -> PlanResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(PlanError::InvalidTarget(value.to_string()));
        }
        value.to_string().parse()
    }

    pub fn threshold(self) -> Average {
        self.0
    }

    pub fn is_met_by(self, achieved: Average) -> bool {
        achieved >= self.0
    }
}

impl FromStr for Target {
    type Err = PlanError;

    /// Parse a plain decimal like `7`, `7.5` or `7.125` without going through floats.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlanError::InvalidTarget(s.to_string());
        let trimmed = s.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut digits = frac.chars().map(|c| c as u64 - '0' as u64);
        let tenths = digits.next().unwrap_or(0);
        let cents = digits.next().unwrap_or(0);
        let remainder = digits.any(|d| d != 0) as u64;

        let hundredths = whole
            .checked_mul(100)
            .and_then(|h| h.checked_add(tenths * 10 + cents + remainder))
            .filter(|h| *h <= u32::MAX as u64)
            .ok_or_else(invalid)?;
        Ok(Self(Average(hundredths as u32)))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts a YAML/JSON number or string. Both go through the exact decimal parser.
impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TargetVisitor;

        impl Visitor<'_> for TargetVisitor {
            type Value = Target;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative decimal target such as 7.5")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Target, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Target, E> {
                v.to_string().parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Target, E> {
                v.to_string().parse().map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Target, E> {
                Target::from_f64(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(TargetVisitor)
    }
}

/// Credit-weighted average of a complete assignment, rounded to two decimals.
///
/// # Errors
///
/// Returns [`PlanError::InvalidInput`] if a subject has no score, a score is
/// above the catalog's max score, or the assignment names an unknown subject.
pub fn compute_average(assignment: &ScoreAssignment, catalog: &Catalog) -> PlanResult<Average> {
    validate_assignment(catalog, assignment).map_err(|errors| PlanError::InvalidInput { errors })?;
    let scores = assignment.in_catalog_order(catalog);
    Ok(Average::from_weighted(
        weighted_sum(catalog, &scores),
        catalog.total_credits(),
    ))
}

pub(crate) fn weighted_sum(catalog: &Catalog, scores: &[u8]) -> u64 {
    catalog
        .subjects()
        .iter()
        .zip(scores)
        .map(|(s, score)| s.credits as u64 * *score as u64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        Catalog::new(vec![
            Subject::new("A", 4),
            Subject::new("B", 4),
            Subject::new("C", 2),
        ])
        .unwrap()
    }

    #[test]
    fn test_compute_average_weighted() {
        let catalog = sample_catalog();
        let scores: ScoreAssignment = [("A", 10), ("B", 6), ("C", 6)].into_iter().collect();
        let avg = compute_average(&scores, &catalog).unwrap();
        assert_eq!(avg, Average::from_hundredths(760));
        assert_eq!(avg.to_string(), "7.60");
    }

    #[test]
    fn test_compute_average_order_invariant() {
        let forward = sample_catalog();
        let reversed = Catalog::new(forward.subjects().iter().rev().cloned().collect()).unwrap();
        let scores: ScoreAssignment = [("A", 3), ("B", 9), ("C", 7)].into_iter().collect();
        assert_eq!(
            compute_average(&scores, &forward).unwrap(),
            compute_average(&scores, &reversed).unwrap()
        );
    }

    fn eighths_average(a: u8, b: u8) -> String {
        let catalog = Catalog::new(vec![Subject::new("A", 1), Subject::new("B", 7)]).unwrap();
        let scores: ScoreAssignment = [("A", a), ("B", b)].into_iter().collect();
        compute_average(&scores, &catalog).unwrap().to_string()
    }

    #[test]
    fn test_compute_average_exact_ties_to_even() {
        // 1/8 = 0.125, 53/8 = 6.625, 3/8 = 0.375
        assert_eq!(eighths_average(1, 0), "0.12");
        assert_eq!(eighths_average(4, 7), "6.62");
        assert_eq!(eighths_average(3, 0), "0.38");
    }

    #[test]
    fn test_compute_average_inexact_tie_follows_float() {
        // 107/40 = 2.675, whose nearest f64 is just below the tie
        let catalog = Catalog::new(vec![Subject::new("A", 1), Subject::new("B", 39)]).unwrap();
        let scores: ScoreAssignment = [("A", 29), ("B", 2)].into_iter().collect();
        assert_eq!(compute_average(&scores, &catalog).unwrap().to_string(), "2.67");
    }

    #[test]
    fn test_from_weighted_non_ties() {
        assert_eq!(Average::from_weighted(20, 3).hundredths(), 667);
        assert_eq!(Average::from_weighted(1, 3).hundredths(), 33);
        assert_eq!(Average::from_weighted(100, 10).hundredths(), 1000);
        assert_eq!(Average::from_weighted(0, 7).hundredths(), 0);
    }

    #[test]
    fn test_compute_average_repeating_fraction() {
        // 20/3 = 6.666... -> 6.67
        let catalog = Catalog::new(vec![Subject::new("A", 1), Subject::new("B", 2)]).unwrap();
        let scores: ScoreAssignment = [("A", 6), ("B", 7)].into_iter().collect();
        assert_eq!(compute_average(&scores, &catalog).unwrap().to_string(), "6.67");
    }

    #[test]
    fn test_compute_average_missing_subject() {
        let catalog = sample_catalog();
        let scores: ScoreAssignment = [("A", 6), ("B", 6)].into_iter().collect();
        let err = compute_average(&scores, &catalog).unwrap_err();
        assert!(err.to_string().contains("scores.C"));
    }

    #[test]
    fn test_compute_average_score_out_of_range() {
        let catalog = sample_catalog();
        let scores: ScoreAssignment = [("A", 11), ("B", 6), ("C", 6)].into_iter().collect();
        assert!(matches!(
            compute_average(&scores, &catalog),
            Err(PlanError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_catalog_rejects_zero_credits() {
        let result = Catalog::new(vec![Subject::new("A", 0)]);
        assert!(matches!(result, Err(PlanError::InvalidInput { .. })));
    }

    #[test]
    fn test_catalog_total_credits() {
        assert_eq!(sample_catalog().total_credits(), 10);
    }

    #[test]
    fn test_target_parse_exact() {
        assert_eq!("7".parse::<Target>().unwrap(), Target::from_hundredths(700));
        assert_eq!("7.5".parse::<Target>().unwrap(), Target::from_hundredths(750));
        assert_eq!("7.05".parse::<Target>().unwrap(), Target::from_hundredths(705));
        assert_eq!(".5".parse::<Target>().unwrap(), Target::from_hundredths(50));
    }

    #[test]
    fn test_target_parse_rounds_up_extra_digits() {
        assert_eq!("7.001".parse::<Target>().unwrap(), Target::from_hundredths(701));
        assert_eq!("7.0500".parse::<Target>().unwrap(), Target::from_hundredths(705));
    }

    #[test]
    fn test_target_parse_rejects_garbage() {
        assert!("".parse::<Target>().is_err());
        assert!("-1".parse::<Target>().is_err());
        assert!("seven".parse::<Target>().is_err());
        assert!("7.5.1".parse::<Target>().is_err());
    }

    #[test]
    fn test_target_from_f64() {
        assert_eq!(Target::from_f64(7.0).unwrap(), Target::from_hundredths(700));
        assert_eq!(Target::from_f64(0.07).unwrap(), Target::from_hundredths(7));
        assert_eq!(Target::from_f64(7.001).unwrap(), Target::from_hundredths(701));
        assert_eq!(Target::from_f64(7.0000001).unwrap(), Target::from_hundredths(701));
        assert_eq!(Target::from_f64(1e-7).unwrap(), Target::from_hundredths(1));
        assert!(Target::from_f64(f64::NAN).is_err());
        assert!(Target::from_f64(-0.5).is_err());
    }

    #[test]
    fn test_target_deserialize_number_or_string() {
        let exact: Target = serde_json::from_str("7.0000001").unwrap();
        assert_eq!(exact, Target::from_hundredths(701));
        let whole: Target = serde_json::from_str("8").unwrap();
        assert_eq!(whole, Target::from_hundredths(800));
        let text: Target = serde_json::from_str("\"7.5\"").unwrap();
        assert_eq!(text, Target::from_hundredths(750));
        assert!(serde_json::from_str::<Target>("-1").is_err());
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"7.50\"");
    }

    #[test]
    fn test_target_is_met_by_rounded_average() {
        let target: Target = "7".parse().unwrap();
        assert!(target.is_met_by(Average::from_hundredths(700)));
        assert!(!target.is_met_by(Average::from_hundredths(699)));
    }
}
