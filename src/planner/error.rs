use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Inconsistent subject, credit or score data. Every problem found is listed.
    #[error("invalid input: {}", errors.join("; "))]
    InvalidInput { errors: Vec<String> },
    #[error("invalid target '{0}'")]
    InvalidTarget(String),
    /// The enumeration was refused before it started. Not the same as "no feasible plan".
    #[error("search space of {combinations} combinations exceeds the limit of {limit}")]
    SearchSpaceExceeded { combinations: u64, limit: u64 },
}

pub type PlanResult<T> = std::result::Result<T, PlanError>;
