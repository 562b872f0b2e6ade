pub mod error;
pub mod model;
pub mod search;
pub mod validation;

pub use error::{PlanError, PlanResult};
pub use model::{
    compute_average, Average, Catalog, ScoreAssignment, Subject, Target, DEFAULT_MAX_SCORE,
};
pub use search::{
    search, search_space_size, Candidate, Raise, SearchOptions, SearchOutcome, SearchRequest,
    DEFAULT_MAX_COMBINATIONS,
};
pub use validation::{validate_assignment, validate_catalog, validate_request};
