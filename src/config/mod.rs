pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{
    apply_plan, apply_plan_with, ApplicationError, ClipOutcome, EntryResult, PlanReport,
};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    ClipDefinition, ClipMode, ClipPlan, Metadata, PlaceholderDefinition, PlanValidationError,
    ReplaceStrategy, ValidationIssue, NEXT_FIELD_NUMBER,
};
