//! Award-category eligibility rules.
//!
//! Each grant tier carries a funding band, an optional co-financing band and
//! a maximum project duration. The functions here never fail: an unselected
//! category is permissive, and unusable figures simply fail the range checks.

mod budget;
mod category;
mod limits;

pub use budget::{
    assess, evaluate_budget, evaluate_duration, format_bzd, BudgetEvaluation, BudgetFigures,
    EligibilityIssue,
};
pub use category::AwardCategory;
pub use limits::{get_limits, AwardLimits, CoFinancingRange};
