use serde::{Deserialize, Serialize};

use super::category::AwardCategory;
use super::limits::{get_limits, AwardLimits, CoFinancingRange};

/// Amounts entered on the budget step, in BZD.
///
/// Values are taken as entered; negative or non-finite figures are tolerated
/// here and rejected by the range checks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetFigures {
    pub requested_amount: f64,
    pub co_financing_amount: f64,
}

impl BudgetFigures {
    pub fn new(requested_amount: f64, co_financing_amount: f64) -> Self {
        Self {
            requested_amount,
            co_financing_amount,
        }
    }

    pub fn total_project_cost(&self) -> f64 {
        sanitize(self.requested_amount) + sanitize(self.co_financing_amount)
    }

    /// Co-financing share of total project cost, 0 when the total is 0.
    pub fn co_financing_pct(&self) -> f64 {
        let total = self.total_project_cost();
        if total == 0.0 {
            return 0.0;
        }
        sanitize(self.co_financing_amount) * 100.0 / total
    }

    fn is_valid(&self) -> bool {
        is_valid_amount(self.requested_amount) && is_valid_amount(self.co_financing_amount)
    }
}

/// Outcome of checking budget figures against a category's limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetEvaluation {
    pub within_funding_range: bool,
    pub within_co_financing_range: bool,
    pub co_financing_pct: f64,
}

impl BudgetEvaluation {
    pub fn is_eligible(&self) -> bool {
        self.within_funding_range && self.within_co_financing_range
    }

    /// Percentage rounded to one decimal, for display only.
    pub fn display_co_financing_pct(&self) -> f64 {
        (self.co_financing_pct * 10.0).round() / 10.0
    }
}

pub fn evaluate_budget(category: Option<AwardCategory>, figures: &BudgetFigures) -> BudgetEvaluation {
    let limits = get_limits(category);
    let co_financing_pct = figures.co_financing_pct();

    let within_funding_range = category.is_none()
        || (is_valid_amount(figures.requested_amount)
            && limits.amount_within(figures.requested_amount));

    let within_co_financing_range = match limits.co_financing {
        None => true,
        Some(range) => {
            figures.is_valid()
                && (figures.total_project_cost() == 0.0 || range.contains(co_financing_pct))
        }
    };

    BudgetEvaluation {
        within_funding_range,
        within_co_financing_range,
        co_financing_pct,
    }
}

pub fn evaluate_duration(category: Option<AwardCategory>, duration_months: f64) -> bool {
    let limits = get_limits(category);
    if category.is_none() || limits.max_duration_months.is_none() {
        return true;
    }
    is_valid_amount(duration_months) && limits.duration_within(duration_months)
}

/// A single reason the figures fall outside a category's policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EligibilityIssue {
    FundingOutOfRange {
        category: AwardCategory,
        min_amount: f64,
        max_amount: Option<f64>,
        requested_amount: f64,
    },
    CoFinancingOutOfRange {
        category: AwardCategory,
        range: CoFinancingRange,
        actual_pct: f64,
    },
    DurationTooLong {
        category: AwardCategory,
        max_months: u32,
        requested_months: f64,
    },
}

impl EligibilityIssue {
    pub fn summary(&self) -> String {
        match self {
            EligibilityIssue::FundingOutOfRange {
                category,
                min_amount,
                max_amount,
                ..
            } => match max_amount {
                Some(max) => format!(
                    "{} requests must be between {} and {}",
                    category.label(),
                    format_bzd(*min_amount),
                    format_bzd(*max)
                ),
                None => format!(
                    "{} requests must be at least {}",
                    category.label(),
                    format_bzd(*min_amount)
                ),
            },
            EligibilityIssue::CoFinancingOutOfRange {
                category,
                range,
                actual_pct,
            } => format!(
                "{} require co-financing between {:.0}% and {:.0}% of total project cost (currently {:.1}%)",
                category.label(),
                range.min_pct,
                range.max_pct,
                (actual_pct * 10.0).round() / 10.0
            ),
            EligibilityIssue::DurationTooLong {
                category,
                max_months,
                ..
            } => format!(
                "{} projects may not run longer than {} months",
                category.label(),
                max_months
            ),
        }
    }
}

/// Every policy breach for the given figures, in funding, co-financing, duration order.
pub fn assess(
    category: Option<AwardCategory>,
    figures: &BudgetFigures,
    duration_months: Option<f64>,
) -> Vec<EligibilityIssue> {
    let Some(category) = category else {
        return Vec::new();
    };
    let limits: AwardLimits = get_limits(Some(category));
    let evaluation = evaluate_budget(Some(category), figures);
    let mut issues = Vec::new();

    if !evaluation.within_funding_range {
        issues.push(EligibilityIssue::FundingOutOfRange {
            category,
            min_amount: limits.min_amount,
            max_amount: limits.max_amount,
            requested_amount: figures.requested_amount,
        });
    }

    if let (false, Some(range)) = (evaluation.within_co_financing_range, limits.co_financing) {
        issues.push(EligibilityIssue::CoFinancingOutOfRange {
            category,
            range,
            actual_pct: evaluation.co_financing_pct,
        });
    }

    if let (Some(months), Some(max_months)) = (duration_months, limits.max_duration_months) {
        if !evaluate_duration(Some(category), months) {
            issues.push(EligibilityIssue::DurationTooLong {
                category,
                max_months,
                requested_months: months,
            });
        }
    }

    issues
}

/// Render an amount as `BZD 150,000.01`.
pub fn format_bzd(amount: f64) -> String {
    let cents = (sanitize(amount) * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("BZD {grouped}.{:02}", cents % 100)
}

fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn sanitize(value: f64) -> f64 {
    if is_valid_amount(value) {
        value
    } else {
        0.0
    }
}
