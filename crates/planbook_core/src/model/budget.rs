//! Budget domain model.
//!
//! # Responsibility
//! - Define the canonical budget record and its monthly distribution rows.
//! - Provide the default evenly-split distribution used by new budgets.
//! - Validate write payloads before they reach persistence.
//!
//! # Invariants
//! - `month` values are calendar months, 1 through 12.
//! - A well-formed distribution set has no duplicate months.
//! - Validation never inspects the percent total; whether percents sum to
//!   100 is an editor-level concern, not a storage rule.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a persisted budget.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type BudgetId = Uuid;

/// First calendar month of a budget year.
pub const MONTH_MIN: u8 = 1;
/// Last calendar month of a budget year.
pub const MONTH_MAX: u8 = 12;
/// Number of rows in a complete distribution set.
pub const MONTHS_PER_YEAR: usize = 12;

/// Percent assigned to each month by the default even split.
///
/// Fixed two-decimal approximation of one twelfth. Twelve of these sum to
/// 99.96, not 100.00; a fresh editor starts invalid until normalized.
pub const DEFAULT_MONTH_PERCENT: f64 = 8.33;

/// One calendar month's share of an annual budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionRow {
    /// Calendar month, 1 through 12.
    pub month: u8,
    /// Share of the annual budget, in percent.
    pub percent: f64,
}

impl DistributionRow {
    pub fn new(month: u8, percent: f64) -> Self {
        Self { month, percent }
    }
}

/// Returns the default distribution: months 1..=12 at 8.33 percent each.
pub fn default_distribution() -> Vec<DistributionRow> {
    (MONTH_MIN..=MONTH_MAX)
        .map(|month| DistributionRow::new(month, DEFAULT_MONTH_PERCENT))
        .collect()
}

/// Persisted budget record.
///
/// `distributions` is `None` in list-level shapes that skip the row fetch;
/// detail-level reads always carry `Some`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Stable global ID used for linking and updates.
    pub id: BudgetId,
    /// Display name.
    pub name: String,
    /// Fiscal year this budget covers.
    pub year: i32,
    /// Owning cost center identifier.
    pub cost_center: String,
    /// Monthly distribution rows, month order. Absent in light list shapes.
    pub distributions: Option<Vec<DistributionRow>>,
    /// Update timestamp in epoch milliseconds.
    pub updated_at: i64,
}

/// Editing-session metadata for the budget currently being edited.
///
/// `id = None` means the budget has never been persisted; Save creates it.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetDraft {
    pub id: Option<BudgetId>,
    pub name: String,
    pub year: i32,
    pub cost_center: String,
}

impl BudgetDraft {
    /// Creates a draft for a budget that does not exist in storage yet.
    pub fn new(name: impl Into<String>, year: i32, cost_center: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            year,
            cost_center: cost_center.into(),
        }
    }

    /// Creates a draft for an already-persisted budget.
    pub fn for_budget(budget: &Budget) -> Self {
        Self {
            id: Some(budget.id),
            name: budget.name.clone(),
            year: budget.year,
            cost_center: budget.cost_center.clone(),
        }
    }
}

/// Write shape accepted by budget create/update operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetPayload {
    pub name: String,
    pub year: i32,
    pub cost_center: String,
    pub distributions: Vec<DistributionRow>,
}

impl BudgetPayload {
    /// Checks payload well-formedness before persistence.
    ///
    /// # Errors
    /// - `BlankName` when the trimmed name is empty.
    /// - `MonthOutOfRange` / `DuplicateMonth` for malformed month sets.
    /// - `NonFinitePercent` when a row carries NaN or an infinity.
    pub fn validate(&self) -> Result<(), BudgetValidationError> {
        if self.name.trim().is_empty() {
            return Err(BudgetValidationError::BlankName);
        }

        let mut seen = BTreeSet::new();
        for row in &self.distributions {
            if !(MONTH_MIN..=MONTH_MAX).contains(&row.month) {
                return Err(BudgetValidationError::MonthOutOfRange { month: row.month });
            }
            if !seen.insert(row.month) {
                return Err(BudgetValidationError::DuplicateMonth { month: row.month });
            }
            if !row.percent.is_finite() {
                return Err(BudgetValidationError::NonFinitePercent { month: row.month });
            }
        }

        Ok(())
    }
}

/// Structured rejection detail for malformed budget payloads.
///
/// Serializes to a tagged object so orchestration can surface the exact
/// rejection as a machine-readable string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum BudgetValidationError {
    BlankName,
    MonthOutOfRange { month: u8 },
    DuplicateMonth { month: u8 },
    NonFinitePercent { month: u8 },
}

impl Display for BudgetValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "budget name must not be blank"),
            Self::MonthOutOfRange { month } => {
                write!(f, "month {month} is outside the calendar range 1..=12")
            }
            Self::DuplicateMonth { month } => write!(f, "month {month} appears more than once"),
            Self::NonFinitePercent { month } => {
                write!(f, "month {month} carries a non-finite percent")
            }
        }
    }
}

impl Error for BudgetValidationError {}

#[cfg(test)]
mod tests {
    use super::{
        default_distribution, BudgetPayload, BudgetValidationError, DistributionRow,
        DEFAULT_MONTH_PERCENT, MONTHS_PER_YEAR,
    };

    fn payload_with_rows(rows: Vec<DistributionRow>) -> BudgetPayload {
        BudgetPayload {
            name: "Operations".to_string(),
            year: 2026,
            cost_center: "cc-100".to_string(),
            distributions: rows,
        }
    }

    #[test]
    fn default_distribution_covers_every_month_once() {
        let rows = default_distribution();
        assert_eq!(rows.len(), MONTHS_PER_YEAR);
        for (index, row) in rows.iter().enumerate() {
            assert_eq!(usize::from(row.month), index + 1);
            assert_eq!(row.percent, DEFAULT_MONTH_PERCENT);
        }
    }

    #[test]
    fn validate_accepts_default_rows() {
        let payload = payload_with_rows(default_distribution());
        payload.validate().expect("default rows should validate");
    }

    #[test]
    fn validate_rejects_blank_name() {
        let mut payload = payload_with_rows(default_distribution());
        payload.name = "   ".to_string();
        assert_eq!(
            payload.validate().unwrap_err(),
            BudgetValidationError::BlankName
        );
    }

    #[test]
    fn validate_rejects_month_zero_and_thirteen() {
        for month in [0u8, 13u8] {
            let payload = payload_with_rows(vec![DistributionRow::new(month, 50.0)]);
            assert_eq!(
                payload.validate().unwrap_err(),
                BudgetValidationError::MonthOutOfRange { month }
            );
        }
    }

    #[test]
    fn validate_rejects_duplicate_month() {
        let payload = payload_with_rows(vec![
            DistributionRow::new(4, 50.0),
            DistributionRow::new(4, 50.0),
        ]);
        assert_eq!(
            payload.validate().unwrap_err(),
            BudgetValidationError::DuplicateMonth { month: 4 }
        );
    }

    #[test]
    fn validate_rejects_non_finite_percent() {
        let payload = payload_with_rows(vec![DistributionRow::new(7, f64::NAN)]);
        assert_eq!(
            payload.validate().unwrap_err(),
            BudgetValidationError::NonFinitePercent { month: 7 }
        );
    }

    #[test]
    fn validation_error_serializes_with_stable_code() {
        let json =
            serde_json::to_value(BudgetValidationError::DuplicateMonth { month: 9 }).unwrap();
        assert_eq!(json["code"], "duplicate_month");
        assert_eq!(json["month"], 9);
    }
}
