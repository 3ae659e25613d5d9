//! Budget save and copy-last-year orchestration.
//!
//! # Responsibility
//! - Persist the edited distribution set (create or update).
//! - Pull the prior fiscal year's distribution set into the editor.
//! - Report every outcome as a notification; no failure escapes as an error.
//!
//! # Invariants
//! - A failed operation leaves the editor state untouched.
//! - Save never checks validity; gating on the 100.00 total is a
//!   presentation-layer policy.
//! - Copy-last-year replaces the editor wholesale, resetting all locks.

use crate::editor::distribution::{DistributionEditor, EditorAction};
use crate::model::budget::{Budget, BudgetDraft, BudgetId, BudgetPayload, DistributionRow};
use crate::model::notification::Notification;
use crate::repo::budget_repo::{BudgetListQuery, BudgetRepository, RepoError, RepoResult};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Internal service error, converted to a notification at the boundary.
#[derive(Debug)]
pub enum BudgetServiceError {
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for BudgetServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent budget state: {details}"),
        }
    }
}

impl Error for BudgetServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::InconsistentState(_) => None,
        }
    }
}

impl From<RepoError> for BudgetServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Result envelope for [`BudgetService::save`].
///
/// `budget` carries the persisted record on success so callers can refresh
/// their selected-budget state; it is `None` on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub notification: Notification,
    pub budget: Option<Budget>,
}

/// Use-case service for budget editing orchestration.
pub struct BudgetService<R: BudgetRepository> {
    repo: R,
}

impl<R: BudgetRepository> BudgetService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists the editor's current distribution set.
    ///
    /// Updates when the draft carries an id, creates otherwise (carrying
    /// name/year/cost-center metadata). The persisted record is re-read and
    /// surfaced on success.
    ///
    /// # Side effects
    /// - Emits `budget_save` logging events with duration and status.
    pub fn save(&mut self, editor: &DistributionEditor, draft: &BudgetDraft) -> SaveOutcome {
        let started_at = Instant::now();
        let mode = if draft.id.is_some() { "update" } else { "create" };
        info!("event=budget_save module=service status=start mode={mode}");

        match self.save_inner(editor, draft) {
            Ok(budget) => {
                info!(
                    "event=budget_save module=service status=ok mode={mode} duration_ms={} budget_id={}",
                    started_at.elapsed().as_millis(),
                    budget.id
                );
                SaveOutcome {
                    notification: Notification::success(format!(
                        "Budget `{}` saved for {}.",
                        budget.name, budget.year
                    )),
                    budget: Some(budget),
                }
            }
            Err(err) => {
                error!(
                    "event=budget_save module=service status=error mode={mode} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                SaveOutcome {
                    notification: Notification::error(save_failure_message(&err)),
                    budget: None,
                }
            }
        }
    }

    fn save_inner(
        &mut self,
        editor: &DistributionEditor,
        draft: &BudgetDraft,
    ) -> Result<Budget, BudgetServiceError> {
        let payload = BudgetPayload {
            name: draft.name.clone(),
            year: draft.year,
            cost_center: draft.cost_center.clone(),
            distributions: editor.rows().to_vec(),
        };

        let id = match draft.id {
            Some(id) => {
                self.repo.update_budget(id, &payload)?;
                id
            }
            None => self.repo.create_budget(&payload)?,
        };

        self.repo
            .get_budget(id)?
            .ok_or(BudgetServiceError::InconsistentState(
                "saved budget not found in read-back",
            ))
    }

    /// Replaces the editor state with the prior year's distribution set.
    ///
    /// Looks up the sibling budget at `year - 1` under the same cost center.
    /// When the light list shape omits distribution rows, a detail-level
    /// fetch fills them in. A non-empty set replaces the editor wholesale
    /// (all locks reset); a missing sibling or an empty set reports a
    /// neutral outcome and leaves the editor untouched.
    ///
    /// # Side effects
    /// - Emits `budget_copy_last_year` logging events.
    pub fn copy_last_year(
        &self,
        editor: &mut DistributionEditor,
        cost_center: &str,
        year: i32,
    ) -> Notification {
        let source_year = year - 1;
        info!(
            "event=budget_copy_last_year module=service status=start cost_center={cost_center} source_year={source_year}"
        );

        match self.fetch_prior_year_rows(cost_center, source_year) {
            Ok(Some(rows)) if !rows.is_empty() => {
                let count = rows.len();
                editor.apply(EditorAction::Initialize(Some(rows)));
                info!(
                    "event=budget_copy_last_year module=service status=ok cost_center={cost_center} source_year={source_year} rows={count}"
                );
                Notification::success(format!(
                    "Copied {count} distribution rows from {source_year}."
                ))
            }
            Ok(Some(_)) => {
                info!(
                    "event=budget_copy_last_year module=service status=empty cost_center={cost_center} source_year={source_year}"
                );
                Notification::info(format!(
                    "The {source_year} budget for `{cost_center}` has no distributions."
                ))
            }
            Ok(None) => {
                info!(
                    "event=budget_copy_last_year module=service status=not_found cost_center={cost_center} source_year={source_year}"
                );
                Notification::info(format!(
                    "No budget found for `{cost_center}` in {source_year}."
                ))
            }
            Err(err) => {
                error!(
                    "event=budget_copy_last_year module=service status=error cost_center={cost_center} source_year={source_year} error={err}"
                );
                Notification::error(format!("Copy from {source_year} failed: {err}"))
            }
        }
    }

    /// Fetches the prior-year distribution rows, if a sibling budget exists.
    ///
    /// Returns `Ok(None)` when there is no sibling, `Ok(Some(rows))` with
    /// the rows otherwise (possibly empty).
    fn fetch_prior_year_rows(
        &self,
        cost_center: &str,
        source_year: i32,
    ) -> Result<Option<Vec<DistributionRow>>, BudgetServiceError> {
        let query = BudgetListQuery {
            cost_center: Some(cost_center.to_string()),
            year: Some(source_year),
            include_distributions: false,
        };

        let Some(sibling) = self.repo.list_budgets(&query)?.into_iter().next() else {
            return Ok(None);
        };

        match sibling.distributions {
            Some(rows) if !rows.is_empty() => Ok(Some(rows)),
            _ => {
                let detail = self.repo.get_budget(sibling.id)?.ok_or(
                    BudgetServiceError::InconsistentState("listed budget missing in detail fetch"),
                )?;
                Ok(Some(detail.distributions.unwrap_or_default()))
            }
        }
    }

    /// Gets one budget by id, for selection flows outside the editor.
    pub fn get_budget(&self, id: BudgetId) -> RepoResult<Option<Budget>> {
        self.repo.get_budget(id)
    }

    /// Lists budgets using filter options.
    pub fn list_budgets(&self, query: &BudgetListQuery) -> RepoResult<Vec<Budget>> {
        self.repo.list_budgets(query)
    }
}

/// Builds the failure message for a rejected save.
///
/// A structured validation rejection is serialized so the presentation
/// layer receives the machine-readable detail; everything else falls back
/// to the error's display form.
fn save_failure_message(err: &BudgetServiceError) -> String {
    if let BudgetServiceError::Repo(RepoError::Validation(details)) = err {
        if let Ok(payload) = serde_json::to_string(details) {
            return format!("Save rejected: {payload}");
        }
    }
    format!("Save failed: {err}")
}

#[cfg(test)]
mod tests {
    use super::{save_failure_message, BudgetServiceError};
    use crate::model::budget::BudgetValidationError;
    use crate::repo::budget_repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn validation_failures_serialize_their_structured_detail() {
        let err = BudgetServiceError::Repo(RepoError::Validation(
            BudgetValidationError::MonthOutOfRange { month: 14 },
        ));
        let message = save_failure_message(&err);
        assert!(message.starts_with("Save rejected: "));
        assert!(message.contains("\"code\":\"month_out_of_range\""));
        assert!(message.contains("\"month\":14"));
    }

    #[test]
    fn other_failures_fall_back_to_display_form() {
        let id = Uuid::new_v4();
        let err = BudgetServiceError::Repo(RepoError::NotFound(id));
        let message = save_failure_message(&err);
        assert_eq!(message, format!("Save failed: budget not found: {id}"));
    }
}
