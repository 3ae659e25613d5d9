//! Core domain logic for PlanBook.
//! This crate is the single source of truth for budget editing invariants.

pub mod db;
pub mod editor;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use editor::distribution::{DistributionEditor, EditorAction};
pub use editor::input::parse_percent;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::budget::{
    default_distribution, Budget, BudgetDraft, BudgetId, BudgetPayload, BudgetValidationError,
    DistributionRow, DEFAULT_MONTH_PERCENT, MONTHS_PER_YEAR, MONTH_MAX, MONTH_MIN,
};
pub use model::notification::{Notification, NotificationKind};
pub use repo::budget_repo::{
    BudgetListQuery, BudgetRepository, RepoError, RepoResult, SqliteBudgetRepository,
};
pub use service::budget_service::{BudgetService, BudgetServiceError, SaveOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
