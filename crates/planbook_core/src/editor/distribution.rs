//! Monthly distribution editor.
//!
//! # Responsibility
//! - Hold the `(month, percent)` rows and per-month lock flags of the budget
//!   being edited.
//! - Apply the four editing transitions: initialize, set-percent,
//!   toggle-lock, normalize.
//! - Derive the running total and its validity against the 100.00 target.
//!
//! # Invariants
//! - Only `normalize` ever changes a row the caller did not name, and it
//!   changes exactly one unlocked row per call.
//! - Re-initialization replaces rows and locks wholesale; locks always
//!   restart unlocked.
//! - Locked rows are never adjusted by `normalize`.

use crate::model::budget::{default_distribution, DistributionRow};
use std::collections::BTreeMap;

/// Percent total a complete distribution must reach.
pub const TARGET_TOTAL: f64 = 100.0;

/// Half-open tolerance band around [`TARGET_TOTAL`] accepted as valid.
///
/// Absorbs binary floating-point drift from repeated two-decimal edits.
pub const VALIDITY_TOLERANCE: f64 = 0.005;

/// Editing transition requests, dispatched through [`DistributionEditor::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    /// Replace the whole editor state. `None` loads the default even split.
    Initialize(Option<Vec<DistributionRow>>),
    /// Replace one month's percent. Non-finite percents are ignored.
    SetPercent { month: u8, percent: f64 },
    /// Flip one month's lock flag.
    ToggleLock { month: u8 },
    /// Force the total to 100.00 by adjusting the last unlocked row.
    Normalize,
}

/// State of one budget's distribution editing session.
///
/// Starts empty; callers initialize it with persisted rows or the default
/// even split before editing. One editor instance serves one budget at a
/// time and is reset wholesale when a different budget is opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionEditor {
    rows: Vec<DistributionRow>,
    locks: BTreeMap<u8, bool>,
}

impl DistributionEditor {
    /// Creates an empty editor with no rows and no locks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an editor preloaded with the default even split.
    pub fn with_default_rows() -> Self {
        let mut editor = Self::new();
        editor.initialize(None);
        editor
    }

    /// Current rows in month order.
    pub fn rows(&self) -> &[DistributionRow] {
        &self.rows
    }

    /// Current lock flags, keyed by month.
    pub fn locks(&self) -> &BTreeMap<u8, bool> {
        &self.locks
    }

    /// Whether the given month is protected from automatic adjustment.
    ///
    /// Months without a lock entry report unlocked.
    pub fn is_locked(&self, month: u8) -> bool {
        self.locks.get(&month).copied().unwrap_or(false)
    }

    /// Dispatches one transition request.
    pub fn apply(&mut self, action: EditorAction) {
        match action {
            EditorAction::Initialize(rows) => self.initialize(rows),
            EditorAction::SetPercent { month, percent } => self.set_percent(month, percent),
            EditorAction::ToggleLock { month } => self.toggle_lock(month),
            EditorAction::Normalize => self.normalize(),
        }
    }

    /// Replaces rows and locks wholesale.
    ///
    /// # Contract
    /// - `None` loads months 1..=12 at the default percent each.
    /// - Every month present in the new rows gets an unlocked lock entry;
    ///   prior locks are discarded.
    /// - The row set is taken as given: months are not checked for gaps,
    ///   duplicates or range here. Persistence validates independently.
    pub fn initialize(&mut self, rows: Option<Vec<DistributionRow>>) {
        let rows = rows.unwrap_or_else(default_distribution);
        self.locks = rows.iter().map(|row| (row.month, false)).collect();
        self.rows = rows;
    }

    /// Replaces the percent of the row matching `month`.
    ///
    /// Non-finite percents (the residue of a failed text-field parse) and
    /// unknown months leave the state unchanged. No bounds clamping: a
    /// percent outside [0, 100] is accepted and simply makes the total
    /// invalid.
    pub fn set_percent(&mut self, month: u8, percent: f64) {
        if !percent.is_finite() {
            return;
        }
        if let Some(row) = self.rows.iter_mut().find(|row| row.month == month) {
            row.percent = percent;
        }
    }

    /// Flips the lock flag for `month`.
    ///
    /// Only existing entries flip; an unknown month is a no-op rather than a
    /// fabricated entry.
    pub fn toggle_lock(&mut self, month: u8) {
        if let Some(flag) = self.locks.get_mut(&month) {
            *flag = !*flag;
        }
    }

    /// Forces the total to 100.00 by adjusting a single row.
    ///
    /// Adds `100 - total` to the last unlocked row in month order and rounds
    /// that row to two decimals. When every row is locked (or there are no
    /// rows) nothing changes. The adjusted row is not clamped: a large
    /// enough delta pushes it negative or past 100.
    pub fn normalize(&mut self) {
        let delta = TARGET_TOTAL - self.total();
        let target = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !self.is_locked(row.month))
            .max_by_key(|(_, row)| row.month)
            .map(|(index, _)| index);
        if let Some(index) = target {
            self.rows[index].percent = round_percent(self.rows[index].percent + delta);
        }
    }

    /// Sum of all row percents, unrounded.
    pub fn total(&self) -> f64 {
        self.rows.iter().map(|row| row.percent).sum()
    }

    /// Display form of the total, two decimals.
    pub fn total_display(&self) -> String {
        format!("{:.2}", self.total())
    }

    /// Whether the total sits inside the validity band around 100.00.
    pub fn is_valid(&self) -> bool {
        (self.total() - TARGET_TOTAL).abs() < VALIDITY_TOLERANCE
    }
}

/// Rounds a percent value to two decimal places.
fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
