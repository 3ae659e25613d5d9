//! FFI use-case API for UI-facing calls.
//!
//! # Responsibility
//! - Expose the budget editing session to the UI layer via FRB.
//! - Keep error semantics simple: envelope structs, never exceptions.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Exactly one editing session is active per process; opening a session
//!   replaces the previous one wholesale.
//! - Raw text-field input is parsed here; the editor only sees numbers.

use log::info;
use planbook_core::db::open_db;
use planbook_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, parse_percent,
    ping as ping_inner, BudgetDraft, BudgetService, DistributionEditor, NotificationKind,
    SqliteBudgetRepository,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use uuid::Uuid;

const SESSION_DB_FILE_NAME: &str = "planbook.sqlite3";
static SESSION_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static ACTIVE_SESSION: Mutex<Option<EditingSession>> = Mutex::new(None);

struct EditingSession {
    draft: BudgetDraft,
    editor: DistributionEditor,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on
///   failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One distribution row as rendered by the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    /// Calendar month, 1 through 12.
    pub month: u8,
    /// Current percent share.
    pub percent: f64,
    /// Whether the month is protected from normalization.
    pub locked: bool,
}

/// Snapshot of the active editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStateResponse {
    /// Whether an editing session is currently open.
    pub active: bool,
    /// Persisted budget id, when the draft has been saved before.
    pub budget_id: Option<String>,
    /// Draft name/year/cost-center metadata.
    pub name: String,
    pub year: i32,
    pub cost_center: String,
    /// Current rows with their lock flags, month order.
    pub rows: Vec<SessionRow>,
    /// Display total, two decimals.
    pub total: String,
    /// Whether the total sits inside the validity band around 100.00.
    pub valid: bool,
    /// Human-readable diagnostics message (empty when nothing to report).
    pub message: String,
}

/// Outcome envelope for save/copy session commands.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionActionResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Notification severity label (`success|error|info`).
    pub kind: String,
    /// Human-readable outcome message.
    pub message: String,
    /// Persisted budget id after a successful save.
    pub budget_id: Option<String>,
}

/// Opens an editing session for a budget that does not exist in storage.
///
/// The editor loads the default even split (8.33 per month), all months
/// unlocked.
///
/// # FFI contract
/// - Sync call, in-memory execution.
/// - Never panics; replaces any previously active session.
#[flutter_rust_bridge::frb(sync)]
pub fn session_open_new(name: String, year: i32, cost_center: String) -> SessionStateResponse {
    let mut guard = lock_session();
    info!("event=session_open module=ffi status=ok mode=new year={year}");
    *guard = Some(EditingSession {
        draft: BudgetDraft::new(name, year, cost_center),
        editor: DistributionEditor::with_default_rows(),
    });
    snapshot(&guard, String::new())
}

/// Opens an editing session for a persisted budget.
///
/// The editor loads the budget's stored distribution rows, or the default
/// even split when none are stored. All months start unlocked.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; on failure the previous session (if any) stays active
///   and the response carries the failure message.
#[flutter_rust_bridge::frb(sync)]
pub fn session_open(budget_id: String) -> SessionStateResponse {
    let mut guard = lock_session();

    let parsed = match Uuid::parse_str(budget_id.trim()) {
        Ok(parsed) => parsed,
        Err(_) => {
            return snapshot(&guard, format!("invalid budget id `{budget_id}`"));
        }
    };

    let fetched = with_budget_service(|service| service.get_budget(parsed));
    match fetched {
        Ok(Ok(Some(budget))) => {
            let rows = budget
                .distributions
                .clone()
                .filter(|rows| !rows.is_empty());
            let mut editor = DistributionEditor::new();
            editor.initialize(rows);
            info!(
                "event=session_open module=ffi status=ok mode=existing budget_id={}",
                budget.id
            );
            *guard = Some(EditingSession {
                draft: BudgetDraft::for_budget(&budget),
                editor,
            });
            snapshot(&guard, String::new())
        }
        Ok(Ok(None)) => snapshot(&guard, format!("budget not found: {parsed}")),
        Ok(Err(err)) => snapshot(&guard, format!("session_open failed: {err}")),
        Err(err) => snapshot(&guard, err),
    }
}

/// Returns the current session snapshot without changing state.
///
/// # FFI contract
/// - Sync call, in-memory execution, never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn session_state() -> SessionStateResponse {
    let guard = lock_session();
    snapshot(&guard, String::new())
}

/// Applies raw percent input from a text field to one month.
///
/// Malformed input is silently ignored, keeping typing responsive; the
/// returned snapshot simply reflects the unchanged state.
///
/// # FFI contract
/// - Sync call, in-memory execution, never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn session_set_percent(month: u8, raw_value: String) -> SessionStateResponse {
    let mut guard = lock_session();
    if let Some(session) = guard.as_mut() {
        if let Some(percent) = parse_percent(&raw_value) {
            session.editor.set_percent(month, percent);
        }
    }
    snapshot(&guard, String::new())
}

/// Flips the lock flag for one month.
///
/// # FFI contract
/// - Sync call, in-memory execution, never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn session_toggle_lock(month: u8) -> SessionStateResponse {
    let mut guard = lock_session();
    if let Some(session) = guard.as_mut() {
        session.editor.toggle_lock(month);
    }
    snapshot(&guard, String::new())
}

/// Forces the distribution total to 100.00.
///
/// # FFI contract
/// - Sync call, in-memory execution, never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn session_normalize() -> SessionStateResponse {
    let mut guard = lock_session();
    if let Some(session) = guard.as_mut() {
        session.editor.normalize();
    }
    snapshot(&guard, String::new())
}

/// Persists the active session's distribution set.
///
/// Creates the budget on first save, updates it afterwards. On success the
/// session draft adopts the persisted id, so subsequent saves update.
///
/// # FFI contract
/// - Sync call, DB-backed execution, never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn session_save() -> SessionActionResponse {
    let mut guard = lock_session();
    let Some(session) = guard.as_mut() else {
        return no_session_response();
    };

    let editor = session.editor.clone();
    let draft = session.draft.clone();
    let outcome = with_budget_service(move |service| service.save(&editor, &draft));

    match outcome {
        Ok(outcome) => {
            if let Some(budget) = &outcome.budget {
                session.draft.id = Some(budget.id);
                session.draft.name = budget.name.clone();
            }
            SessionActionResponse {
                ok: outcome.notification.kind == NotificationKind::Success,
                kind: outcome.notification.kind.as_str().to_string(),
                message: outcome.notification.message,
                budget_id: outcome.budget.map(|budget| budget.id.to_string()),
            }
        }
        Err(err) => SessionActionResponse {
            ok: false,
            kind: NotificationKind::Error.as_str().to_string(),
            message: err,
            budget_id: None,
        },
    }
}

/// Replaces the session's rows with the prior fiscal year's distribution.
///
/// # FFI contract
/// - Sync call, DB-backed execution, never panics.
/// - On a neutral or failed outcome the session rows stay unchanged.
#[flutter_rust_bridge::frb(sync)]
pub fn session_copy_last_year() -> SessionActionResponse {
    let mut guard = lock_session();
    let Some(session) = guard.as_mut() else {
        return no_session_response();
    };

    let mut editor = session.editor.clone();
    let cost_center = session.draft.cost_center.clone();
    let year = session.draft.year;
    let outcome =
        with_budget_service(move |service| {
            let notification = service.copy_last_year(&mut editor, &cost_center, year);
            (notification, editor)
        });

    match outcome {
        Ok((notification, editor)) => {
            session.editor = editor;
            SessionActionResponse {
                ok: notification.kind != NotificationKind::Error,
                kind: notification.kind.as_str().to_string(),
                message: notification.message,
                budget_id: None,
            }
        }
        Err(err) => SessionActionResponse {
            ok: false,
            kind: NotificationKind::Error.as_str().to_string(),
            message: err,
            budget_id: None,
        },
    }
}

fn lock_session() -> MutexGuard<'static, Option<EditingSession>> {
    match ACTIVE_SESSION.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn no_session_response() -> SessionActionResponse {
    SessionActionResponse {
        ok: false,
        kind: NotificationKind::Error.as_str().to_string(),
        message: "no active editing session".to_string(),
        budget_id: None,
    }
}

fn snapshot(
    guard: &MutexGuard<'_, Option<EditingSession>>,
    message: String,
) -> SessionStateResponse {
    match guard.as_ref() {
        Some(session) => SessionStateResponse {
            active: true,
            budget_id: session.draft.id.map(|id| id.to_string()),
            name: session.draft.name.clone(),
            year: session.draft.year,
            cost_center: session.draft.cost_center.clone(),
            rows: session
                .editor
                .rows()
                .iter()
                .map(|row| SessionRow {
                    month: row.month,
                    percent: row.percent,
                    locked: session.editor.is_locked(row.month),
                })
                .collect(),
            total: session.editor.total_display(),
            valid: session.editor.is_valid(),
            message,
        },
        None => SessionStateResponse {
            active: false,
            budget_id: None,
            name: String::new(),
            year: 0,
            cost_center: String::new(),
            rows: Vec::new(),
            total: "0.00".to_string(),
            valid: false,
            message,
        },
    }
}

fn resolve_session_db_path() -> PathBuf {
    SESSION_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("PLANBOOK_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(SESSION_DB_FILE_NAME)
        })
        .clone()
}

fn with_budget_service<T>(
    f: impl FnOnce(&mut BudgetService<SqliteBudgetRepository<'_>>) -> T,
) -> Result<T, String> {
    let db_path = resolve_session_db_path();
    let mut conn = open_db(&db_path).map_err(|err| format!("budget DB open failed: {err}"))?;
    let repo = SqliteBudgetRepository::try_new(&mut conn)
        .map_err(|err| format!("budget repo init failed: {err}"))?;
    let mut service = BudgetService::new(repo);
    Ok(f(&mut service))
}
