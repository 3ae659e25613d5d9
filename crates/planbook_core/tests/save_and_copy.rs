use planbook_core::db::open_db_in_memory;
use planbook_core::{
    Budget, BudgetDraft, BudgetId, BudgetListQuery, BudgetPayload, BudgetRepository, BudgetService,
    DistributionEditor, DistributionRow, NotificationKind, RepoError, RepoResult,
    SqliteBudgetRepository,
};
use uuid::Uuid;

fn prior_year_rows() -> Vec<DistributionRow> {
    (1..=12)
        .map(|month| DistributionRow::new(month, if month == 12 { 8.37 } else { 8.33 }))
        .collect()
}

fn percent_of(editor: &DistributionEditor, month: u8) -> f64 {
    editor
        .rows()
        .iter()
        .find(|row| row.month == month)
        .map(|row| row.percent)
        .unwrap_or_else(|| panic!("month {month} should exist"))
}

#[test]
fn save_creates_then_updates_and_surfaces_the_persisted_record() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteBudgetRepository::try_new(&mut conn).unwrap();
    let mut service = BudgetService::new(repo);

    let mut editor = DistributionEditor::with_default_rows();
    editor.normalize();
    let mut draft = BudgetDraft::new("Operations", 2026, "cc-100");

    let created = service.save(&editor, &draft);
    assert_eq!(created.notification.kind, NotificationKind::Success);
    let budget = created.budget.expect("create should surface the record");
    assert_eq!(budget.name, "Operations");

    draft.id = Some(budget.id);
    editor.set_percent(1, 8.37);
    editor.set_percent(12, 8.33);
    let updated = service.save(&editor, &draft);

    assert_eq!(updated.notification.kind, NotificationKind::Success);
    let updated_budget = updated.budget.expect("update should surface the record");
    assert_eq!(updated_budget.id, budget.id);
    let rows = updated_budget.distributions.expect("detail shape has rows");
    assert_eq!(rows[0].percent, 8.37);
    assert_eq!(rows[11].percent, 8.33);
}

#[test]
fn save_reports_validation_rejections_with_structured_payload() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteBudgetRepository::try_new(&mut conn).unwrap();
    let mut service = BudgetService::new(repo);

    let editor = DistributionEditor::with_default_rows();
    let draft = BudgetDraft::new("   ", 2026, "cc-100");

    let outcome = service.save(&editor, &draft);

    assert_eq!(outcome.notification.kind, NotificationKind::Error);
    assert!(outcome.budget.is_none());
    assert!(outcome.notification.message.contains("\"code\":\"blank_name\""));
}

#[test]
fn save_reports_year_conflicts_as_errors() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteBudgetRepository::try_new(&mut conn).unwrap();
    let mut service = BudgetService::new(repo);

    let editor = DistributionEditor::with_default_rows();
    let first = service.save(&editor, &BudgetDraft::new("First", 2026, "cc-100"));
    assert_eq!(first.notification.kind, NotificationKind::Success);

    let second = service.save(&editor, &BudgetDraft::new("Second", 2026, "cc-100"));
    assert_eq!(second.notification.kind, NotificationKind::Error);
    assert!(second.notification.message.contains("already exists"));
}

#[test]
fn copy_last_year_replaces_rows_wholesale_and_resets_locks() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBudgetRepository::try_new(&mut conn).unwrap();
    repo.create_budget(&BudgetPayload {
        name: "Ops 2025".to_string(),
        year: 2025,
        cost_center: "cc-100".to_string(),
        distributions: prior_year_rows(),
    })
    .unwrap();
    let service = BudgetService::new(repo);

    let mut editor = DistributionEditor::with_default_rows();
    editor.toggle_lock(2);
    editor.toggle_lock(5);
    editor.set_percent(2, 50.0);

    let notification = service.copy_last_year(&mut editor, "cc-100", 2026);

    assert_eq!(notification.kind, NotificationKind::Success);
    assert_eq!(editor.rows(), prior_year_rows().as_slice());
    assert!((1..=12).all(|month| !editor.is_locked(month)));
}

#[test]
fn copy_last_year_without_a_sibling_reports_info_and_keeps_state() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteBudgetRepository::try_new(&mut conn).unwrap();
    let service = BudgetService::new(repo);

    let mut editor = DistributionEditor::with_default_rows();
    editor.toggle_lock(7);
    let before = editor.clone();

    let notification = service.copy_last_year(&mut editor, "cc-100", 2026);

    assert_eq!(notification.kind, NotificationKind::Info);
    assert!(notification.message.contains("2025"));
    assert_eq!(editor, before);
}

#[test]
fn copy_last_year_with_empty_prior_rows_reports_info_and_keeps_state() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBudgetRepository::try_new(&mut conn).unwrap();
    repo.create_budget(&BudgetPayload {
        name: "Hollow 2025".to_string(),
        year: 2025,
        cost_center: "cc-100".to_string(),
        distributions: Vec::new(),
    })
    .unwrap();
    let service = BudgetService::new(repo);

    let mut editor = DistributionEditor::with_default_rows();
    let before = editor.clone();

    let notification = service.copy_last_year(&mut editor, "cc-100", 2026);

    assert_eq!(notification.kind, NotificationKind::Info);
    assert!(notification.message.contains("no distributions"));
    assert_eq!(editor, before);
}

#[test]
fn end_to_end_edit_normalize_save_flow() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteBudgetRepository::try_new(&mut conn).unwrap();
    let mut service = BudgetService::new(repo);

    // Fresh editor: even split, just short of the target.
    let mut editor = DistributionEditor::with_default_rows();
    assert_eq!(editor.total_display(), "99.96");
    assert!(!editor.is_valid());

    // Bump one month far past the target.
    editor.set_percent(1, 20.0);
    assert_eq!(editor.total_display(), "111.63");
    assert!(!editor.is_valid());

    // Normalize pulls the last unlocked month down to balance.
    editor.normalize();
    assert_eq!(percent_of(&editor, 12), -3.3);
    assert_eq!(editor.total_display(), "100.00");
    assert!(editor.is_valid());

    // Save persists a set that still sums to exactly 100.00.
    let outcome = service.save(&editor, &BudgetDraft::new("Operations", 2026, "cc-100"));
    assert_eq!(outcome.notification.kind, NotificationKind::Success);
    let persisted = outcome
        .budget
        .and_then(|budget| budget.distributions)
        .expect("persisted budget should carry rows");
    let total: f64 = persisted.iter().map(|row| row.percent).sum();
    assert_eq!(format!("{total:.2}"), "100.00");
}

#[test]
fn service_lists_budgets_for_selection_flows() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteBudgetRepository::try_new(&mut conn).unwrap();
    let mut service = BudgetService::new(repo);

    let editor = DistributionEditor::with_default_rows();
    service.save(&editor, &BudgetDraft::new("Ops 2025", 2025, "cc-100"));
    service.save(&editor, &BudgetDraft::new("Ops 2026", 2026, "cc-100"));

    let query = BudgetListQuery {
        cost_center: Some("cc-100".to_string()),
        ..BudgetListQuery::default()
    };
    let listed = service.list_budgets(&query).unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].year, 2026);
    assert_eq!(listed[1].year, 2025);

    let fetched = service.get_budget(listed[1].id).unwrap().unwrap();
    assert_eq!(fetched.name, "Ops 2025");
}

/// Repository double that fails every operation, for exercising the
/// error-notification paths the SQLite implementation cannot produce.
struct FailingRepository;

impl BudgetRepository for FailingRepository {
    fn list_budgets(&self, _query: &BudgetListQuery) -> RepoResult<Vec<Budget>> {
        Err(RepoError::InvalidData("simulated transport failure".to_string()))
    }

    fn get_budget(&self, _id: BudgetId) -> RepoResult<Option<Budget>> {
        Err(RepoError::InvalidData("simulated transport failure".to_string()))
    }

    fn create_budget(&mut self, _payload: &BudgetPayload) -> RepoResult<BudgetId> {
        Err(RepoError::InvalidData("simulated transport failure".to_string()))
    }

    fn update_budget(&mut self, _id: BudgetId, _payload: &BudgetPayload) -> RepoResult<()> {
        Err(RepoError::InvalidData("simulated transport failure".to_string()))
    }
}

#[test]
fn copy_last_year_fetch_failure_reports_error_and_keeps_state() {
    let service = BudgetService::new(FailingRepository);

    let mut editor = DistributionEditor::with_default_rows();
    let before = editor.clone();

    let notification = service.copy_last_year(&mut editor, "cc-100", 2026);

    assert_eq!(notification.kind, NotificationKind::Error);
    assert!(notification.message.contains("simulated transport failure"));
    assert_eq!(editor, before);
}

#[test]
fn save_transport_failure_reports_error_without_a_record() {
    let mut service = BudgetService::new(FailingRepository);

    let editor = DistributionEditor::with_default_rows();
    let outcome = service.save(&editor, &BudgetDraft::new("Operations", 2026, "cc-100"));

    assert_eq!(outcome.notification.kind, NotificationKind::Error);
    assert!(outcome.notification.message.contains("simulated transport failure"));
    assert!(outcome.budget.is_none());
}

/// Repository double whose list shape already carries distribution rows,
/// verifying the detail fetch is skipped when the light shape is complete.
struct PreloadedListRepository {
    budget: Budget,
}

impl BudgetRepository for PreloadedListRepository {
    fn list_budgets(&self, _query: &BudgetListQuery) -> RepoResult<Vec<Budget>> {
        Ok(vec![self.budget.clone()])
    }

    fn get_budget(&self, _id: BudgetId) -> RepoResult<Option<Budget>> {
        Err(RepoError::InvalidData(
            "detail fetch should not run when the list carries rows".to_string(),
        ))
    }

    fn create_budget(&mut self, _payload: &BudgetPayload) -> RepoResult<BudgetId> {
        unimplemented!("not used by copy-last-year")
    }

    fn update_budget(&mut self, _id: BudgetId, _payload: &BudgetPayload) -> RepoResult<()> {
        unimplemented!("not used by copy-last-year")
    }
}

#[test]
fn copy_last_year_skips_detail_fetch_when_list_carries_rows() {
    let service = BudgetService::new(PreloadedListRepository {
        budget: Budget {
            id: Uuid::new_v4(),
            name: "Ops 2025".to_string(),
            year: 2025,
            cost_center: "cc-100".to_string(),
            distributions: Some(prior_year_rows()),
            updated_at: 1_700_000_000_000,
        },
    });

    let mut editor = DistributionEditor::new();
    let notification = service.copy_last_year(&mut editor, "cc-100", 2026);

    assert_eq!(notification.kind, NotificationKind::Success);
    assert_eq!(editor.rows(), prior_year_rows().as_slice());
}
