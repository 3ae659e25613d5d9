//! Budget repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable list/detail/create/update APIs over budget storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `BudgetPayload::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Detail reads always return `Some(distributions)`; list reads return
//!   `None` unless the query opts into the heavy shape.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::budget::{
    Budget, BudgetId, BudgetPayload, BudgetValidationError, DistributionRow, MONTH_MAX, MONTH_MIN,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const BUDGET_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    year,
    cost_center,
    updated_at
FROM budgets";

const REQUIRED_TABLES: &[&str] = &["budgets", "budget_distributions"];
const REQUIRED_BUDGET_COLUMNS: &[&str] = &["uuid", "name", "year", "cost_center", "updated_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for budget persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(BudgetValidationError),
    Db(DbError),
    NotFound(BudgetId),
    /// Another budget already occupies `(cost_center, year)`.
    Conflict { cost_center: String, year: i32 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing from the connected database.
    MissingRequiredTable(&'static str),
    /// Required column is missing from an expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "budget not found: {id}"),
            Self::Conflict { cost_center, year } => write!(
                f,
                "a budget for cost center `{cost_center}` in {year} already exists"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "budget repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "budget repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "budget repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted budget data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BudgetValidationError> for RepoError {
    fn from(value: BudgetValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing budgets.
///
/// The default shape is light: `distributions` stays `None` on every
/// returned record unless `include_distributions` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetListQuery {
    /// Optional exact cost-center filter.
    pub cost_center: Option<String>,
    /// Optional exact fiscal-year filter.
    pub year: Option<i32>,
    /// Whether to fetch distribution rows for every match.
    pub include_distributions: bool,
}

/// Repository interface for budget persistence operations.
pub trait BudgetRepository {
    /// Lists budgets matching the query, `year DESC, updated_at DESC,
    /// uuid ASC`.
    fn list_budgets(&self, query: &BudgetListQuery) -> RepoResult<Vec<Budget>>;
    /// Gets one budget by id, distribution rows included.
    fn get_budget(&self, id: BudgetId) -> RepoResult<Option<Budget>>;
    /// Creates one budget with its distribution rows, returning the new id.
    fn create_budget(&mut self, payload: &BudgetPayload) -> RepoResult<BudgetId>;
    /// Replaces one budget's metadata and distribution rows wholesale.
    fn update_budget(&mut self, id: BudgetId, payload: &BudgetPayload) -> RepoResult<()>;
}

/// SQLite-backed budget repository.
pub struct SqliteBudgetRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteBudgetRepository<'conn> {
    /// Constructs a repository from a migrated, ready connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version does not match
    ///   this binary's latest migration.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   lacks expected structure.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_budget_schema(conn)?;
        Ok(Self { conn })
    }
}

impl BudgetRepository for SqliteBudgetRepository<'_> {
    fn list_budgets(&self, query: &BudgetListQuery) -> RepoResult<Vec<Budget>> {
        let mut sql = format!("{BUDGET_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(cost_center) = query.cost_center.as_ref() {
            sql.push_str(" AND cost_center = ?");
            bind_values.push(Value::Text(cost_center.clone()));
        }

        if let Some(year) = query.year {
            sql.push_str(" AND year = ?");
            bind_values.push(Value::Integer(i64::from(year)));
        }

        sql.push_str(" ORDER BY year DESC, updated_at DESC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut budgets = Vec::new();

        while let Some(row) = rows.next()? {
            budgets.push(parse_budget_row(row)?);
        }

        if query.include_distributions {
            for budget in &mut budgets {
                budget.distributions = Some(load_distribution_rows(self.conn, budget.id)?);
            }
        }

        Ok(budgets)
    }

    fn get_budget(&self, id: BudgetId) -> RepoResult<Option<Budget>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BUDGET_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut budget = parse_budget_row(row)?;
            budget.distributions = Some(load_distribution_rows(self.conn, budget.id)?);
            return Ok(Some(budget));
        }

        Ok(None)
    }

    fn create_budget(&mut self, payload: &BudgetPayload) -> RepoResult<BudgetId> {
        payload.validate()?;

        let id = Uuid::new_v4();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO budgets (uuid, name, year, cost_center)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                payload.name.as_str(),
                payload.year,
                payload.cost_center.as_str(),
            ],
        )
        .map_err(|err| map_unique_violation(err, payload))?;

        replace_distribution_rows(&tx, id, &payload.distributions)?;
        tx.commit()?;

        Ok(id)
    }

    fn update_budget(&mut self, id: BudgetId, payload: &BudgetPayload) -> RepoResult<()> {
        payload.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx
            .execute(
                "UPDATE budgets
                 SET
                    name = ?2,
                    year = ?3,
                    cost_center = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![
                    id.to_string(),
                    payload.name.as_str(),
                    payload.year,
                    payload.cost_center.as_str(),
                ],
            )
            .map_err(|err| map_unique_violation(err, payload))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        replace_distribution_rows(&tx, id, &payload.distributions)?;
        tx.commit()?;

        Ok(())
    }
}

fn replace_distribution_rows(
    tx: &Transaction<'_>,
    id: BudgetId,
    rows: &[DistributionRow],
) -> RepoResult<()> {
    let id_text = id.to_string();
    tx.execute(
        "DELETE FROM budget_distributions WHERE budget_uuid = ?1;",
        [id_text.as_str()],
    )?;

    for row in rows {
        tx.execute(
            "INSERT INTO budget_distributions (budget_uuid, month, percent)
             VALUES (?1, ?2, ?3);",
            params![id_text.as_str(), row.month, row.percent],
        )?;
    }

    Ok(())
}

fn load_distribution_rows(conn: &Connection, id: BudgetId) -> RepoResult<Vec<DistributionRow>> {
    let mut stmt = conn.prepare(
        "SELECT month, percent
         FROM budget_distributions
         WHERE budget_uuid = ?1
         ORDER BY month ASC;",
    )?;

    let mut rows = stmt.query([id.to_string()])?;
    let mut distributions = Vec::new();

    while let Some(row) = rows.next()? {
        let month_raw: i64 = row.get("month")?;
        let month = month_from_db(month_raw)?;
        distributions.push(DistributionRow {
            month,
            percent: row.get("percent")?,
        });
    }

    Ok(distributions)
}

fn parse_budget_row(row: &Row<'_>) -> RepoResult<Budget> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in budgets.uuid"))
    })?;

    Ok(Budget {
        id,
        name: row.get("name")?,
        year: row.get("year")?,
        cost_center: row.get("cost_center")?,
        distributions: None,
        updated_at: row.get("updated_at")?,
    })
}

fn month_from_db(value: i64) -> RepoResult<u8> {
    u8::try_from(value)
        .ok()
        .filter(|month| (MONTH_MIN..=MONTH_MAX).contains(month))
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid month value `{value}` in budget_distributions.month"
            ))
        })
}

fn map_unique_violation(err: rusqlite::Error, payload: &BudgetPayload) -> RepoError {
    if let rusqlite::Error::SqliteFailure(info, _) = &err {
        if info.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return RepoError::Conflict {
                cost_center: payload.cost_center.clone(),
                year: payload.year,
            };
        }
    }
    err.into()
}

fn ensure_budget_schema(conn: &Connection) -> RepoResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for &column in REQUIRED_BUDGET_COLUMNS {
        if !column_exists(conn, "budgets", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "budgets",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM pragma_table_info(?1)
            WHERE name = ?2
        );",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
