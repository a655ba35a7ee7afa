//! SQLite-backed task store
//!
//! One statement per operation, each executed inside its own `db.*` span
//! carrying the operation name, the raw statement and, when enabled, the
//! statement with its values inlined. With the sql commenter on, the
//! executed text also carries the span's `traceparent` as a trailing
//! comment so database-side logs can be joined to the trace.

use std::{borrow::Cow, fmt, future::Future};

use application::{error::ApplicationError, ports::TaskStorePort};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Task, TaskId, TaskTitle};
use opentelemetry::metrics::ObservableUpDownCounter;
use sqlx::SqlitePool;
use tracing::{Instrument, Span, debug, error, field::Empty, info_span};

use super::{
    connection::AsyncDatabase,
    error::map_sqlx_error,
    pool_metrics::register_pool_usage,
    statement_format::{SqlValue, format_statement},
};
use crate::telemetry::{Telemetry, propagation};

const SELECT_ALL_TASKS: &str =
    "SELECT id, title, completed, created_at FROM tasks ORDER BY created_at DESC, id DESC";
const INSERT_TASK: &str =
    "INSERT INTO tasks (title) VALUES (?1) RETURNING id, title, completed, created_at";
const DELETE_TASK: &str = "DELETE FROM tasks WHERE id = ?1";
const UPDATE_TASK: &str =
    "UPDATE tasks SET completed = 1 WHERE id = ?1 RETURNING id, title, completed, created_at";

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    completed: bool,
    created_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = ApplicationError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| {
                ApplicationError::Internal(format!(
                    "Invalid created_at '{}' for task {}: {e}",
                    row.created_at, row.id
                ))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: TaskId::new(row.id),
            title: TaskTitle::new(row.title).map_err(|e| {
                ApplicationError::Internal(format!("Invalid stored title for task {}: {e}", row.id))
            })?,
            completed: row.completed,
            created_at,
        })
    }
}

/// Append the sqlcommenter trace comment to `statement`
fn with_trace_comment<'a>(statement: &'a str, traceparent: Option<&str>) -> Cow<'a, str> {
    match traceparent {
        Some(tp) => Cow::Owned(format!("{statement} /*traceparent='{tp}'*/")),
        None => Cow::Borrowed(statement),
    }
}

fn not_found(id: TaskId) -> ApplicationError {
    ApplicationError::NotFound(format!("Task {id}"))
}

/// Task store on a SQLite pool
pub struct SqliteTaskStore {
    pool: SqlitePool,
    format_statements: bool,
    sql_commenter: bool,
    _pool_usage: Option<ObservableUpDownCounter<i64>>,
}

impl fmt::Debug for SqliteTaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteTaskStore")
            .field("format_statements", &self.format_statements)
            .field("sql_commenter", &self.sql_commenter)
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

impl SqliteTaskStore {
    /// Create a store on `db`, registering the pool usage gauge if `telemetry` has a meter
    pub fn new(db: &AsyncDatabase, telemetry: &Telemetry) -> Self {
        let pool = db.pool().clone();
        let pool_usage = telemetry
            .meter()
            .map(|meter| register_pool_usage(meter, pool.clone()));

        Self {
            pool,
            format_statements: true,
            sql_commenter: false,
            _pool_usage: pool_usage,
        }
    }

    /// Toggle `db.statement.formatted` on query spans
    #[must_use]
    pub const fn with_statement_formatting(mut self, enabled: bool) -> Self {
        self.format_statements = enabled;
        self
    }

    /// Toggle the trailing `traceparent` comment on executed statements
    #[must_use]
    pub const fn with_sql_commenter(mut self, enabled: bool) -> Self {
        self.sql_commenter = enabled;
        self
    }

    /// Record the formatted statement on `span` and return the text to execute
    fn prepare(
        &self,
        span: &Span,
        statement: &'static str,
        values: &[SqlValue],
    ) -> Cow<'static, str> {
        if self.format_statements {
            span.record(
                "db.statement.formatted",
                format_statement(statement, values).as_str(),
            );
        }
        if self.sql_commenter {
            let traceparent = propagation::traceparent(span);
            with_trace_comment(statement, traceparent.as_deref())
        } else {
            Cow::Borrowed(statement)
        }
    }
}

/// Run `query` inside `span`, marking the span failed on error
async fn traced<T, F>(span: Span, query: F) -> Result<T, ApplicationError>
where
    F: Future<Output = Result<T, ApplicationError>>,
{
    let result = query.instrument(span.clone()).await;
    if let Err(e) = &result {
        span.record("otel.status_code", "ERROR");
        error!(parent: &span, error = %e, "Database operation failed");
    }
    result
}

#[async_trait]
impl TaskStorePort for SqliteTaskStore {
    async fn list(&self) -> Result<Vec<Task>, ApplicationError> {
        let span = info_span!(
            "db.list_tasks",
            otel.kind = "client",
            db.system = "sqlite",
            db.operation = "select_all_tasks",
            db.statement = SELECT_ALL_TASKS,
            db.statement.formatted = Empty,
            otel.status_code = Empty,
        );
        let sql = self.prepare(&span, SELECT_ALL_TASKS, &[]);

        traced(span, async {
            let rows: Vec<TaskRow> = sqlx::query_as(sql.as_ref())
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            debug!(count = rows.len(), "Fetched tasks");
            rows.into_iter().map(Task::try_from).collect()
        })
        .await
    }

    async fn create(&self, title: &TaskTitle) -> Result<Task, ApplicationError> {
        let span = info_span!(
            "db.create_task",
            otel.kind = "client",
            db.system = "sqlite",
            db.operation = "insert_task",
            db.statement = INSERT_TASK,
            db.statement.formatted = Empty,
            task.title = %title,
            otel.status_code = Empty,
        );
        let sql = self.prepare(&span, INSERT_TASK, &[title.as_str().into()]);

        traced(span, async {
            let row: TaskRow = sqlx::query_as(sql.as_ref())
                .bind(title.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            let task = Task::try_from(row)?;
            debug!(task.id = %task.id, "Inserted task");
            Ok(task)
        })
        .await
    }

    async fn delete(&self, id: TaskId) -> Result<(), ApplicationError> {
        let span = info_span!(
            "db.delete_task",
            otel.kind = "client",
            db.system = "sqlite",
            db.operation = "delete_task",
            db.statement = DELETE_TASK,
            db.statement.formatted = Empty,
            task.id = id.as_i64(),
            otel.status_code = Empty,
        );
        let sql = self.prepare(&span, DELETE_TASK, &[id.as_i64().into()]);

        traced(span, async {
            let result = sqlx::query(sql.as_ref())
                .bind(id.as_i64())
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            if result.rows_affected() == 0 {
                return Err(not_found(id));
            }
            Ok(())
        })
        .await
    }

    async fn complete(&self, id: TaskId) -> Result<Task, ApplicationError> {
        let span = info_span!(
            "db.complete_task",
            otel.kind = "client",
            db.system = "sqlite",
            db.operation = "update_task",
            db.statement = UPDATE_TASK,
            db.statement.formatted = Empty,
            task.id = id.as_i64(),
            otel.status_code = Empty,
        );
        let sql = self.prepare(&span, UPDATE_TASK, &[id.as_i64().into()]);

        traced(span, async {
            let row: Option<TaskRow> = sqlx::query_as(sql.as_ref())
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            row.ok_or_else(|| not_found(id)).and_then(Task::try_from)
        })
        .await
    }
}
