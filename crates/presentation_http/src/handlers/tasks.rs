//! Task handlers
//!
//! Each handler maps one verb/path onto one service call inside its own
//! span tagged with the operation name.

use application::ApplicationError;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use domain::{Task, TaskId, TaskTitle};
use serde::{Deserialize, Serialize};
use tracing::{Span, error, field, info, instrument, warn};
use validator::Validate;

use crate::{error::ApiError, middleware::ValidatedJson, state::AppState};

/// Body of `POST /tasks`
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
}

/// Record a failed operation on the handler span and convert it
fn fail(err: ApplicationError) -> ApiError {
    if err.is_not_found() {
        warn!(error = %err, "Task not found");
    } else {
        Span::current().record("otel.status_code", "ERROR");
        error!(error = %err, "Task operation failed");
    }
    err.into()
}

fn parse_id(raw: &str) -> Result<TaskId, ApiError> {
    TaskId::parse(raw).map_err(|e| {
        warn!(error = %e, "Rejected task id");
        ApiError::from(e)
    })
}

/// `GET /tasks`
#[instrument(
    name = "handler.get_all_tasks",
    skip_all,
    fields(operation = "get_all_tasks", task.count = field::Empty, otel.status_code = field::Empty)
)]
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    info!("Listing tasks");
    let tasks = state.task_service.list_tasks().await.map_err(fail)?;
    Span::current().record("task.count", tasks.len());
    Ok(Json(tasks))
}

/// `POST /tasks`
#[instrument(
    name = "handler.create_task",
    skip_all,
    fields(
        operation = "create_task",
        task.title = %request.title,
        task.id = field::Empty,
        otel.status_code = field::Empty,
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let title = TaskTitle::new(request.title).map_err(|e| {
        warn!(error = %e, "Rejected task title");
        ApiError::from(e)
    })?;

    let task = state.task_service.create_task(title).await.map_err(fail)?;
    Span::current().record("task.id", task.id.as_i64());
    info!(task.id = %task.id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

/// `DELETE /tasks/{id}`
#[instrument(
    name = "handler.delete_task",
    skip_all,
    fields(operation = "delete_task", task.id = %id, otel.status_code = field::Empty)
)]
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.task_service.delete_task(id).await.map_err(fail)?;
    info!("Task deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /tasks/{id}/complete`
#[instrument(
    name = "handler.complete_task",
    skip_all,
    fields(operation = "complete_task", task.id = %id, otel.status_code = field::Empty)
)]
pub async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    let task = state.task_service.complete_task(id).await.map_err(fail)?;
    info!("Task completed");
    Ok(Json(task))
}

/// `OPTIONS` on any task route
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Any other verb on a task route
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn empty_title_fails_validation() {
        let request = CreateTaskRequest {
            title: String::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn non_empty_title_passes_validation() {
        let request = CreateTaskRequest {
            title: "Buy milk".into(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn non_numeric_id_is_bad_request() {
        assert!(matches!(parse_id("abc"), Err(ApiError::BadRequest(_))));
        assert_eq!(parse_id("12").unwrap(), TaskId::new(12));
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let err = fail(ApplicationError::NotFound("Task 3".into()));
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn store_failure_maps_to_internal() {
        let err = fail(ApplicationError::Internal("pool closed".into()));
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[tokio::test]
    async fn preflight_is_ok() {
        assert_eq!(preflight().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn fallback_is_method_not_allowed() {
        let response = method_not_allowed().await.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
