//! Handler for paths outside the task API

use crate::error::ApiError;

/// Unknown path when no static directory is configured
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
