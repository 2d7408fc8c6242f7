// handlers/elevated/logs.rs - audit and error log readers

use axum::extract::{rejection::QueryRejection, Query, State};
use serde::Deserialize;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::{AuditEntry, ErrorLogEntry};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

impl LogQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// GET /admin/audit-logs?limit=N - most recent audit entries first
pub async fn audit_logs_get(
    State(state): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> ApiResult<Vec<AuditEntry>> {
    let Query(query) = query?;
    let entries = state
        .traced("list_audit", state.store.list_audit(query.limit()))
        .await?;
    Ok(ApiResponse::success(entries))
}

/// GET /admin/error-logs?limit=N - most recent traced errors first
pub async fn error_logs_get(
    State(state): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> ApiResult<Vec<ErrorLogEntry>> {
    let Query(query) = query?;
    let entries = state
        .traced("list_errors", state.store.list_errors(query.limit()))
        .await?;
    Ok(ApiResponse::success(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        assert_eq!(LogQuery { limit: None }.limit(), 100);
        assert_eq!(LogQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(LogQuery { limit: Some(10_000) }.limit(), 500);
    }
}
