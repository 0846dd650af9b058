use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{caller_scope, ensure_writable, resolve};
use crate::error::ApiError;
use crate::filter::filter_match::text_of;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::state::AppState;

pub const MAX_BULK_IDS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResult {
    pub deleted: u64,
    pub resource: String,
}

/// DELETE /api/:resource/bulk
pub async fn delete_bulk(
    Path(resource): Path<String>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> ApiResult<BulkDeleteResult> {
    let resolved = resolve(&state, &resource)?;
    ensure_writable(&resolved)?;
    let Json(request) = body?;

    let mut ids: Vec<Value> = request.ids.into_iter().filter(|v| !v.is_null()).collect();
    if ids.is_empty() {
        return Err(ApiError::bad_request("ids must be a non-empty array"));
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(ApiError::bad_request(format!("At most {} ids can be deleted at once", MAX_BULK_IDS)));
    }

    let pk = resolved.config.pk;
    if let Some(scope) = caller_scope(&state, &session, &resolved).await? {
        let wanted: Vec<String> = ids.iter().map(text_of).collect();
        let filter = FilterData {
            select: Some(vec![pk.to_string()]),
            where_clause: Some(json!({ "$and": [{ pk: { "$in": wanted } }, scope] })),
            ..Default::default()
        };
        let visible = state
            .provider()
            .select(resolved.table(), filter, false)
            .await
            .map_err(|e| ApiError::from_data(e, &resolved.key))?;
        ids = visible.rows.into_iter().filter_map(|mut r| r.remove(pk)).collect();
        if ids.is_empty() {
            return Ok(ApiResponse::success(BulkDeleteResult { deleted: 0, resource: resolved.key }));
        }
    }

    let deleted = state
        .provider()
        .delete(resolved.table(), pk, &ids)
        .await
        .map_err(|e| ApiError::from_data(e, &resolved.key))?;
    tracing::info!(resource = %resolved.key, requested = ids.len(), deleted, "bulk delete");
    Ok(ApiResponse::success(BulkDeleteResult { deleted, resource: resolved.key }))
}
