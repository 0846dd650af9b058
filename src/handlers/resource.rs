use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use super::{
    body_row, caller_scope, ensure_row_in_scope, ensure_writable, find_visible, resolve, stamp_timestamps, strip_fields,
    SERVER_OWNED,
};
use crate::error::ApiError;
use crate::list::{build_list_filter, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::provider::Row;
use crate::resources::RowScope;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub rows: Vec<Row>,
    pub total: i64,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    pub resource: String,
    pub raw: bool,
}

#[derive(Debug, Serialize)]
pub struct RowBody {
    pub row: Row,
}

/// GET /api/:resource
pub async fn list(
    Path(resource): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<ListResult> {
    let resolved = resolve(&state, &resource)?;
    let quick_ids: Vec<&str> = resolved.config.quick_filters.iter().map(|q| q.id).collect();
    let mut query = ListQuery::from_pairs(&pairs, &quick_ids, state.config.list.default_page_size);
    query.page_size = query.page_size.min(state.config.list.max_page_size);

    if query.raw && !resolved.allow_raw {
        return Err(ApiError::bad_request(format!("Raw mode is not allowed for resource {}", resolved.key)));
    }

    let scope = caller_scope(&state, &session, &resolved).await?;
    let filter = build_list_filter(&resolved, &query, scope);
    let page = state
        .provider()
        .select(resolved.table(), filter, true)
        .await
        .map_err(|e| ApiError::from_data(e, &resolved.key))?;

    tracing::debug!(resource = %resolved.key, rows = page.rows.len(), total = page.total, "list");
    let rows = page.rows.into_iter().map(|r| resolved.present(r, query.raw)).collect();
    Ok(ApiResponse::success(ListResult {
        rows,
        total: page.total,
        page: query.page,
        page_size: query.page_size,
        resource: resolved.key,
        raw: query.raw,
    }))
}

/// POST /api/:resource
///
/// Server owned columns are dropped from the body; `user_id` comes from the
/// session when the resource has one.
pub async fn create(
    Path(resource): Path<String>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<RowBody> {
    let resolved = resolve(&state, &resource)?;
    ensure_writable(&resolved)?;
    let mut row = body_row(body)?;
    strip_fields(&mut row, SERVER_OWNED);
    if let Some(user) = session.user() {
        if resolved.config.selects("user_id") {
            row.insert("user_id".into(), json!(user.user_id.to_string()));
        }
    }
    ensure_row_in_scope(&state, &session, &resolved, &row).await?;
    let row = insert_resource_row(&state, &resolved, row).await?;
    Ok(ApiResponse::created(RowBody { row }))
}

/// `from_input`, timestamps, insert, `to_domain`. Shared with the form endpoints.
pub(crate) async fn insert_resource_row(
    state: &AppState,
    resolved: &crate::resources::ResolvedResource,
    row: Row,
) -> Result<Row, ApiError> {
    let mut row = match resolved.config.from_input {
        Some(transform) => transform(row).map_err(ApiError::bad_request)?,
        None => row,
    };
    stamp_timestamps(resolved, &mut row, true);

    let inserted = state
        .provider()
        .insert(resolved.table(), row)
        .await
        .map_err(|e| ApiError::from_data(e, &resolved.key))?;
    Ok(match resolved.config.to_domain {
        Some(to_domain) => to_domain(inserted),
        None => inserted,
    })
}

/// GET /api/:resource/:id
pub async fn get_one(
    Path((resource, id)): Path<(String, String)>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<RowBody> {
    let resolved = resolve(&state, &resource)?;
    let scope = caller_scope(&state, &session, &resolved).await?;
    let row = find_visible(&state, &resolved, &id, scope)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", resolved.key, id)))?;
    Ok(ApiResponse::success(RowBody { row: resolved.present(row, false) }))
}

/// PATCH /api/:resource/:id
pub async fn patch_one(
    Path((resource, id)): Path<(String, String)>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<RowBody> {
    let resolved = resolve(&state, &resource)?;
    ensure_writable(&resolved)?;
    let mut patch = body_row(body)?;
    strip_fields(&mut patch, &["id", "user_id", "created_at", resolved.config.pk]);

    let not_found = || ApiError::not_found(format!("{} {} not found", resolved.key, id));
    let scope = caller_scope(&state, &session, &resolved).await?;
    if scope.is_some() && find_visible(&state, &resolved, &id, scope).await?.is_none() {
        return Err(not_found());
    }
    if let Some(RowScope::Warehouse(column)) = resolved.config.scope {
        if patch.contains_key(column) {
            ensure_row_in_scope(&state, &session, &resolved, &patch).await?;
        }
    }

    stamp_timestamps(&resolved, &mut patch, false);
    let updated = state
        .provider()
        .update(resolved.table(), resolved.config.pk, &json!(id), patch)
        .await
        .map_err(|e| ApiError::from_data(e, &resolved.key))?
        .ok_or_else(not_found)?;
    let row = match resolved.config.to_domain {
        Some(to_domain) => to_domain(updated),
        None => updated,
    };
    Ok(ApiResponse::success(RowBody { row }))
}
