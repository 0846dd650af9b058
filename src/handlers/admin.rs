use axum::extract::{Extension, Query};
use serde::Serialize;
use serde_json::{json, Value};

use super::resolve;
use super::resource::ListResult;
use crate::auth::UserScope;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::list::params::first_value;
use crate::list::{build_list_filter, ListQuery};
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::provider::{Row, RpcArg, RpcReturns};
use crate::resources::projection::user_row;
use crate::state::AppState;

pub const TABLE_REPORT_VIEW: &str = "mv_table_report_combined";

async fn require_admin(state: &AppState, session: &Session) -> Result<UserScope, ApiError> {
    let user = session.require()?;
    let scope = UserScope::load(state.provider(), user)
        .await
        .map_err(|e| ApiError::from_data(e, "users"))?;
    if !scope.is_admin {
        tracing::warn!(user_id = %scope.user_id, "non-admin denied admin endpoint");
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(scope)
}

/// GET /api/admin/users[?id=]
pub async fn users(
    Query(pairs): Query<Vec<(String, String)>>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Value> {
    require_admin(&state, &session).await?;

    if let Some(id) = first_value(&pairs, "id") {
        let result = state
            .provider()
            .rpc("admin_get_user", vec![RpcArg::new("_user_id", id).cast("uuid")], RpcReturns::Scalar)
            .await
            .map_err(|e| ApiError::from_data(e, "users"))?;
        return match result {
            Value::Object(row) => Ok(ApiResponse::success(json!({ "row": user_row(row) }))),
            _ => Err(ApiError::not_found(format!("User {} not found", id))),
        };
    }

    let resolved = resolve(&state, "users")?;
    let quick_ids: Vec<&str> = resolved.config.quick_filters.iter().map(|q| q.id).collect();
    let query = ListQuery::from_pairs(&pairs, &quick_ids, state.config.list.default_page_size);
    let page = state
        .provider()
        .select(resolved.table(), build_list_filter(&resolved, &query, None), true)
        .await
        .map_err(|e| ApiError::from_data(e, &resolved.key))?;

    let result = ListResult {
        rows: page.rows.into_iter().map(|r| resolved.present(r, false)).collect(),
        total: page.total,
        page: query.page,
        page_size: query.page_size,
        resource: resolved.key,
        raw: false,
    };
    Ok(ApiResponse::success(json!(result)))
}

#[derive(Debug, Serialize)]
pub struct TableDocsHealth {
    pub tables: Vec<Row>,
    pub total: usize,
    pub undocumented: usize,
}

/// GET /api/admin/table-docs-health
pub async fn table_docs_health(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<TableDocsHealth> {
    require_admin(&state, &session).await?;
    let filter = FilterData { order: Some(json!("table_name asc")), ..Default::default() };
    let tables = state
        .provider()
        .select(TABLE_REPORT_VIEW, filter, false)
        .await
        .map_err(|e| ApiError::from_data(e, TABLE_REPORT_VIEW))?
        .rows;
    let undocumented = tables.iter().filter(|t| t.get("has_docs") == Some(&Value::Bool(false))).count();
    Ok(ApiResponse::success(TableDocsHealth { total: tables.len(), undocumented, tables }))
}
