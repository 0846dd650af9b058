pub mod admin;
pub mod bulk;
pub mod dashboard;
pub mod forms;
pub mod health;
pub mod me;
pub mod resource;
pub mod saved_views;
pub mod tally_cards;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::{scope_condition, UserScope};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::Session;
use crate::provider::Row;
use crate::filter::filter_match::text_of;
use crate::resources::{resolve_resource, ResolvedResource, RowScope};
use crate::state::AppState;

/// Columns a client may never set directly.
pub(crate) const SERVER_OWNED: &[&str] = &["id", "user_id", "created_at", "updated_at"];

pub(crate) fn resolve(state: &AppState, key: &str) -> Result<ResolvedResource, ApiError> {
    Ok(resolve_resource(&state.registry, key)?)
}

/// JSON body that must be an object.
pub(crate) fn body_row(body: Result<Json<Value>, JsonRejection>) -> Result<Row, ApiError> {
    let Json(value) = body?;
    match value {
        Value::Object(row) => Ok(row),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

pub(crate) fn strip_fields(row: &mut Row, fields: &[&str]) {
    for field in fields {
        row.remove(*field);
    }
}

/// Stamp `created_at` (on create) and `updated_at` when the resource selects them.
pub(crate) fn stamp_timestamps(resource: &ResolvedResource, row: &mut Row, creating: bool) {
    let now = json!(Utc::now().to_rfc3339());
    if creating && resource.config.selects("created_at") {
        row.insert("created_at".into(), now.clone());
    }
    if resource.config.selects("updated_at") {
        row.insert("updated_at".into(), now);
    }
}

pub(crate) fn ensure_writable(resource: &ResolvedResource) -> Result<(), ApiError> {
    if resource.config.writable {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("Resource {} is read-only", resource.key)))
    }
}

/// Row restriction for the caller when scoping is switched on. Requires a
/// session in that case; otherwise `None`.
pub(crate) async fn caller_scope(
    state: &AppState,
    session: &Session,
    resource: &ResolvedResource,
) -> Result<Option<Value>, ApiError> {
    if !state.config.auth.scoping_enabled {
        return Ok(None);
    }
    let user = session.require()?;
    if resource.config.scope.is_none() {
        return Ok(None);
    }
    let scope = UserScope::load(state.provider(), user)
        .await
        .map_err(|e| ApiError::from_data(e, &resource.key))?;
    Ok(scope_condition(resource.config.scope, &scope))
}

/// Scoping gate for a row about to be written. With scoping on a session is
/// required, and a warehouse scoped row must land in one of the caller's
/// warehouses unless the caller is an admin.
pub(crate) async fn ensure_row_in_scope(
    state: &AppState,
    session: &Session,
    resource: &ResolvedResource,
    row: &Row,
) -> Result<(), ApiError> {
    if !state.config.auth.scoping_enabled {
        return Ok(());
    }
    let user = session.require()?;
    let Some(RowScope::Warehouse(column)) = resource.config.scope else {
        return Ok(());
    };
    let scope = UserScope::load(state.provider(), user)
        .await
        .map_err(|e| ApiError::from_data(e, &resource.key))?;
    if scope.is_admin {
        return Ok(());
    }
    let warehouse_id = row.get(column).filter(|v| !v.is_null()).map(text_of).unwrap_or_default();
    if scope.warehouse_ids.contains(&warehouse_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!("No access to warehouse {}", warehouse_id)))
    }
}

/// The row with primary key `id`, if the caller may see it.
pub(crate) async fn find_visible(
    state: &AppState,
    resource: &ResolvedResource,
    id: &str,
    scope: Option<Value>,
) -> Result<Option<Row>, ApiError> {
    let config = &resource.config;
    let mut conditions = vec![json!({ config.pk: id })];
    conditions.extend(scope);
    let filter = FilterData {
        select: Some(config.select_columns()),
        where_clause: Some(json!({ "$and": conditions })),
        limit: Some(1),
        ..Default::default()
    };
    let page = state
        .provider()
        .select(config.table, filter, false)
        .await
        .map_err(|e| ApiError::from_data(e, &resource.key))?;
    Ok(page.rows.into_iter().next())
}
