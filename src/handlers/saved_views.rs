use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::provider::{DataError, Row};
use crate::state::AppState;

pub const SAVED_VIEWS_TABLE: &str = "saved_views";
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SavedViewsQuery {
    pub scope_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SavedViewInput {
    pub scope_key: Option<String>,
    pub name: Option<String>,
    pub state: Option<Value>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SavedViewList {
    pub views: Vec<Row>,
}

#[derive(Debug, Serialize)]
pub struct SavedViewBody {
    pub row: Row,
}

fn data_err(e: DataError) -> ApiError {
    ApiError::from_data(e, SAVED_VIEWS_TABLE)
}

fn valid_name(name: Option<&str>) -> Result<String, ApiError> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!("name must be 1 to {} characters", MAX_NAME_LEN)));
    }
    Ok(name.to_string())
}

async fn owned_views(state: &AppState, user: &AuthUser, conditions: Vec<Value>) -> Result<Vec<Row>, ApiError> {
    let mut all = vec![json!({ "user_id": user.user_id.to_string() })];
    all.extend(conditions);
    let filter = FilterData {
        where_clause: Some(json!({ "$and": all })),
        order: Some(json!(["created_at desc", "id asc"])),
        ..Default::default()
    };
    Ok(state.provider().select(SAVED_VIEWS_TABLE, filter, false).await.map_err(data_err)?.rows)
}

async fn owned_view(state: &AppState, user: &AuthUser, id: &str) -> Result<Row, ApiError> {
    owned_views(state, user, vec![json!({ "id": id })])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("Saved view {} not found", id)))
}

/// Only one default view per user and scope.
async fn clear_defaults(state: &AppState, user: &AuthUser, scope_key: &Value, keep: Option<&Value>) -> Result<(), ApiError> {
    let current = owned_views(state, user, vec![json!({ "scope_key": scope_key }), json!({ "is_default": true })]).await?;
    for view in current {
        let Some(id) = view.get("id") else { continue };
        if Some(id) == keep {
            continue;
        }
        let patch = json!({ "is_default": false, "updated_at": Utc::now().to_rfc3339() });
        state
            .provider()
            .update(SAVED_VIEWS_TABLE, "id", id, patch.as_object().cloned().unwrap_or_default())
            .await
            .map_err(data_err)?;
    }
    Ok(())
}

/// GET /api/saved-views
pub async fn list(
    Query(query): Query<SavedViewsQuery>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<SavedViewList> {
    let user = session.require()?;
    let conditions = match query.scope_key.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(scope_key) => vec![json!({ "scope_key": scope_key })],
        None => vec![],
    };
    let views = owned_views(&state, user, conditions).await?;
    Ok(ApiResponse::success(SavedViewList { views }))
}

/// POST /api/saved-views
pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<SavedViewInput>, JsonRejection>,
) -> ApiResult<SavedViewBody> {
    let user = session.require()?;
    let Json(input) = body?;
    let scope_key = input
        .scope_key
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("scope_key is required"))?
        .to_string();
    let name = valid_name(input.name.as_deref())?;
    let is_default = input.is_default.unwrap_or(false);

    if is_default {
        clear_defaults(&state, user, &json!(scope_key), None).await?;
    }

    let now = Utc::now().to_rfc3339();
    let row = json!({
        "user_id": user.user_id.to_string(),
        "scope_key": scope_key,
        "name": name,
        "state": input.state.unwrap_or_else(|| json!({})),
        "is_default": is_default,
        "created_at": now,
        "updated_at": now,
    });
    let row = state
        .provider()
        .insert(SAVED_VIEWS_TABLE, row.as_object().cloned().unwrap_or_default())
        .await
        .map_err(data_err)?;
    Ok(ApiResponse::created(SavedViewBody { row }))
}

/// PATCH /api/saved-views/:id
pub async fn update(
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<SavedViewInput>, JsonRejection>,
) -> ApiResult<SavedViewBody> {
    let user = session.require()?;
    let Json(input) = body?;
    let existing = owned_view(&state, user, &id).await?;

    let mut patch = Row::new();
    if input.name.is_some() {
        patch.insert("name".into(), json!(valid_name(input.name.as_deref())?));
    }
    if let Some(view_state) = input.state {
        patch.insert("state".into(), view_state);
    }
    if let Some(is_default) = input.is_default {
        if is_default {
            let scope_key = existing.get("scope_key").cloned().unwrap_or(Value::Null);
            clear_defaults(&state, user, &scope_key, existing.get("id")).await?;
        }
        patch.insert("is_default".into(), json!(is_default));
    }
    patch.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));

    let key = existing.get("id").cloned().unwrap_or_else(|| json!(id));
    let row = state
        .provider()
        .update(SAVED_VIEWS_TABLE, "id", &key, patch)
        .await
        .map_err(data_err)?
        .ok_or_else(|| ApiError::not_found(format!("Saved view {} not found", id)))?;
    Ok(ApiResponse::success(SavedViewBody { row }))
}

/// DELETE /api/saved-views/:id
pub async fn delete(
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Value> {
    let user = session.require()?;
    let existing = owned_view(&state, user, &id).await?;
    let key = existing.get("id").cloned().unwrap_or_else(|| json!(id));
    state
        .provider()
        .delete(SAVED_VIEWS_TABLE, "id", &[key])
        .await
        .map_err(data_err)?;
    Ok(ApiResponse::success(json!({ "deleted": true })))
}
