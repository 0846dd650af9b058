use axum::extract::Extension;
use serde::Serialize;

use crate::auth::{load_permissions, UserScope};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Permissions {
    pub permissions: Vec<String>,
}

/// GET /api/me/role
pub async fn role(Extension(state): Extension<AppState>, Extension(session): Extension<Session>) -> ApiResult<UserScope> {
    let user = session.require()?;
    let scope = UserScope::load(state.provider(), user)
        .await
        .map_err(|e| ApiError::from_data(e, "users"))?;
    Ok(ApiResponse::success(scope))
}

/// GET /api/me/permissions
pub async fn permissions(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Permissions> {
    let user = session.require()?;
    let permissions = load_permissions(state.provider(), user)
        .await
        .map_err(|e| ApiError::from_data(e, "permissions"))?;
    Ok(ApiResponse::success(Permissions { permissions }))
}
