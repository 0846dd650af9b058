use axum::extract::{Extension, Query};

use crate::dashboard::{get_inventory_rows, InventoryPage, InventoryQuery};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::state::AppState;

/// GET /api/dashboard-inventory
pub async fn inventory(
    Query(pairs): Query<Vec<(String, String)>>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<InventoryPage> {
    if state.config.auth.scoping_enabled {
        session.require()?;
    }
    let query = InventoryQuery::from_pairs(&pairs).map_err(ApiError::bad_request)?;
    let page = get_inventory_rows(state.provider(), &query)
        .await
        .map_err(|e| ApiError::from_data(e, "dashboard-inventory"))?;
    Ok(ApiResponse::success(page))
}
