use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::Json;
use serde_json::Value;

use super::resource::RowBody;
use super::{body_row, caller_scope, ensure_row_in_scope, find_visible, resolve, strip_fields, SERVER_OWNED};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::provider::{RpcArg, RpcReturns};
use crate::state::AppState;

/// POST /api/tally-cards/:id/actions/patch-scd2
///
/// Versioning happens inside the database function: the current row is
/// closed and a new version carrying the patch is returned.
pub async fn patch_scd2(
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<RowBody> {
    let cards = resolve(&state, "tally_cards")?;
    let mut patch = body_row(body)?;
    strip_fields(&mut patch, SERVER_OWNED);
    if patch.is_empty() {
        return Err(ApiError::bad_request("Patch must contain at least one field"));
    }

    let scope = caller_scope(&state, &session, &cards).await?;
    if scope.is_some() && find_visible(&state, &cards, &id, scope).await?.is_none() {
        return Err(ApiError::not_found(format!("Tally card {} not found", id)));
    }
    if patch.contains_key("warehouse_id") {
        ensure_row_in_scope(&state, &session, &cards, &patch).await?;
    }

    let function = state.config.features.scd2_patch_function();
    let result = state
        .provider()
        .rpc(
            function,
            vec![
                RpcArg::new("_id", id.clone()).cast("uuid"),
                RpcArg::new("_patch", Value::Object(patch)).cast("jsonb"),
            ],
            RpcReturns::Scalar,
        )
        .await
        .map_err(|e| ApiError::from_data(e, &cards.key))?;

    let row = match result {
        Value::Object(row) => row,
        Value::Array(mut rows) if !rows.is_empty() => match rows.swap_remove(0) {
            Value::Object(row) => row,
            _ => return Err(ApiError::internal_server_error(format!("{} returned a non-object row", function))),
        },
        Value::Null | Value::Array(_) => return Err(ApiError::not_found(format!("Tally card {} not found", id))),
        other => {
            tracing::error!(function, result = %other, "unexpected SCD2 result");
            return Err(ApiError::internal_server_error(format!("{} returned an unexpected value", function)));
        }
    };
    tracing::info!(function, id = %id, "tally card patched");

    let row = match cards.config.to_domain {
        Some(to_domain) => to_domain(row),
        None => row,
    };
    Ok(ApiResponse::success(RowBody { row }))
}
