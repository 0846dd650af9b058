use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::resource::{insert_resource_row, RowBody};
use super::{body_row, ensure_row_in_scope, ensure_writable, find_visible, resolve, strip_fields, SERVER_OWNED};
use crate::error::ApiError;
use crate::filter::filter_match::text_of;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::provider::{ChildInsert, Row};
use crate::resources::canonical_key;
use crate::state::AppState;
use crate::stock::{prepare_locations_for_submit, total_qty, AdjustmentLocations, LocationInput};

/// POST /api/forms/:key
///
/// `purchase-orders` submits into `purchase_orders`, and so on. The session
/// user replaces any client supplied `user_id`.
pub async fn submit(
    Path(key): Path<String>,
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<RowBody> {
    let resolved = resolve(&state, &canonical_key(&key))?;
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
    tracing::info!(form = %key, resource = %resolved.key, "form submitted");
    Ok(ApiResponse::created(RowBody { row }))
}

#[derive(Debug, Default, Deserialize)]
pub struct StockAdjustmentForm {
    pub tally_card_number: Option<String>,
    pub card_uid: Option<String>,
    pub qty: Option<Value>,
    pub location: Option<String>,
    pub note: Option<String>,
    pub reason_code: Option<String>,
    #[serde(default)]
    pub multi_location: bool,
    #[serde(default)]
    pub locations: Vec<LocationInput>,
}

#[derive(Debug, Serialize)]
pub struct StockAdjustmentCreated {
    pub row: Row,
    pub locations: Vec<Row>,
}

fn whole_number(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// POST /api/forms/stock-adjustments
pub async fn stock_adjustment(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<StockAdjustmentForm>, JsonRejection>,
) -> ApiResult<StockAdjustmentCreated> {
    let user = session.require()?;
    let Json(form) = body?;
    let entries = resolve(&state, "stock_adjustments")?;
    let entry_locations = resolve(&state, "stock_adjustment_locations")?;

    let tally_card_number = non_empty(form.tally_card_number)
        .ok_or_else(|| ApiError::bad_request("tally_card_number is required"))?
        .to_uppercase();
    let now = Utc::now().to_rfc3339();

    let mut parent = Row::new();
    parent.insert("user_id".into(), json!(user.user_id.to_string()));
    parent.insert("tally_card_number".into(), json!(tally_card_number));
    parent.insert("card_uid".into(), json!(non_empty(form.card_uid)));
    parent.insert("note".into(), json!(non_empty(form.note)));
    parent.insert("reason_code".into(), json!(non_empty(form.reason_code)));
    parent.insert("multi_location".into(), json!(form.multi_location));
    parent.insert("created_at".into(), json!(now));
    parent.insert("updated_at".into(), json!(now));

    let (row, locations) = if form.multi_location {
        let locations = prepare_locations_for_submit(&AdjustmentLocations {
            locations: form.locations,
            location: form.location,
            qty: form.qty,
        })?;
        parent.insert("qty".into(), json!(total_qty(&locations)?));
        parent.insert("location".into(), Value::Null);

        let children = locations
            .iter()
            .map(|l| {
                let mut child = Row::new();
                child.insert("location".into(), json!(l.location));
                child.insert("qty".into(), json!(l.qty));
                child.insert("pos".into(), json!(l.pos));
                child.insert("created_at".into(), json!(now));
                child
            })
            .collect();
        state
            .provider()
            .insert_with_children(
                entries.table(),
                parent,
                ChildInsert {
                    table: entry_locations.table().to_string(),
                    foreign_key: "entry_id".into(),
                    parent_pk: entries.config.pk.to_string(),
                    rows: children,
                },
            )
            .await
            .map_err(|e| ApiError::from_data(e, &entries.key))?
    } else {
        let qty = whole_number(form.qty.as_ref()).ok_or_else(|| ApiError::bad_request("qty must be a whole number"))?;
        parent.insert("qty".into(), json!(qty));
        parent.insert("location".into(), json!(non_empty(form.location)));
        let row = state
            .provider()
            .insert(entries.table(), parent)
            .await
            .map_err(|e| ApiError::from_data(e, &entries.key))?;
        (row, vec![])
    };

    let row = match entries.config.to_domain {
        Some(to_domain) => to_domain(row),
        None => row,
    };
    tracing::info!(
        entry = %row.get("id").map(text_of).unwrap_or_default(),
        locations = locations.len(),
        "stock adjustment recorded"
    );
    Ok(ApiResponse::created(StockAdjustmentCreated { row, locations }))
}

/// POST /api/forms/tally-cards
pub async fn tally_card(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<RowBody> {
    let cards = resolve(&state, "tally_cards")?;
    let mut row = body_row(body)?;
    strip_fields(&mut row, SERVER_OWNED);

    let warehouse_id = row
        .get("warehouse_id")
        .filter(|v| !v.is_null())
        .map(text_of)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("warehouse_id is required"))?;

    let warehouses = resolve(&state, "warehouses")?;
    if find_visible(&state, &warehouses, &warehouse_id, None).await?.is_none() {
        return Err(ApiError::bad_request(format!("Unknown warehouse_id: {}", warehouse_id)));
    }
    row.insert("warehouse_id".into(), json!(warehouse_id));
    ensure_row_in_scope(&state, &session, &cards, &row).await?;

    let row = insert_resource_row(&state, &cards, row).await?;
    Ok(ApiResponse::created(RowBody { row }))
}
