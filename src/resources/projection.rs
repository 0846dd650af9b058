//! Domain row → the shape list views render: camelCase keys, identifiers and
//! codes as strings, quantities as numbers.

use serde_json::Value;

use crate::filter::filter_match::text_of;
use crate::provider::Row;

#[derive(Debug, Clone, Copy)]
enum Coerce {
    Keep,
    Text,
    Number,
    Flag,
}

fn coerce(value: Option<&Value>, how: Coerce) -> Value {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return match how {
            Coerce::Flag => Value::Bool(false),
            _ => Value::Null,
        };
    };
    match how {
        Coerce::Keep => value.clone(),
        Coerce::Text => Value::String(text_of(value)),
        Coerce::Number => match value {
            Value::Number(_) => value.clone(),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        Coerce::Flag => match value {
            Value::Bool(b) => Value::Bool(*b),
            Value::String(s) => Value::Bool(matches!(s.as_str(), "true" | "t" | "1")),
            Value::Number(n) => Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
            _ => Value::Bool(false),
        },
    }
}

fn project(row: &Row, fields: &[(&str, &str, Coerce)]) -> Row {
    fields
        .iter()
        .map(|(from, to, how)| (to.to_string(), coerce(row.get(*from), *how)))
        .collect()
}

pub fn tally_card_row(row: Row) -> Row {
    project(
        &row,
        &[
            ("id", "id", Coerce::Text),
            ("card_uid", "cardUid", Coerce::Text),
            ("tally_card_number", "tallyCardNumber", Coerce::Text),
            ("warehouse_id", "warehouseId", Coerce::Text),
            ("item_number", "itemNumber", Coerce::Text),
            ("note", "note", Coerce::Keep),
            ("is_active", "isActive", Coerce::Flag),
            ("snapshot_at", "snapshotAt", Coerce::Keep),
            ("updated_at", "updatedAt", Coerce::Keep),
        ],
    )
}

pub fn stock_adjustment_row(row: Row) -> Row {
    project(
        &row,
        &[
            ("id", "id", Coerce::Text),
            ("tally_card_number", "tallyCardNumber", Coerce::Text),
            ("qty", "qty", Coerce::Number),
            ("location", "location", Coerce::Keep),
            ("note", "note", Coerce::Keep),
            ("reason_code", "reasonCode", Coerce::Keep),
            ("multi_location", "multiLocation", Coerce::Flag),
            ("updated_at", "updatedAt", Coerce::Keep),
        ],
    )
}

pub fn inventory_row(row: Row) -> Row {
    project(
        &row,
        &[
            ("item_number", "id", Coerce::Text),
            ("item_number", "itemNumber", Coerce::Text),
            ("description", "description", Coerce::Keep),
            ("warehouse", "warehouse", Coerce::Keep),
            ("qty", "qty", Coerce::Number),
            ("unit_cost", "unitCost", Coerce::Number),
            ("on_hand_value", "onHandValue", Coerce::Number),
        ],
    )
}

pub fn warehouse_row(row: Row) -> Row {
    project(
        &row,
        &[
            ("id", "id", Coerce::Text),
            ("code", "code", Coerce::Text),
            ("name", "name", Coerce::Keep),
            ("is_active", "isActive", Coerce::Flag),
        ],
    )
}

pub fn purchase_order_row(row: Row) -> Row {
    project(
        &row,
        &[
            ("id", "id", Coerce::Text),
            ("order_number", "orderNumber", Coerce::Text),
            ("supplier_name", "supplierName", Coerce::Keep),
            ("order_status", "status", Coerce::Keep),
            ("warehouse_id", "warehouseId", Coerce::Text),
            ("expected_at", "expectedAt", Coerce::Keep),
            ("total_amount", "totalAmount", Coerce::Number),
            ("created_at", "createdAt", Coerce::Keep),
        ],
    )
}

pub fn requisition_row(row: Row) -> Row {
    project(
        &row,
        &[
            ("id", "id", Coerce::Text),
            ("requisition_number", "requisitionNumber", Coerce::Text),
            ("requested_by", "requestedBy", Coerce::Text),
            ("requisition_status", "status", Coerce::Keep),
            ("warehouse_id", "warehouseId", Coerce::Text),
            ("needed_by", "neededBy", Coerce::Keep),
            ("created_at", "createdAt", Coerce::Keep),
        ],
    )
}

/// `auth_id` is deliberately not projected.
pub fn user_row(row: Row) -> Row {
    project(
        &row,
        &[
            ("id", "id", Coerce::Text),
            ("email", "email", Coerce::Keep),
            ("full_name", "fullName", Coerce::Keep),
            ("role_code", "role", Coerce::Keep),
            ("warehouse_ids", "warehouseIds", Coerce::Keep),
            ("is_active", "isActive", Coerce::Flag),
        ],
    )
}
