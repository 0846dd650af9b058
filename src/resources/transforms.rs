use serde_json::Value;

use crate::provider::Row;

fn trim_strings(mut row: Row) -> Row {
    for value in row.values_mut() {
        if let Value::String(s) = value {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
    }
    row
}

fn upper(row: &mut Row, column: &str) {
    if let Some(Value::String(s)) = row.get_mut(column) {
        *s = s.to_uppercase();
    }
}

/// Empty strings on optional columns become NULL rather than `''`.
fn blank_to_null(row: &mut Row, columns: &[&str]) {
    for column in columns {
        if matches!(row.get(*column), Some(Value::String(s)) if s.is_empty()) {
            row.insert(column.to_string(), Value::Null);
        }
    }
}

fn require(row: &Row, column: &str) -> Result<(), String> {
    match row.get(column) {
        None | Some(Value::Null) => Err(format!("{} is required", column)),
        Some(Value::String(s)) if s.is_empty() => Err(format!("{} is required", column)),
        _ => Ok(()),
    }
}

pub fn tally_card_input(row: Row) -> Result<Row, String> {
    let mut row = trim_strings(row);
    require(&row, "tally_card_number")?;
    upper(&mut row, "tally_card_number");
    blank_to_null(&mut row, &["note", "item_number", "card_uid"]);
    if !row.contains_key("is_active") {
        row.insert("is_active".into(), Value::Bool(true));
    }
    Ok(row)
}

/// Item numbers are numeric in the source systems; keep them as text.
pub fn tally_card_domain(mut row: Row) -> Row {
    if let Some(value @ Value::Number(_)) = row.get("item_number").cloned() {
        row.insert("item_number".into(), Value::String(value.to_string()));
    }
    row
}

pub fn stock_adjustment_domain(mut row: Row) -> Row {
    let qty = match row.get("qty") {
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Value::from).unwrap_or(Value::Null),
        Some(other) => other.clone(),
        None => Value::Null,
    };
    row.insert("qty".into(), qty);
    row
}

pub fn warehouse_input(row: Row) -> Result<Row, String> {
    let mut row = trim_strings(row);
    require(&row, "code")?;
    upper(&mut row, "code");
    Ok(row)
}

pub fn purchase_order_input(row: Row) -> Result<Row, String> {
    let mut row = trim_strings(row);
    require(&row, "order_number")?;
    upper(&mut row, "order_number");
    blank_to_null(&mut row, &["expected_at", "supplier_name"]);
    Ok(row)
}

pub fn requisition_input(row: Row) -> Result<Row, String> {
    let mut row = trim_strings(row);
    require(&row, "requisition_number")?;
    upper(&mut row, "requisition_number");
    blank_to_null(&mut row, &["needed_by", "note"]);
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn tally_card_input_normalises() {
        let out = tally_card_input(row(json!({ "tally_card_number": "  tc-9 ", "note": "" }))).unwrap();
        assert_eq!(out["tally_card_number"], "TC-9");
        assert_eq!(out["note"], Value::Null);
        assert_eq!(out["is_active"], true);
    }

    #[test]
    fn missing_required_column_is_reported() {
        let err = tally_card_input(row(json!({ "tally_card_number": "   " }))).unwrap_err();
        assert_eq!(err, "tally_card_number is required");
        assert_eq!(warehouse_input(row(json!({}))).unwrap_err(), "code is required");
    }

    #[test]
    fn stock_adjustment_qty_parsed() {
        assert_eq!(stock_adjustment_domain(row(json!({ "qty": "5" })))["qty"], 5);
        assert_eq!(stock_adjustment_domain(row(json!({ "qty": "x" })))["qty"], Value::Null);
    }
}
