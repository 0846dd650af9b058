use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::filter::validate_identifier;

/// Stock status quick filter → `<column>_<op>` params on `qty`.
/// Only the exact spellings `ACTIVE` and `ZERO` mean anything.
pub fn status_to_query(status: &str) -> BTreeMap<String, Value> {
    let mut params = BTreeMap::new();
    match status {
        "ACTIVE" => {
            params.insert("qty_gt".to_string(), json!(0));
            params.insert("qty_not_null".to_string(), json!(true));
        }
        "ZERO" => {
            params.insert("qty_eq".to_string(), json!(0));
        }
        _ => {}
    }
    params
}

const SUFFIXES: &[(&str, &str)] = &[
    ("_not_null", "$null"),
    ("_is_null", "$null"),
    ("_ilike", "$ilike"),
    ("_gte", "$gte"),
    ("_lte", "$lte"),
    ("_eq", "$eq"),
    ("_ne", "$ne"),
    ("_gt", "$gt"),
    ("_lt", "$lt"),
];

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.as_str(), "true" | "1"),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

/// One where-clause condition per recognised `<column>_<op>` param. Params
/// with an unknown suffix or an invalid column name are skipped.
pub fn quick_params_to_where(params: &BTreeMap<String, Value>) -> Vec<Value> {
    let mut conditions = Vec::new();
    for (key, value) in params {
        let Some((column, op)) = SUFFIXES
            .iter()
            .find_map(|(suffix, op)| key.strip_suffix(suffix).map(|col| (col, *op)).filter(|(col, _)| !col.is_empty()))
        else {
            continue;
        };
        if validate_identifier(column).is_err() {
            continue;
        }
        let operand = match op {
            "$null" if key.ends_with("_not_null") => json!(!truthy(value)),
            "$null" => json!(truthy(value)),
            "$ilike" => json!(format!("%{}%", crate::filter::filter_match::text_of(value))),
            _ => value.clone(),
        };
        conditions.push(json!({ column: { op: operand } }));
    }
    conditions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_and_zero() {
        let active = status_to_query("ACTIVE");
        assert_eq!(active.len(), 2);
        assert_eq!(active["qty_gt"], json!(0));
        assert_eq!(active["qty_not_null"], json!(true));

        let zero = status_to_query("ZERO");
        assert_eq!(zero.len(), 1);
        assert_eq!(zero["qty_eq"], json!(0));
    }

    #[test]
    fn status_is_case_sensitive() {
        assert!(status_to_query("active").is_empty());
        assert!(status_to_query("").is_empty());
        assert!(status_to_query("ALL").is_empty());
    }

    #[test]
    fn active_status_becomes_where_conditions() {
        let conditions = quick_params_to_where(&status_to_query("ACTIVE"));
        assert!(conditions.contains(&json!({ "qty": { "$gt": 0 } })));
        assert!(conditions.contains(&json!({ "qty": { "$null": false } })));
    }

    #[test]
    fn unknown_suffixes_are_skipped() {
        let mut params = BTreeMap::new();
        params.insert("qty_between".to_string(), json!([1, 2]));
        params.insert("_eq".to_string(), json!(1));
        params.insert("name_ilike".to_string(), json!("bolt"));
        let conditions = quick_params_to_where(&params);
        assert_eq!(conditions, vec![json!({ "name": { "$ilike": "%bolt%" } })]);
    }
}
