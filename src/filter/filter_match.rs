use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::filter_where::WhereNode;
use super::types::{FilterOp, FilterOrderInfo, SortDirection};

/// Evaluates a [`WhereNode`] against an in-memory row with the same
/// semantics the compiled SQL has: comparisons against NULL are false, string
/// operands compare against the value's text form.
pub struct FilterMatch;

impl FilterMatch {
    pub fn matches(node: &WhereNode, row: &Map<String, Value>) -> bool {
        match node {
            WhereNode::And(children) => children.iter().all(|c| Self::matches(c, row)),
            WhereNode::Or(children) => children.iter().any(|c| Self::matches(c, row)),
            WhereNode::Not(inner) => !Self::matches(inner, row),
            WhereNode::Field { column, op, data } => {
                Self::field_matches(row.get(column).unwrap_or(&Value::Null), *op, data)
            }
        }
    }

    fn field_matches(value: &Value, op: FilterOp, data: &Value) -> bool {
        match op {
            FilterOp::Null => value.is_null() == data.as_bool().unwrap_or(true),
            FilterOp::Eq if data.is_null() => value.is_null(),
            FilterOp::Ne if data.is_null() => !value.is_null(),
            _ if value.is_null() => false,
            FilterOp::Eq => compare(value, data) == Some(Ordering::Equal),
            FilterOp::Ne => matches!(compare(value, data), Some(o) if o != Ordering::Equal),
            FilterOp::Gt => compare(value, data) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(compare(value, data), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => compare(value, data) == Some(Ordering::Less),
            FilterOp::Lte => matches!(compare(value, data), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Like => like(&text_of(value), data.as_str().unwrap_or_default()),
            FilterOp::ILike => like(
                &text_of(value).to_lowercase(),
                &data.as_str().unwrap_or_default().to_lowercase(),
            ),
            FilterOp::In => data
                .as_array()
                .map(|vs| vs.iter().any(|v| compare(value, v) == Some(Ordering::Equal)))
                .unwrap_or(false),
            FilterOp::NIn => data
                .as_array()
                .map(|vs| vs.iter().all(|v| matches!(compare(value, v), Some(o) if o != Ordering::Equal)))
                .unwrap_or(true),
            FilterOp::Between => match data.as_array().map(|a| a.as_slice()) {
                Some([low, high]) => {
                    matches!(compare(value, low), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(compare(value, high), Some(Ordering::Less | Ordering::Equal))
                }
                _ => false,
            },
        }
    }

    /// Sort rows by the given order list; NULLs sort last ascending, first descending (Postgres default).
    pub fn sort(rows: &mut [Map<String, Value>], order: &[FilterOrderInfo]) {
        rows.sort_by(|a, b| {
            for info in order {
                let left = a.get(&info.column).unwrap_or(&Value::Null);
                let right = b.get(&info.column).unwrap_or(&Value::Null);
                let ord = match (left.is_null(), right.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
                };
                let ord = if info.sort == SortDirection::Desc { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

/// Compare a row value with an operand. A string operand compares against the
/// row value's text form, mirroring the `::text` cast in generated SQL.
pub fn compare(value: &Value, operand: &Value) -> Option<Ordering> {
    match (value, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (_, Value::String(b)) => Some(text_of(value).as_str().cmp(b.as_str())),
        (Value::String(a), Value::Number(b)) => a.parse::<f64>().ok()?.partial_cmp(&b.as_f64()?),
        (a, b) if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// SQL LIKE: `%` matches any run, `_` one character.
fn like(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((bp, bt)) = backtrack {
            pi = bp + 1;
            ti = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn check(filter: Value, r: Value) -> bool {
        FilterMatch::matches(&WhereNode::parse(&filter).unwrap(), &row(r))
    }

    #[test]
    fn like_patterns() {
        assert!(like("bolt-m8", "%m8"));
        assert!(like("bolt-m8", "b_lt%"));
        assert!(like("abc", "%"));
        assert!(!like("abc", "a_"));
        assert!(like("", "%"));
    }

    #[test]
    fn comparisons_follow_sql_null_semantics() {
        assert!(check(json!({ "qty": { "$gt": 0 } }), json!({ "qty": 3 })));
        assert!(!check(json!({ "qty": { "$gt": 0 } }), json!({ "qty": null })));
        assert!(!check(json!({ "qty": { "$ne": 0 } }), json!({})));
        assert!(check(json!({ "qty": { "$null": false } }), json!({ "qty": 0 })));
        assert!(check(json!({ "qty": 0 }), json!({ "qty": 0 })));
    }

    #[test]
    fn string_operands_use_text_form() {
        assert!(check(json!({ "item_number": "1001" }), json!({ "item_number": 1001 })));
        assert!(check(json!({ "note": { "$ilike": "%BOLT%" } }), json!({ "note": "hex bolt" })));
        assert!(check(json!({ "warehouse_id": { "$in": ["w1", "w2"] } }), json!({ "warehouse_id": "w2" })));
    }

    #[test]
    fn logical_operators() {
        let filter = json!({ "$or": [ { "qty": 0 }, { "$not": { "status": "open" } } ] });
        assert!(check(filter.clone(), json!({ "qty": 0, "status": "open" })));
        assert!(check(filter.clone(), json!({ "qty": 5, "status": "closed" })));
        assert!(!check(filter, json!({ "qty": 5, "status": "open" })));
    }

    #[test]
    fn sorts_with_nulls_last() {
        let mut rows = vec![row(json!({ "pos": 2 })), row(json!({ "pos": null })), row(json!({ "pos": 1 }))];
        FilterMatch::sort(&mut rows, &[FilterOrderInfo::new("pos", SortDirection::Asc)]);
        let order: Vec<Value> = rows.iter().map(|r| r["pos"].clone()).collect();
        assert_eq!(order, vec![json!(1), json!(2), Value::Null]);
    }
}
