use serde_json::Value;

use super::error::FilterError;
use super::filter::validate_identifier;
use super::types::FilterOp;

const MAX_DEPTH: usize = 16;

/// Parsed form of a JSON where-tree.
///
/// `{ "qty": { "$gt": 0 }, "$or": [ { "status": "open" }, { "status": null } ] }`
/// becomes `And[Field(qty > 0), Or[Field(status = open), Field(status IS NULL)]]`.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereNode {
    And(Vec<WhereNode>),
    Or(Vec<WhereNode>),
    Not(Box<WhereNode>),
    Field { column: String, op: FilterOp, data: Value },
}

impl WhereNode {
    pub fn parse(where_data: &Value) -> Result<Self, FilterError> {
        Self::parse_at(where_data, 0)
    }

    fn parse_at(where_data: &Value, depth: usize) -> Result<Self, FilterError> {
        if depth > MAX_DEPTH {
            return Err(FilterError::TooDeep(MAX_DEPTH));
        }
        let obj = match where_data {
            Value::Null => return Ok(WhereNode::And(vec![])),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::NotAnObject("where")),
        };

        let mut nodes = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            match key.as_str() {
                "$and" | "$or" => {
                    let arr = value
                        .as_array()
                        .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", key)))?;
                    let children = arr
                        .iter()
                        .map(|v| Self::parse_at(v, depth + 1))
                        .collect::<Result<Vec<_>, _>>()?;
                    nodes.push(if key == "$and" { WhereNode::And(children) } else { WhereNode::Or(children) });
                }
                "$not" => nodes.push(WhereNode::Not(Box::new(Self::parse_at(value, depth + 1)?))),
                k if k.starts_with('$') => return Err(FilterError::UnsupportedOperator(k.to_string())),
                field => Self::parse_field(field, value, &mut nodes)?,
            }
        }

        Ok(if nodes.len() == 1 { nodes.remove(0) } else { WhereNode::And(nodes) })
    }

    fn parse_field(field: &str, value: &Value, out: &mut Vec<WhereNode>) -> Result<(), FilterError> {
        validate_identifier(field).map_err(FilterError::InvalidColumn)?;
        match value {
            Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) && !ops.is_empty() => {
                for (op_key, op_val) in ops {
                    let op = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    Self::validate_operand(op, op_val)?;
                    out.push(WhereNode::Field { column: field.to_string(), op, data: op_val.clone() });
                }
            }
            // Implicit equality: { field: value }
            _ => out.push(WhereNode::Field { column: field.to_string(), op: FilterOp::Eq, data: value.clone() }),
        }
        Ok(())
    }

    fn validate_operand(op: FilterOp, data: &Value) -> Result<(), FilterError> {
        match op {
            FilterOp::In | FilterOp::NIn if !data.is_array() => Err(FilterError::InvalidOperatorData(format!(
                "{} requires array",
                op.key()
            ))),
            FilterOp::Between if data.as_array().map(|a| a.len()) != Some(2) => Err(
                FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string()),
            ),
            FilterOp::Like | FilterOp::ILike if !data.is_string() => Err(FilterError::InvalidOperatorData(format!(
                "{} requires a string pattern",
                op.key()
            ))),
            FilterOp::Null if !data.is_boolean() => {
                Err(FilterError::InvalidOperatorData("$null requires true or false".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Compiles a [`WhereNode`] into a parameterised Postgres predicate.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self { param_values: vec![], param_index: starting_param_index }
    }

    pub fn generate(node: &WhereNode, starting_param_index: usize) -> (String, Vec<Value>) {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(node);
        (sql, filter_where.param_values)
    }

    fn build(&mut self, node: &WhereNode) -> String {
        match node {
            WhereNode::And(children) if children.is_empty() => "1=1".to_string(),
            WhereNode::Or(children) if children.is_empty() => "1=0".to_string(),
            WhereNode::And(children) => self.join(children, " AND "),
            WhereNode::Or(children) => self.join(children, " OR "),
            WhereNode::Not(inner) => format!("NOT ({})", self.build(inner)),
            WhereNode::Field { column, op, data } => self.build_field(column, *op, data),
        }
    }

    fn join(&mut self, children: &[WhereNode], joiner: &str) -> String {
        let parts: Vec<String> = children.iter().map(|c| format!("({})", self.build(c))).collect();
        parts.join(joiner)
    }

    fn build_field(&mut self, column: &str, op: FilterOp, data: &Value) -> String {
        let quoted = format!("\"{}\"", column);
        // String operands compare against the column's text form so uuid/date
        // columns accept plain string values.
        let lhs = |v: &Value| if v.is_string() { format!("{}::text", quoted) } else { quoted.clone() };

        match op {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", quoted),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", quoted),
            FilterOp::Eq => format!("{} = {}", lhs(data), self.param(data)),
            FilterOp::Ne => format!("{} <> {}", lhs(data), self.param(data)),
            FilterOp::Gt => format!("{} > {}", lhs(data), self.param(data)),
            FilterOp::Gte => format!("{} >= {}", lhs(data), self.param(data)),
            FilterOp::Lt => format!("{} < {}", lhs(data), self.param(data)),
            FilterOp::Lte => format!("{} <= {}", lhs(data), self.param(data)),
            FilterOp::Like => format!("{}::text LIKE {}", quoted, self.param(data)),
            FilterOp::ILike => format!("{}::text ILIKE {}", quoted, self.param(data)),
            FilterOp::Null => {
                if data.as_bool().unwrap_or(true) {
                    format!("{} IS NULL", quoted)
                } else {
                    format!("{} IS NOT NULL", quoted)
                }
            }
            FilterOp::In | FilterOp::NIn => {
                let values = data.as_array().cloned().unwrap_or_default();
                if values.is_empty() {
                    return if op == FilterOp::In { "1=0".to_string() } else { "1=1".to_string() };
                }
                let column_sql = if values.iter().all(Value::is_string) { format!("{}::text", quoted) } else { quoted.clone() };
                let params: Vec<String> = values.iter().map(|v| self.param(v)).collect();
                let keyword = if op == FilterOp::In { "IN" } else { "NOT IN" };
                format!("{} {} ({})", column_sql, keyword, params.join(", "))
            }
            FilterOp::Between => {
                let values = data.as_array().cloned().unwrap_or_default();
                let (low, high) = (values.first().cloned().unwrap_or(Value::Null), values.get(1).cloned().unwrap_or(Value::Null));
                format!("{} BETWEEN {} AND {}", lhs(&low), self.param(&low), self.param(&high))
            }
        }
    }

    fn param(&mut self, value: &Value) -> String {
        self.param_values.push(value.clone());
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sql(value: Value) -> (String, Vec<Value>) {
        let node = WhereNode::parse(&value).unwrap();
        FilterWhere::generate(&node, 0)
    }

    #[test]
    fn implicit_equality_and_null() {
        let (q, params) = sql(json!({ "status": "open" }));
        assert_eq!(q, "\"status\"::text = $1");
        assert_eq!(params, vec![json!("open")]);

        let (q, params) = sql(json!({ "closed_at": null }));
        assert_eq!(q, "\"closed_at\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn numeric_comparisons_keep_column_type() {
        let (q, params) = sql(json!({ "qty": { "$gt": 0, "$null": false } }));
        assert_eq!(q, "(\"qty\" > $1) AND (\"qty\" IS NOT NULL)");
        assert_eq!(params, vec![json!(0)]);
    }

    #[test]
    fn nested_or_numbers_parameters_in_order() {
        let (q, params) = sql(json!({
            "$or": [ { "item_number": { "$ilike": "%bolt%" } }, { "note": { "$ilike": "%bolt%" } } ],
            "warehouse_id": { "$in": ["a", "b"] }
        }));
        assert_eq!(
            q,
            "((\"item_number\"::text ILIKE $1) OR (\"note\"::text ILIKE $2)) AND (\"warehouse_id\"::text IN ($3, $4))"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (q, _) = sql(json!({ "id": { "$in": [] } }));
        assert_eq!(q, "1=0");
    }

    #[test]
    fn rejects_unknown_operators_and_bad_columns() {
        assert!(WhereNode::parse(&json!({ "qty": { "$regex": "x" } })).is_err());
        assert!(WhereNode::parse(&json!({ "qty; drop table": 1 })).is_err());
        assert!(WhereNode::parse(&json!({ "$xor": [] })).is_err());
        assert!(WhereNode::parse(&json!([1, 2])).is_err());
    }

    #[test]
    fn null_and_empty_object_match_everything() {
        assert_eq!(sql(Value::Null).0, "1=1");
        assert_eq!(sql(json!({})).0, "1=1");
    }
}
