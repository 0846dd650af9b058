use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{FilterWhere, WhereNode};
use super::types::{FilterData, FilterOrderInfo, SqlResult};

/// SQL builder for a single-table read: `SELECT cols FROM "table" WHERE ... ORDER BY ... LIMIT ... OFFSET ...`.
pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_node: WhereNode,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        validate_identifier(&table_name).map_err(FilterError::InvalidTable)?;
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_node: WhereNode::And(vec![]),
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select { self.select(select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(&where_clause)?; }
        if let Some(order) = data.order { self.order(&order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in &columns {
            if column != "*" {
                validate_identifier(column).map_err(FilterError::InvalidColumn)?;
            }
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: &serde_json::Value) -> Result<&mut Self, FilterError> {
        self.where_node = WhereNode::parse(conditions)?;
        Ok(self)
    }

    pub fn order(&mut self, order_spec: &serde_json::Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::NegativeWindow("limit", limit));
        }
        if let Some(off) = offset.filter(|o| *o < 0) {
            return Err(FilterError::NegativeWindow("offset", off));
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.where_node, 0);
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.where_node, 0);
        SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table_name, where_clause),
            params,
        }
    }

    pub fn where_node(&self) -> &WhereNode {
        &self.where_node
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

/// Table, column and function names: ASCII letters, digits and `_`, not starting with a digit.
pub fn validate_identifier(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        None => Err("Identifier cannot be empty".to_string()),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
            Err(format!("Invalid identifier format: {}", name))
        }
        Some(_) if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') => {
            Err(format!("Invalid identifier format: {}", name))
        }
        Some(_) if name.len() > 63 => Err(format!("Identifier too long: {}", name)),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_paged_select() {
        let mut filter = Filter::new("tcm_tally_cards").unwrap();
        filter
            .assign(FilterData {
                select: Some(vec!["id".into(), "tally_card_number".into()]),
                where_clause: Some(json!({ "is_active": true })),
                order: Some(json!("tally_card_number asc")),
                limit: Some(20),
                offset: Some(40),
            })
            .unwrap();

        let sql = filter.to_sql();
        assert_eq!(
            sql.query,
            "SELECT \"id\", \"tally_card_number\" FROM \"tcm_tally_cards\" WHERE \"is_active\" = $1 \
             ORDER BY \"tally_card_number\" ASC LIMIT 20 OFFSET 40"
        );
        assert_eq!(sql.params, vec![json!(true)]);
    }

    #[test]
    fn count_ignores_paging() {
        let mut filter = Filter::new("warehouses").unwrap();
        filter.limit(10, Some(10)).unwrap();
        assert_eq!(filter.to_count_sql().query, "SELECT COUNT(*) AS count FROM \"warehouses\" WHERE 1=1");
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(Filter::new("").is_err());
        assert!(Filter::new("1table").is_err());
        assert!(Filter::new("users; drop").is_err());
        assert!(Filter::new("users").unwrap().select(vec!["a b".into()]).is_err());
        assert!(Filter::new("users").unwrap().limit(-1, None).is_err());
    }
}
