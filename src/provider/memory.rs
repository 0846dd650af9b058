use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{ChildInsert, DataError, DataProvider, Row, RpcArg, RpcReturns, TablePage};
use crate::filter::{validate_identifier, Filter, FilterData, FilterMatch, FilterOrder};
use crate::filter::filter_match::compare;

type RpcHandler = Arc<dyn Fn(&Map<String, Value>) -> Result<Value, DataError> + Send + Sync>;

#[derive(Default)]
struct Store {
    tables: HashMap<String, Vec<Row>>,
    unique: HashMap<String, Vec<String>>,
    denied: HashSet<String>,
    failing_inserts: HashSet<String>,
    offline: bool,
    rpcs: HashMap<String, RpcHandler>,
}

/// In-process provider with the same filter semantics as the Postgres one.
/// Rows without an `id` get a v4 uuid on insert.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    store: Arc<RwLock<Store>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: impl IntoIterator<Item = Value>) -> Self {
        self.seed(table, rows);
        self
    }

    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        let mut store = self.write();
        let entry = store.tables.entry(table.to_string()).or_default();
        entry.extend(rows.into_iter().filter_map(|v| v.as_object().cloned()));
    }

    /// Reject inserts/updates that duplicate `column` within `table`.
    pub fn with_unique(self, table: &str, column: &str) -> Self {
        self.write().unique.entry(table.to_string()).or_default().push(column.to_string());
        self
    }

    /// Every access to `table` fails the way an RLS policy violation does.
    pub fn deny(self, table: &str) -> Self {
        self.write().denied.insert(table.to_string());
        self
    }

    /// Inserts into `table` fail with an internal error.
    pub fn fail_inserts_into(self, table: &str) -> Self {
        self.write().failing_inserts.insert(table.to_string());
        self
    }

    /// `ping` reports the store as unreachable.
    pub fn offline(self) -> Self {
        self.write().offline = true;
        self
    }

    pub fn with_rpc<F>(self, function: &str, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, DataError> + Send + Sync + 'static,
    {
        self.write().rpcs.insert(function.to_string(), Arc::new(handler));
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.read().tables.get(table).cloned().unwrap_or_default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Store {
    fn check_access(&self, table: &str) -> Result<(), DataError> {
        validate_identifier(table).map_err(DataError::Validation)?;
        if self.denied.contains(table) {
            return Err(DataError::PermissionDenied(format!(
                "new row violates row-level security policy for table \"{}\"",
                table
            )));
        }
        Ok(())
    }

    fn check_unique(&self, table: &str, row: &Row, skip_index: Option<usize>) -> Result<(), DataError> {
        let (Some(columns), Some(existing)) = (self.unique.get(table), self.tables.get(table)) else {
            return Ok(());
        };
        for column in columns {
            let Some(value) = row.get(column).filter(|v| !v.is_null()) else { continue };
            let clash = existing
                .iter()
                .enumerate()
                .any(|(i, other)| Some(i) != skip_index && other.get(column) == Some(value));
            if clash {
                return Err(DataError::Conflict(format!(
                    "duplicate key value violates unique constraint \"{}_{}_key\"",
                    table, column
                )));
            }
        }
        Ok(())
    }

    fn prepare_insert(&self, table: &str, mut row: Row) -> Result<Row, DataError> {
        self.check_access(table)?;
        for column in row.keys() {
            validate_identifier(column).map_err(DataError::Validation)?;
        }
        if self.failing_inserts.contains(table) {
            return Err(DataError::Internal(format!("insert into {} failed", table)));
        }
        if !row.contains_key("id") {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        self.check_unique(table, &row, None)?;
        Ok(row)
    }

    fn position(&self, table: &str, pk: &str, id: &Value) -> Option<usize> {
        self.tables.get(table)?.iter().position(|r| {
            r.get(pk).map(|v| compare(v, id) == Some(std::cmp::Ordering::Equal)).unwrap_or(false)
        })
    }
}

#[async_trait]
impl DataProvider for MemoryProvider {
    async fn select(&self, table: &str, filter: FilterData, with_count: bool) -> Result<TablePage, DataError> {
        let store = self.read();
        store.check_access(table)?;

        // Reuse the SQL builder's validation so both providers reject the same input.
        let mut compiled = Filter::new(table)?;
        compiled.assign(FilterData { limit: None, offset: None, ..filter.clone() })?;
        let order = match &filter.order {
            Some(order) => FilterOrder::validate_and_parse(order)?,
            None => vec![],
        };

        let mut matched: Vec<Row> = store
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| FilterMatch::matches(compiled.where_node(), r)).cloned().collect())
            .unwrap_or_default();
        FilterMatch::sort(&mut matched, &order);

        let total = matched.len() as i64;
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

        let select = filter.select.unwrap_or_default();
        let rows = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| {
                if select.is_empty() || select.iter().any(|c| c == "*") {
                    row
                } else {
                    select.iter().map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null))).collect()
                }
            })
            .collect();

        Ok(TablePage { rows, total: if with_count { total } else { 0 } })
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, DataError> {
        let mut store = self.write();
        let row = store.prepare_insert(table, row)?;
        store.tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, pk: &str, id: &Value, patch: Row) -> Result<Option<Row>, DataError> {
        let mut store = self.write();
        store.check_access(table)?;
        let Some(index) = store.position(table, pk, id) else { return Ok(None) };

        let mut updated = store.tables[table][index].clone();
        for (k, v) in patch {
            validate_identifier(&k).map_err(DataError::Validation)?;
            updated.insert(k, v);
        }
        store.check_unique(table, &updated, Some(index))?;
        if let Some(rows) = store.tables.get_mut(table) {
            rows[index] = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn delete(&self, table: &str, pk: &str, ids: &[Value]) -> Result<u64, DataError> {
        let mut store = self.write();
        store.check_access(table)?;
        let Some(rows) = store.tables.get_mut(table) else { return Ok(0) };
        let before = rows.len();
        rows.retain(|r| {
            let value = r.get(pk).unwrap_or(&Value::Null);
            !ids.iter().any(|id| compare(value, id) == Some(std::cmp::Ordering::Equal))
        });
        Ok((before - rows.len()) as u64)
    }

    async fn insert_with_children(
        &self,
        table: &str,
        parent: Row,
        children: ChildInsert,
    ) -> Result<(Row, Vec<Row>), DataError> {
        let mut store = self.write();

        // Stage everything first; nothing is written unless every row is accepted.
        let parent = store.prepare_insert(table, parent)?;
        let parent_key = parent.get(&children.parent_pk).cloned().unwrap_or(Value::Null);
        let mut staged = Vec::with_capacity(children.rows.len());
        for mut child in children.rows {
            child.insert(children.foreign_key.clone(), parent_key.clone());
            staged.push(store.prepare_insert(&children.table, child)?);
        }

        store.tables.entry(table.to_string()).or_default().push(parent.clone());
        store.tables.entry(children.table.clone()).or_default().extend(staged.iter().cloned());
        Ok((parent, staged))
    }

    async fn rpc(&self, function: &str, args: Vec<RpcArg>, returns: RpcReturns) -> Result<Value, DataError> {
        let handler = self
            .read()
            .rpcs
            .get(function)
            .cloned()
            .ok_or_else(|| DataError::NotFound(format!("function {} does not exist", function)))?;
        let args: Map<String, Value> = args.into_iter().map(|a| (a.name, a.value)).collect();
        let result = handler(&args)?;
        Ok(match (returns, result) {
            (RpcReturns::Set, Value::Null) => Value::Array(vec![]),
            (_, other) => other,
        })
    }

    async fn ping(&self) -> Result<(), DataError> {
        if self.read().offline {
            return Err(DataError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cards() -> MemoryProvider {
        MemoryProvider::new().with_rows(
            "tcm_tally_cards",
            (1..=5).map(|i| json!({ "id": i, "tally_card_number": format!("TC-{:03}", i), "qty": i % 2 })),
        )
    }

    #[tokio::test]
    async fn select_filters_sorts_and_pages() {
        let provider = cards();
        let page = provider
            .select(
                "tcm_tally_cards",
                FilterData {
                    where_clause: Some(json!({ "qty": { "$gt": 0 } })),
                    order: Some(json!("id desc")),
                    limit: Some(2),
                    offset: Some(0),
                    ..Default::default()
                },
                true,
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<i64> = page.rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![5, 3]);
    }

    #[tokio::test]
    async fn failing_child_insert_writes_nothing() {
        let provider = MemoryProvider::new().fail_inserts_into("children");
        let result = provider
            .insert_with_children(
                "parents",
                json!({ "name": "p" }).as_object().cloned().unwrap(),
                ChildInsert {
                    table: "children".into(),
                    foreign_key: "parent_id".into(),
                    parent_pk: "id".into(),
                    rows: vec![json!({ "n": 1 }).as_object().cloned().unwrap()],
                },
            )
            .await;
        assert!(result.is_err());
        assert!(provider.rows("parents").is_empty());
        assert!(provider.rows("children").is_empty());
    }

    #[tokio::test]
    async fn unique_columns_conflict() {
        let provider = cards().with_unique("tcm_tally_cards", "tally_card_number");
        let err = provider
            .insert("tcm_tally_cards", json!({ "tally_card_number": "TC-001" }).as_object().cloned().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_and_delete_by_text_id() {
        let provider = cards();
        let updated = provider
            .update("tcm_tally_cards", "id", &json!("2"), json!({ "qty": 9 }).as_object().cloned().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["qty"], 9);
        let deleted = provider.delete("tcm_tally_cards", "id", &[json!(1), json!("2"), json!(99)]).await.unwrap();
        assert_eq!(deleted, 2);
    }
}
