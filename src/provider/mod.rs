//! Data access seam. Handlers only ever talk to a [`DataProvider`]; the
//! Postgres implementation runs in production, the in-memory one backs tests
//! and `--memory` dev runs.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::filter::FilterData;

pub use error::DataError;
pub use memory::MemoryProvider;
pub use postgres::PgProvider;

pub type Row = Map<String, Value>;

/// A page of rows plus the size of the whole filtered set.
#[derive(Debug, Clone, Default)]
pub struct TablePage {
    pub rows: Vec<Row>,
    pub total: i64,
}

/// Child rows inserted together with a parent row. `foreign_key` on every child
/// is set to the parent's `parent_pk` value.
#[derive(Debug, Clone)]
pub struct ChildInsert {
    pub table: String,
    pub foreign_key: String,
    pub parent_pk: String,
    pub rows: Vec<Row>,
}

/// Named argument to a Postgres function, with an optional SQL cast
/// (`_id => $1::uuid`).
#[derive(Debug, Clone, PartialEq)]
pub struct RpcArg {
    pub name: String,
    pub value: Value,
    pub cast: Option<&'static str>,
}

impl RpcArg {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(), value: value.into(), cast: None }
    }

    pub fn cast(mut self, sql_type: &'static str) -> Self {
        self.cast = Some(sql_type);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcReturns {
    /// Set-returning function; result is a JSON array of rows.
    Set,
    /// Scalar function; result is its value as JSON (null when it returned NULL).
    Scalar,
}

#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Filtered, ordered, paged read. `total` is only computed when `with_count` is set.
    async fn select(&self, table: &str, filter: FilterData, with_count: bool) -> Result<TablePage, DataError>;

    async fn insert(&self, table: &str, row: Row) -> Result<Row, DataError>;

    /// Partial update of the row whose `pk` equals `id`; `None` when no row matched.
    async fn update(&self, table: &str, pk: &str, id: &Value, patch: Row) -> Result<Option<Row>, DataError>;

    async fn delete(&self, table: &str, pk: &str, ids: &[Value]) -> Result<u64, DataError>;

    /// Insert a parent row and its children atomically.
    async fn insert_with_children(
        &self,
        table: &str,
        parent: Row,
        children: ChildInsert,
    ) -> Result<(Row, Vec<Row>), DataError>;

    async fn rpc(&self, function: &str, args: Vec<RpcArg>, returns: RpcReturns) -> Result<Value, DataError>;

    async fn ping(&self) -> Result<(), DataError>;

    async fn find_by_pk(&self, table: &str, pk: &str, id: &Value) -> Result<Option<Row>, DataError> {
        let filter = FilterData {
            where_clause: Some(json!({ pk: id })),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.select(table, filter, false).await?.rows.into_iter().next())
    }
}
