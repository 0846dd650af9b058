use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgExecutor, PgPool, Row as _};
use tracing::{debug, warn};

use super::{ChildInsert, DataError, DataProvider, Row, RpcArg, RpcReturns, TablePage};
use crate::database::binding::{bind_param, bind_rpc_arg};
use crate::filter::{validate_identifier, Filter, FilterData};

/// Postgres-backed provider. Rows travel as JSON (`row_to_json`) so no
/// per-table Rust types are needed.
#[derive(Clone)]
pub struct PgProvider {
    pool: PgPool,
    log_queries: bool,
}

impl PgProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, log_queries: false }
    }

    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DataError> {
        let wrapped = format!("SELECT row_to_json(t) AS row FROM ({}) t", sql);
        if self.log_queries {
            debug!(sql = %wrapped, params = params.len(), "select");
        }
        let mut q = sqlx::query(&wrapped);
        for p in params {
            q = bind_param(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| json_row(r.try_get("row")?)).collect()
    }

    async fn fetch_count(&self, sql: &str, params: &[Value]) -> Result<i64, DataError> {
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>("count")?)
    }
}

fn json_row(value: Value) -> Result<Row, DataError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DataError::Internal(format!("expected a JSON object row, got {}", other))),
    }
}

fn quoted_columns(row: &Row) -> Result<Vec<String>, DataError> {
    row.keys()
        .map(|c| {
            validate_identifier(c).map_err(DataError::Validation)?;
            Ok(format!("\"{}\"", c))
        })
        .collect()
}

/// `INSERT ... SELECT ... FROM jsonb_populate_record(...)` lets Postgres coerce
/// every JSON value to the column's declared type.
async fn insert_row<'e, E>(executor: E, table: &str, row: Row) -> Result<Row, DataError>
where
    E: PgExecutor<'e>,
{
    validate_identifier(table).map_err(DataError::Validation)?;
    let columns = quoted_columns(&row)?;

    let sql = if columns.is_empty() {
        format!(
            "WITH ins AS (INSERT INTO \"{t}\" DEFAULT VALUES RETURNING *) SELECT row_to_json(ins) AS row FROM ins",
            t = table
        )
    } else {
        let list = columns.join(", ");
        format!(
            "WITH ins AS (INSERT INTO \"{t}\" ({c}) SELECT {c} FROM jsonb_populate_record(NULL::\"{t}\", $1::jsonb) RETURNING *) \
             SELECT row_to_json(ins) AS row FROM ins",
            t = table,
            c = list
        )
    };

    let payload = Value::Object(row);
    let record = sqlx::query(&sql).bind(&payload).fetch_one(executor).await?;
    json_row(record.try_get("row")?)
}

#[async_trait]
impl DataProvider for PgProvider {
    async fn select(&self, table: &str, filter: FilterData, with_count: bool) -> Result<TablePage, DataError> {
        let mut compiled = Filter::new(table)?;
        compiled.assign(filter)?;

        let page_sql = compiled.to_sql();
        if !with_count {
            let rows = self.fetch_rows(&page_sql.query, &page_sql.params).await?;
            return Ok(TablePage { rows, total: 0 });
        }

        let count_sql = compiled.to_count_sql();
        let (rows, total) = futures::try_join!(
            self.fetch_rows(&page_sql.query, &page_sql.params),
            self.fetch_count(&count_sql.query, &count_sql.params),
        )?;
        Ok(TablePage { rows, total })
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, DataError> {
        insert_row(&self.pool, table, row).await
    }

    async fn update(&self, table: &str, pk: &str, id: &Value, patch: Row) -> Result<Option<Row>, DataError> {
        validate_identifier(table).map_err(DataError::Validation)?;
        validate_identifier(pk).map_err(DataError::Validation)?;
        let columns = quoted_columns(&patch)?;
        if columns.is_empty() {
            return self.find_by_pk(table, pk, id).await;
        }

        let assignments = columns.iter().map(|c| format!("{c} = r.{c}")).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "WITH upd AS (UPDATE \"{t}\" SET {a} FROM jsonb_populate_record(NULL::\"{t}\", $1::jsonb) AS r \
             WHERE \"{t}\".\"{pk}\"::text = $2 RETURNING \"{t}\".*) SELECT row_to_json(upd) AS row FROM upd",
            t = table,
            a = assignments,
            pk = pk
        );
        let payload = Value::Object(patch);
        let id_text = crate::filter::filter_match::text_of(id);
        let record = sqlx::query(&sql).bind(&payload).bind(&id_text).fetch_optional(&self.pool).await?;
        record.map(|r| json_row(r.try_get("row")?)).transpose()
    }

    async fn delete(&self, table: &str, pk: &str, ids: &[Value]) -> Result<u64, DataError> {
        validate_identifier(table).map_err(DataError::Validation)?;
        validate_identifier(pk).map_err(DataError::Validation)?;
        let ids: Vec<String> = ids.iter().map(crate::filter::filter_match::text_of).collect();
        let sql = format!("DELETE FROM \"{}\" WHERE \"{}\"::text = ANY($1)", table, pk);
        let result = sqlx::query(&sql).bind(&ids).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn insert_with_children(
        &self,
        table: &str,
        parent: Row,
        children: ChildInsert,
    ) -> Result<(Row, Vec<Row>), DataError> {
        validate_identifier(&children.foreign_key).map_err(DataError::Validation)?;
        let mut tx = self.pool.begin().await?;

        let parent = match insert_row(&mut *tx, table, parent).await {
            Ok(row) => row,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(table, error = %rollback, "rollback after parent insert failure failed");
                }
                return Err(e);
            }
        };
        let parent_key = parent.get(&children.parent_pk).cloned().unwrap_or(Value::Null);

        let mut inserted = Vec::with_capacity(children.rows.len());
        for mut child in children.rows {
            child.insert(children.foreign_key.clone(), parent_key.clone());
            match insert_row(&mut *tx, &children.table, child).await {
                Ok(row) => inserted.push(row),
                Err(e) => {
                    warn!(table, child_table = %children.table, error = %e, "child insert failed, rolling back");
                    if let Err(rollback) = tx.rollback().await {
                        warn!(table, error = %rollback, "rollback failed");
                    }
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        Ok((parent, inserted))
    }

    async fn rpc(&self, function: &str, args: Vec<RpcArg>, returns: RpcReturns) -> Result<Value, DataError> {
        validate_identifier(function).map_err(DataError::Validation)?;
        let mut placeholders = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            validate_identifier(&arg.name).map_err(DataError::Validation)?;
            let cast = arg.cast.map(|c| format!("::{}", c)).unwrap_or_default();
            placeholders.push(format!("{} => ${}{}", arg.name, i + 1, cast));
        }
        let call = format!("\"{}\"({})", function, placeholders.join(", "));
        let sql = match returns {
            RpcReturns::Set => format!("SELECT COALESCE(json_agg(r), '[]'::json) AS result FROM {} AS r", call),
            RpcReturns::Scalar => format!("SELECT to_jsonb({}) AS result", call),
        };
        if self.log_queries {
            debug!(sql = %sql, "rpc");
        }

        let mut q = sqlx::query(&sql);
        for arg in &args {
            q = bind_rpc_arg(q, &arg.value);
        }
        let row = q.fetch_one(&self.pool).await?;
        let result: Option<Value> = row.try_get("result")?;
        Ok(result.unwrap_or(Value::Null))
    }

    async fn ping(&self) -> Result<(), DataError> {
        crate::database::DatabaseManager::health_check(&self.pool).await?;
        Ok(())
    }
}
