use serde_json::Value;
use sqlx::postgres::PgArguments;

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

/// Bind a filter or row parameter by its JSON kind.
pub fn bind_param<'q>(q: PgQuery<'q>, v: &'q Value) -> PgQuery<'q> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres has no u64; anything this large is out of range for bigint anyway
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v), // JSONB
    }
}

/// Bind a function argument. Integers that fit go out as int4, which Postgres
/// widens implicitly to int8 / numeric when resolving the function.
pub fn bind_rpc_arg<'q>(q: PgQuery<'q>, v: &'q Value) -> PgQuery<'q> {
    match v {
        Value::Number(n) => match n.as_i64().map(i32::try_from) {
            Some(Ok(small)) => q.bind(small),
            _ => bind_param(q, v),
        },
        _ => bind_param(q, v),
    }
}
