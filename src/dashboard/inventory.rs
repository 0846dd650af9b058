use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{Map, Value};

use super::tiles::{attach_tile_actions, inventory_status_widget, FilterChange, FilterHandler};
use crate::config::MAX_PAGE_SIZE;
use crate::list::params::first_value;
use crate::provider::{DataError, DataProvider, RpcArg, RpcReturns};

pub const INVENTORY_RPC: &str = "get_inventory_rows";
pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryQuery {
    pub page: u32,
    pub page_size: u32,
    pub filter: Value,
    pub distinct: bool,
}

impl InventoryQuery {
    /// Reads `page`, `pageSize`, `filter` (a JSON object), `distinct` and `tile`.
    /// A status tile key contributes its filter under `tile`.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, String> {
        let page = first_value(pairs, "page")
            .and_then(|p| p.parse::<i64>().ok())
            .map(|p| p.clamp(1, u32::MAX as i64) as u32)
            .unwrap_or(1);
        let page_size = first_value(pairs, "pageSize")
            .and_then(|p| p.parse::<i64>().ok())
            .map(|p| p.clamp(1, MAX_PAGE_SIZE as i64) as u32)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let mut filter = match first_value(pairs, "filter") {
            None => Map::new(),
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err("filter must be a JSON object".into()),
                Err(e) => return Err(format!("Invalid filter JSON: {}", e)),
            },
        };
        if let Some(tile) = first_value(pairs, "tile") {
            let change = tile_filter(tile).ok_or_else(|| format!("Unknown tile: {}", tile))?;
            filter.insert("tile".into(), change.to_json());
        }

        let distinct = matches!(first_value(pairs, "distinct"), Some("true" | "1"));
        Ok(Self { page, page_size, filter: Value::Object(filter), distinct })
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

/// The filter a click on the inventory status tile `key` produces.
pub fn tile_filter(key: &str) -> Option<FilterChange> {
    let widget = inventory_status_widget();
    let captured: Arc<Mutex<Option<FilterChange>>> = Arc::default();
    let sink = captured.clone();
    let on_filter: FilterHandler = Arc::new(move |change: &FilterChange| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(change.clone());
        }
    });

    let tiles = widget.tiles.iter().filter(|t| t.key == key).cloned().collect();
    let bound = attach_tile_actions(tiles, &widget, None, Some(on_filter));
    if !bound.first()?.click() {
        return None;
    }
    let change = captured.lock().ok().and_then(|mut slot| slot.take());
    change
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryPage {
    pub rows: Vec<Value>,
    pub total: i64,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

/// The RPC reports no count, so `total` is the offset plus the rows on
/// this page: exact on the last page, a lower bound before it.
pub async fn get_inventory_rows(provider: &dyn DataProvider, query: &InventoryQuery) -> Result<InventoryPage, DataError> {
    let offset = query.offset();
    let range_to = offset + query.page_size as i64 - 1;
    let result = provider
        .rpc(
            INVENTORY_RPC,
            vec![
                RpcArg::new("_filter", query.filter.clone()).cast("jsonb"),
                RpcArg::new("_distinct", query.distinct).cast("boolean"),
                RpcArg::new("_range_from", offset).cast("integer"),
                RpcArg::new("_range_to", range_to).cast("integer"),
            ],
            RpcReturns::Set,
        )
        .await?;

    let rows = match result {
        Value::Array(rows) => rows,
        Value::Null => vec![],
        other => return Err(DataError::Internal(format!("{} returned a non-array result: {}", INVENTORY_RPC, other))),
    };
    Ok(InventoryPage { total: offset + rows.len() as i64, rows, page: query.page, page_size: query.page_size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn provider() -> MemoryProvider {
        MemoryProvider::new().with_rpc(INVENTORY_RPC, |args| {
            let from = args["_range_from"].as_i64().unwrap_or(0);
            let to = args["_range_to"].as_i64().unwrap_or(0).min(29);
            Ok(Value::Array((from..=to).map(|i| json!({ "item_number": i })).collect()))
        })
    }

    #[tokio::test]
    async fn total_is_offset_plus_page_rows() {
        let provider = provider();
        let query = InventoryQuery::from_pairs(&pairs(&[("page", "2"), ("pageSize", "20")])).unwrap();
        let page = get_inventory_rows(&provider, &query).await.unwrap();
        assert_eq!(page.rows.len(), 10);
        assert_eq!(page.total, 30);

        let first = InventoryQuery::from_pairs(&pairs(&[("pageSize", "20")])).unwrap();
        assert_eq!(get_inventory_rows(&provider, &first).await.unwrap().total, 20);
    }

    #[test]
    fn filter_must_be_a_json_object() {
        assert!(InventoryQuery::from_pairs(&pairs(&[("filter", "{nope")])).is_err());
        assert!(InventoryQuery::from_pairs(&pairs(&[("filter", "[1]")])).is_err());
        let q = InventoryQuery::from_pairs(&pairs(&[("filter", r#"{"warehouse":"MAIN"}"#), ("distinct", "true")])).unwrap();
        assert_eq!(q.filter["warehouse"], "MAIN");
        assert!(q.distinct);
    }

    #[test]
    fn page_is_clamped_not_truncated() {
        let q = InventoryQuery::from_pairs(&pairs(&[("page", "4294967297")])).unwrap();
        assert_eq!(q.page, u32::MAX);
        assert!(q.offset() > 0);
        assert_eq!(InventoryQuery::from_pairs(&pairs(&[("page", "-3")])).unwrap().page, 1);
        assert_eq!(InventoryQuery::from_pairs(&pairs(&[("page", "x")])).unwrap().page, 1);
    }

    #[test]
    fn status_tile_adds_its_filter() {
        let q = InventoryQuery::from_pairs(&pairs(&[("tile", "ACTIVE")])).unwrap();
        assert_eq!(q.filter["tile"]["and"][0]["value"], "ACTIVE");
        assert!(InventoryQuery::from_pairs(&pairs(&[("tile", "BOGUS")])).is_err());
    }
}
