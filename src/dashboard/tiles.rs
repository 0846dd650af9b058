use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Placeholder in filter templates that is replaced with the clicked tile's key.
pub const KEY_PLACEHOLDER: &str = "__KEY__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub column: String,
    pub op: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterTemplate {
    Clause(FilterClause),
    And(Vec<FilterTemplate>),
    Or(Vec<FilterTemplate>),
}

fn substitute_value(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace(KEY_PLACEHOLDER, key)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute_value(v, key)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), substitute_value(v, key))).collect()),
        other => other.clone(),
    }
}

impl FilterTemplate {
    /// A new tree with every placeholder replaced by `key`.
    pub fn substitute(&self, key: &str) -> FilterTemplate {
        match self {
            FilterTemplate::Clause(c) => FilterTemplate::Clause(FilterClause {
                column: c.column.replace(KEY_PLACEHOLDER, key),
                op: c.op.clone(),
                value: substitute_value(&c.value, key),
            }),
            FilterTemplate::And(children) => FilterTemplate::And(children.iter().map(|c| c.substitute(key)).collect()),
            FilterTemplate::Or(children) => FilterTemplate::Or(children.iter().map(|c| c.substitute(key)).collect()),
        }
    }

    /// Flatten into AND and OR clause lists. Clauses under an `Or` anywhere
    /// in the tree land in the OR list.
    pub fn split(&self) -> FilterChange {
        let mut change = FilterChange::default();
        self.collect(false, &mut change);
        change
    }

    fn collect(&self, in_or: bool, change: &mut FilterChange) {
        match self {
            FilterTemplate::Clause(c) if in_or => change.or.push(c.clone()),
            FilterTemplate::Clause(c) => change.and.push(c.clone()),
            FilterTemplate::And(children) => children.iter().for_each(|c| c.collect(in_or, change)),
            FilterTemplate::Or(children) => children.iter().for_each(|c| c.collect(true, change)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterChange {
    pub and: Vec<FilterClause>,
    pub or: Vec<FilterClause>,
}

impl FilterChange {
    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty()
    }

    /// `{ "and": [...], "or": [...] }` as the inventory RPC expects its `_filter`.
    pub fn to_json(&self) -> Value {
        json!({ "and": self.and, "or": self.or })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardTile {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub rpc_name: Option<String>,
    #[serde(default)]
    pub filter: Option<FilterTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardWidget {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub rpc_name: Option<String>,
    #[serde(default)]
    pub filter: Option<FilterTemplate>,
    #[serde(default)]
    pub tiles: Vec<DashboardTile>,
}

/// What a tile click resolves to after widget inheritance and substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct TileAction {
    pub tile_key: String,
    pub rpc_name: Option<String>,
    pub filter: Option<FilterChange>,
}

pub type ClickHandler = Arc<dyn Fn(&TileAction) + Send + Sync>;
pub type FilterHandler = Arc<dyn Fn(&FilterChange) + Send + Sync>;

/// A tile with its click behaviour bound. Tiles without an RPC or filter
/// (on themselves or their widget) are not clickable.
#[derive(Clone)]
pub struct BoundTile {
    pub tile: DashboardTile,
    action: Option<TileAction>,
    on_click: Option<ClickHandler>,
    on_filter_change: Option<FilterHandler>,
}

impl std::fmt::Debug for BoundTile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundTile").field("tile", &self.tile).field("action", &self.action).finish()
    }
}

impl BoundTile {
    pub fn is_clickable(&self) -> bool {
        self.action.is_some()
    }

    pub fn action(&self) -> Option<&TileAction> {
        self.action.as_ref()
    }

    /// Fire the bound callbacks. Returns false for a non-clickable tile.
    pub fn click(&self) -> bool {
        let Some(action) = &self.action else { return false };
        if let Some(on_click) = &self.on_click {
            on_click(action);
        }
        if let (Some(change), Some(on_filter_change)) = (&action.filter, &self.on_filter_change) {
            on_filter_change(change);
        }
        true
    }
}

fn resolve_action(tile: &DashboardTile, widget: &DashboardWidget) -> Option<TileAction> {
    let rpc_name = tile.rpc_name.clone().or_else(|| widget.rpc_name.clone());
    let template = tile.filter.as_ref().or(widget.filter.as_ref());
    if rpc_name.is_none() && template.is_none() {
        return None;
    }
    let filter = template.map(|t| t.substitute(&tile.key).split()).filter(|c| !c.is_empty());
    Some(TileAction { tile_key: tile.key.clone(), rpc_name, filter })
}

pub fn attach_tile_actions(
    tiles: Vec<DashboardTile>,
    widget: &DashboardWidget,
    on_click: Option<ClickHandler>,
    on_filter_change: Option<FilterHandler>,
) -> Vec<BoundTile> {
    tiles
        .into_iter()
        .map(|tile| BoundTile {
            action: resolve_action(&tile, widget),
            tile,
            on_click: on_click.clone(),
            on_filter_change: on_filter_change.clone(),
        })
        .collect()
}

/// Stock status tiles shown above the inventory table. Each tile filters the
/// table by its own key through the widget's template.
pub fn inventory_status_widget() -> DashboardWidget {
    DashboardWidget {
        key: "inventory_status".into(),
        title: "Inventory".into(),
        rpc_name: Some("get_inventory_rows".into()),
        filter: Some(FilterTemplate::Clause(FilterClause {
            column: "status".into(),
            op: "eq".into(),
            value: Value::String(KEY_PLACEHOLDER.into()),
        })),
        tiles: vec![
            DashboardTile { key: "ACTIVE".into(), title: "In stock".into(), ..Default::default() },
            DashboardTile { key: "ZERO".into(), title: "Zero stock".into(), ..Default::default() },
        ],
    }
}
