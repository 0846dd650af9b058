use std::collections::BTreeMap;

use crate::filter::{FilterOrderInfo, SortDirection};
use crate::provider::Row;

use super::projection;
use super::transforms;

/// Domain row → domain row (e.g. normalising a freshly inserted row).
pub type RowFn = fn(Row) -> Row;
/// Client input → row to insert; `Err` carries a client-facing message.
pub type InputFn = fn(Row) -> Result<Row, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: &'static str,
    pub desc: bool,
}

impl SortSpec {
    pub const fn asc(column: &'static str) -> Self {
        Self { column, desc: false }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self { column, desc: true }
    }

    pub fn to_order(&self) -> FilterOrderInfo {
        FilterOrderInfo::new(self.column, if self.desc { SortDirection::Desc } else { SortDirection::Asc })
    }
}

/// How rows are narrowed for a caller when scoping is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowScope {
    /// Only rows whose column is one of the caller's warehouses.
    Warehouse(&'static str),
    /// Only rows the caller owns (column holds the auth user id).
    Owner(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickFilterKind {
    /// `ACTIVE` / `ZERO` stock status, expanded through `status_to_query`.
    StockStatus,
    /// Plain equality on a column.
    Equals(&'static str),
    /// Boolean column; accepts true/false spellings.
    Flag(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickFilter {
    pub id: &'static str,
    pub kind: QuickFilterKind,
}

#[derive(Debug, Clone)]
pub struct ResourceConfig {
    pub table: &'static str,
    /// Comma separated column list, or `*`.
    pub select: &'static str,
    pub pk: &'static str,
    pub default_sort: Option<SortSpec>,
    pub search: &'static [&'static str],
    pub active_column: Option<&'static str>,
    pub scope: Option<RowScope>,
    pub quick_filters: &'static [QuickFilter],
    pub allow_raw: bool,
    pub writable: bool,
    pub to_domain: Option<RowFn>,
    pub from_input: Option<InputFn>,
    pub projection: Option<RowFn>,
}

impl ResourceConfig {
    pub const fn new(table: &'static str, select: &'static str) -> Self {
        Self {
            table,
            select,
            pk: "id",
            default_sort: None,
            search: &[],
            active_column: None,
            scope: None,
            quick_filters: &[],
            allow_raw: false,
            writable: false,
            to_domain: None,
            from_input: None,
            projection: None,
        }
    }

    pub fn select_columns(&self) -> Vec<String> {
        self.select.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect()
    }

    pub fn selects(&self, column: &str) -> bool {
        self.select_columns().iter().any(|c| c == "*" || c == column)
    }
}

/// Resource key → config. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, ResourceConfig>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, key: impl Into<String>, config: ResourceConfig) -> Self {
        self.entries.insert(key.into(), config);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ResourceConfig> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResourceConfig)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn builtin() -> Self {
        Self::new()
            .register(
                "tally_cards",
                ResourceConfig {
                    pk: "id",
                    default_sort: Some(SortSpec::asc("tally_card_number")),
                    search: &["tally_card_number", "item_number", "note"],
                    active_column: Some("is_active"),
                    scope: Some(RowScope::Warehouse("warehouse_id")),
                    quick_filters: &[
                        QuickFilter { id: "warehouse_id", kind: QuickFilterKind::Equals("warehouse_id") },
                        QuickFilter { id: "is_active", kind: QuickFilterKind::Flag("is_active") },
                    ],
                    allow_raw: true,
                    writable: true,
                    from_input: Some(transforms::tally_card_input),
                    to_domain: Some(transforms::tally_card_domain),
                    projection: Some(projection::tally_card_row),
                    ..ResourceConfig::new(
                        "tcm_tally_cards",
                        "id, card_uid, tally_card_number, warehouse_id, item_number, note, is_active, snapshot_at, created_at, updated_at",
                    )
                },
            )
            .register(
                "stock_adjustments",
                ResourceConfig {
                    default_sort: Some(SortSpec::desc("updated_at")),
                    search: &["tally_card_number", "location", "note"],
                    scope: Some(RowScope::Owner("user_id")),
                    quick_filters: &[
                        QuickFilter { id: "status", kind: QuickFilterKind::StockStatus },
                        QuickFilter { id: "reason_code", kind: QuickFilterKind::Equals("reason_code") },
                    ],
                    // Entries are only written through the stock adjustment form.
                    writable: false,
                    to_domain: Some(transforms::stock_adjustment_domain),
                    projection: Some(projection::stock_adjustment_row),
                    ..ResourceConfig::new(
                        "tcm_user_tally_card_entries",
                        "id, user_id, card_uid, tally_card_number, qty, location, note, reason_code, multi_location, created_at, updated_at",
                    )
                },
            )
            .register(
                "stock_adjustment_locations",
                ResourceConfig {
                    default_sort: Some(SortSpec::asc("pos")),
                    quick_filters: &[QuickFilter { id: "entry_id", kind: QuickFilterKind::Equals("entry_id") }],
                    allow_raw: true,
                    ..ResourceConfig::new("tcm_user_tally_card_entry_locations", "id, entry_id, location, qty, pos, created_at")
                },
            )
            .register(
                "inventory",
                ResourceConfig {
                    pk: "item_number",
                    default_sort: Some(SortSpec::asc("item_number")),
                    search: &["item_number", "description"],
                    scope: Some(RowScope::Warehouse("warehouse_id")),
                    quick_filters: &[
                        QuickFilter { id: "status", kind: QuickFilterKind::StockStatus },
                        QuickFilter { id: "warehouse_id", kind: QuickFilterKind::Equals("warehouse_id") },
                    ],
                    allow_raw: true,
                    projection: Some(projection::inventory_row),
                    ..ResourceConfig::new(
                        "v_inventory_current",
                        "item_number, description, warehouse_id, warehouse, qty, unit_cost, on_hand_value, updated_at",
                    )
                },
            )
            .register(
                "warehouses",
                ResourceConfig {
                    default_sort: Some(SortSpec::asc("code")),
                    search: &["code", "name"],
                    active_column: Some("is_active"),
                    allow_raw: true,
                    writable: true,
                    from_input: Some(transforms::warehouse_input),
                    projection: Some(projection::warehouse_row),
                    ..ResourceConfig::new("warehouses", "id, code, name, is_active, created_at, updated_at")
                },
            )
            .register(
                "warehouse_locations",
                ResourceConfig {
                    default_sort: Some(SortSpec::asc("name")),
                    search: &["name"],
                    active_column: Some("is_active"),
                    scope: Some(RowScope::Warehouse("warehouse_id")),
                    quick_filters: &[QuickFilter { id: "warehouse_id", kind: QuickFilterKind::Equals("warehouse_id") }],
                    allow_raw: true,
                    writable: true,
                    ..ResourceConfig::new("warehouse_locations", "id, warehouse_id, name, is_active, created_at, updated_at")
                },
            )
            .register(
                "purchase_orders",
                ResourceConfig {
                    default_sort: Some(SortSpec::desc("created_at")),
                    search: &["order_number", "supplier_name"],
                    scope: Some(RowScope::Warehouse("warehouse_id")),
                    quick_filters: &[
                        QuickFilter { id: "order_status", kind: QuickFilterKind::Equals("order_status") },
                        QuickFilter { id: "warehouse_id", kind: QuickFilterKind::Equals("warehouse_id") },
                    ],
                    writable: true,
                    from_input: Some(transforms::purchase_order_input),
                    projection: Some(projection::purchase_order_row),
                    ..ResourceConfig::new(
                        "purchase_orders",
                        "id, order_number, supplier_name, order_status, warehouse_id, expected_at, total_amount, created_by, created_at, updated_at",
                    )
                },
            )
            .register(
                "requisitions",
                ResourceConfig {
                    default_sort: Some(SortSpec::desc("created_at")),
                    search: &["requisition_number", "note"],
                    scope: Some(RowScope::Warehouse("warehouse_id")),
                    quick_filters: &[
                        QuickFilter { id: "requisition_status", kind: QuickFilterKind::Equals("requisition_status") },
                        QuickFilter { id: "warehouse_id", kind: QuickFilterKind::Equals("warehouse_id") },
                    ],
                    writable: true,
                    from_input: Some(transforms::requisition_input),
                    projection: Some(projection::requisition_row),
                    ..ResourceConfig::new(
                        "requisitions",
                        "id, requisition_number, requested_by, requisition_status, warehouse_id, needed_by, note, created_at, updated_at",
                    )
                },
            )
            .register(
                "users",
                ResourceConfig {
                    default_sort: Some(SortSpec::asc("email")),
                    search: &["email", "full_name"],
                    active_column: Some("is_active"),
                    quick_filters: &[QuickFilter { id: "role_code", kind: QuickFilterKind::Equals("role_code") }],
                    projection: Some(projection::user_row),
                    ..ResourceConfig::new("users", "id, auth_id, email, full_name, role_code, warehouse_ids, is_active, created_at")
                },
            )
            .register(
                "roles",
                ResourceConfig {
                    default_sort: Some(SortSpec::asc("role_code")),
                    allow_raw: true,
                    ..ResourceConfig::new("roles", "id, role_code, role_name")
                },
            )
    }
}
