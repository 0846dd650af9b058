use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::params::ListQuery;
use super::status::{quick_params_to_where, status_to_query};
use crate::filter::FilterData;
use crate::resources::{QuickFilterKind, ResolvedResource};

fn quick_filter_conditions(resource: &ResolvedResource, filters: &BTreeMap<String, String>) -> Vec<Value> {
    let mut conditions = Vec::new();
    for quick in resource.config.quick_filters {
        let Some(value) = filters.get(quick.id) else { continue };
        match quick.kind {
            QuickFilterKind::StockStatus => conditions.extend(quick_params_to_where(&status_to_query(value))),
            QuickFilterKind::Equals(column) => conditions.push(json!({ column: value })),
            QuickFilterKind::Flag(column) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => conditions.push(json!({ column: true })),
                "false" | "0" | "no" => conditions.push(json!({ column: false })),
                _ => {}
            },
        }
    }
    conditions
}

fn search_condition(resource: &ResolvedResource, q: &str) -> Option<Value> {
    let columns = resource.config.search;
    if columns.is_empty() {
        return None;
    }
    let pattern = format!("%{}%", q);
    let any: Vec<Value> = columns.iter().map(|c| json!({ *c: { "$ilike": pattern } })).collect();
    Some(json!({ "$or": any }))
}

/// Sort requested by the client when it names a selected column, else the
/// resource default. The pk is appended so page boundaries are stable.
fn order_for(resource: &ResolvedResource, query: &ListQuery) -> Value {
    let config = &resource.config;
    let mut order = Vec::new();
    match query.sort.as_deref().filter(|s| config.selects(s) && crate::filter::validate_identifier(s).is_ok()) {
        Some(column) => order.push(format!("{} {}", column, if query.desc { "desc" } else { "asc" })),
        None => {
            if let Some(sort) = config.default_sort {
                order.push(format!("{} {}", sort.column, if sort.desc { "desc" } else { "asc" }));
            }
        }
    }
    if !order.iter().any(|o| o.split_whitespace().next() == Some(config.pk)) {
        order.push(format!("{} asc", config.pk));
    }
    json!(order)
}

/// Everything the provider needs for one list page: columns, where-tree
/// (search, active-only, quick filters, caller scope), order and window.
pub fn build_list_filter(resource: &ResolvedResource, query: &ListQuery, scope: Option<Value>) -> FilterData {
    let config = &resource.config;
    let mut conditions = Vec::new();

    if let Some(search) = query.q.as_deref().and_then(|q| search_condition(resource, q)) {
        conditions.push(search);
    }
    if query.active_only {
        if let Some(column) = config.active_column {
            conditions.push(json!({ column: true }));
        }
    }
    conditions.extend(quick_filter_conditions(resource, &query.filters));
    conditions.extend(scope);

    FilterData {
        select: Some(config.select_columns()),
        where_clause: (!conditions.is_empty()).then(|| json!({ "$and": conditions })),
        order: Some(order_for(resource, query)),
        limit: Some(query.page_size as i64),
        offset: Some(query.offset()),
    }
}
