use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};

use super::AuthUser;
use crate::filter::filter_match::text_of;
use crate::filter::FilterData;
use crate::provider::{DataError, DataProvider};
use crate::resources::RowScope;

pub const USERS_TABLE: &str = "users";
pub const PERMISSIONS_VIEW: &str = "mv_effective_permissions";
const ADMIN_ROLES: &[&str] = &["admin", "owner"];

/// Role and warehouse access of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserScope {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub warehouse_ids: Vec<String>,
    pub is_admin: bool,
}

impl UserScope {
    /// Looks the caller up in `users` by `auth_id`. A caller with no row has
    /// no role and no warehouses.
    pub async fn load(provider: &dyn DataProvider, user: &AuthUser) -> Result<Self, DataError> {
        let filter = FilterData {
            select: Some(vec!["email".into(), "role_code".into(), "warehouse_ids".into()]),
            where_clause: Some(json!({ "auth_id": user.user_id.to_string() })),
            limit: Some(1),
            ..Default::default()
        };
        let row = provider.select(USERS_TABLE, filter, false).await?.rows.into_iter().next();

        let role = row.as_ref().and_then(|r| r.get("role_code")).and_then(Value::as_str).map(str::to_string);
        let warehouse_ids = row
            .as_ref()
            .and_then(|r| r.get("warehouse_ids"))
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter(|v| !v.is_null()).map(text_of).collect())
            .unwrap_or_default();
        let email = row
            .as_ref()
            .and_then(|r| r.get("email"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| user.email.clone());

        Ok(Self {
            user_id: user.user_id.to_string(),
            email,
            is_admin: role.as_deref().map(|r| ADMIN_ROLES.contains(&r)).unwrap_or(false),
            role,
            warehouse_ids,
        })
    }
}

/// Where-clause restricting a resource to what the caller may see. Admins
/// see everything; `None` also means the resource is unscoped.
pub fn scope_condition(scope: Option<RowScope>, user: &UserScope) -> Option<Value> {
    if user.is_admin {
        return None;
    }
    match scope? {
        RowScope::Warehouse(column) => Some(json!({ column: { "$in": user.warehouse_ids } })),
        RowScope::Owner(column) => Some(json!({ column: user.user_id })),
    }
}

/// Effective permission keys for the caller, sorted and de-duplicated.
pub async fn load_permissions(provider: &dyn DataProvider, user: &AuthUser) -> Result<Vec<String>, DataError> {
    let filter = FilterData {
        select: Some(vec!["permission_key".into()]),
        where_clause: Some(json!({ "user_id": user.user_id.to_string() })),
        ..Default::default()
    };
    let page = provider.select(PERMISSIONS_VIEW, filter, false).await?;
    let keys: BTreeSet<String> = page
        .rows
        .iter()
        .filter_map(|r| r.get("permission_key").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    Ok(keys.into_iter().collect())
}
