use thiserror::Error;

use super::registry::{Registry, ResourceConfig, RowFn};

pub const MAX_RESOURCE_KEY_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{0}")]
    InvalidKey(String),
    #[error("Unknown resource: {0}")]
    NotFound(String),
    /// Registered, but missing a table or column list.
    #[error("Unknown resource: {0} (misconfigured)")]
    Misconfigured(String),
}

/// A registry entry plus what the list pipeline needs from it.
#[derive(Debug, Clone)]
pub struct ResolvedResource {
    pub key: String,
    pub config: ResourceConfig,
    pub to_row: Option<RowFn>,
    pub allow_raw: bool,
}

impl ResolvedResource {
    pub fn table(&self) -> &'static str {
        self.config.table
    }

    /// Apply the list projection unless the caller asked for raw rows.
    pub fn present(&self, row: crate::provider::Row, raw: bool) -> crate::provider::Row {
        match (self.to_row, raw) {
            (Some(project), false) => project(row),
            _ => row,
        }
    }
}

pub fn validate_resource_key(key: &str) -> Result<(), ResolveError> {
    if key.trim().is_empty() {
        return Err(ResolveError::InvalidKey("Resource key must not be empty".into()));
    }
    if key.len() > MAX_RESOURCE_KEY_LEN {
        return Err(ResolveError::InvalidKey(format!(
            "Resource key exceeds {} characters",
            MAX_RESOURCE_KEY_LEN
        )));
    }
    Ok(())
}

/// `stock-adjustments` and `stock_adjustments` name the same resource.
pub fn canonical_key(key: &str) -> String {
    key.trim().replace('-', "_")
}

pub fn resolve_resource(registry: &Registry, key: &str) -> Result<ResolvedResource, ResolveError> {
    validate_resource_key(key)?;
    let canonical = canonical_key(key);
    let config = registry.get(&canonical).ok_or_else(|| ResolveError::NotFound(key.to_string()))?;
    if config.table.trim().is_empty() || config.select.trim().is_empty() {
        return Err(ResolveError::Misconfigured(key.to_string()));
    }
    Ok(ResolvedResource {
        key: canonical,
        to_row: config.projection,
        allow_raw: config.allow_raw,
        config: config.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_key_in_either_case() {
        let registry = Registry::builtin();
        let resolved = resolve_resource(&registry, "tally-cards").unwrap();
        assert_eq!(resolved.key, "tally_cards");
        assert_eq!(resolved.table(), "tcm_tally_cards");
        assert!(resolved.allow_raw);
        assert!(resolved.to_row.is_some());
    }

    #[test]
    fn unknown_key_names_the_resource() {
        let err = resolve_resource(&Registry::builtin(), "nope").unwrap_err();
        assert_eq!(err, ResolveError::NotFound("nope".into()));
        assert_eq!(err.to_string(), "Unknown resource: nope");
    }

    #[test]
    fn key_length_and_emptiness_validated() {
        assert!(matches!(validate_resource_key(""), Err(ResolveError::InvalidKey(_))));
        assert!(matches!(validate_resource_key(&"x".repeat(65)), Err(ResolveError::InvalidKey(_))));
        assert!(validate_resource_key(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn missing_table_is_misconfigured() {
        let registry = Registry::new().register("broken", ResourceConfig::new("", "id"));
        assert!(matches!(resolve_resource(&registry, "broken"), Err(ResolveError::Misconfigured(_))));
    }
}
