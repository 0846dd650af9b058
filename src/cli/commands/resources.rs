use serde::Serialize;

use crate::cli::utils::{output, render_table};
use crate::cli::OutputFormat;
use crate::config::{AppConfig, CONFIG};
use crate::resources::{Registry, RowScope};

#[derive(Debug, Serialize)]
pub struct ResourceSummary {
    pub key: String,
    pub table: &'static str,
    pub pk: &'static str,
    pub scope: Option<String>,
    pub allow_raw: bool,
    pub writable: bool,
    pub quick_filters: Vec<&'static str>,
}

pub fn summarize(registry: &Registry) -> Vec<ResourceSummary> {
    registry
        .iter()
        .map(|(key, config)| ResourceSummary {
            key: key.clone(),
            table: config.table,
            pk: config.pk,
            scope: config.scope.map(|s| match s {
                RowScope::Warehouse(col) => format!("warehouse:{}", col),
                RowScope::Owner(col) => format!("owner:{}", col),
            }),
            allow_raw: config.allow_raw,
            writable: config.writable,
            quick_filters: config.quick_filters.iter().map(|q| q.id).collect(),
        })
        .collect()
}

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let summaries = summarize(&Registry::builtin());
    output(output_format, &summaries, || {
        let rows: Vec<Vec<String>> = summaries
            .iter()
            .map(|s| {
                vec![
                    s.key.clone(),
                    s.table.to_string(),
                    s.scope.clone().unwrap_or_else(|| "-".into()),
                    if s.allow_raw { "yes" } else { "no" }.to_string(),
                    if s.writable { "yes" } else { "no" }.to_string(),
                    s.quick_filters.join(","),
                ]
            })
            .collect();
        render_table(&["resource", "table", "scope", "raw", "writable", "quick filters"], &rows)
    })
}

pub fn show_config(output_format: OutputFormat) -> anyhow::Result<()> {
    let config: &AppConfig = &CONFIG;
    output(output_format, config, || {
        format!(
            "environment: {:?}\nport: {}\ndatabase: {}\npage size: {} (max {})\nscoping: {}\nscd2 function: {}",
            config.environment,
            config.server.port,
            if config.database.url.is_some() { "configured" } else { "not set" },
            config.list.default_page_size,
            config.list.max_page_size,
            config.auth.scoping_enabled,
            config.features.scd2_patch_function(),
        )
    })
}
