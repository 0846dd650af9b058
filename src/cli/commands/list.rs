use clap::Args;
use serde_json::Value;

use crate::cli::client::{error_message, ApiClient};
use crate::cli::utils::{cell, output, render_table};
use crate::cli::OutputFormat;
use crate::resources::validate_resource_key;

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(help = "Resource key, e.g. tally_cards")]
    pub resource: String,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long = "page-size")]
    pub page_size: Option<u32>,

    #[arg(short, long, help = "Search text")]
    pub q: Option<String>,

    #[arg(long, help = "Only active rows")]
    pub active_only: bool,

    #[arg(long, help = "Domain rows instead of the list projection")]
    pub raw: bool,

    #[arg(long, help = "Quick filter as key=value; repeatable")]
    pub filter: Vec<String>,
}

impl ListArgs {
    pub fn query(&self) -> anyhow::Result<Vec<(String, String)>> {
        let mut query = vec![("page".to_string(), self.page.to_string())];
        if let Some(size) = self.page_size {
            query.push(("pageSize".into(), size.to_string()));
        }
        if let Some(q) = &self.q {
            query.push(("q".into(), q.clone()));
        }
        if self.active_only {
            query.push(("activeOnly".into(), "true".into()));
        }
        if self.raw {
            query.push(("raw".into(), "true".into()));
        }
        for filter in &self.filter {
            let (key, value) = filter
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("filter must look like key=value, got '{}'", filter))?;
            query.push((key.trim().to_string(), value.trim().to_string()));
        }
        Ok(query)
    }
}

pub async fn handle(client: &ApiClient, args: ListArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    validate_resource_key(&args.resource)?;
    let (status, body) = client.get(&format!("/api/{}", args.resource), &args.query()?).await?;
    if !status.is_success() {
        return Err(error_message(status, &body));
    }

    output(output_format, &body, || {
        let rows = body["rows"].as_array().cloned().unwrap_or_default();
        let headers: Vec<String> = rows
            .first()
            .and_then(Value::as_object)
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|r| headers.iter().map(|h| cell(&r[h.as_str()])).collect())
            .collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        format!(
            "{}\n\n{} of {} rows (page {}, page size {})",
            render_table(&header_refs, &cells),
            rows.len(),
            body["total"],
            body["page"],
            body["pageSize"]
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(filter: &[&str]) -> ListArgs {
        ListArgs {
            resource: "inventory".into(),
            page: 2,
            page_size: Some(20),
            q: None,
            active_only: true,
            raw: false,
            filter: filter.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn builds_query_pairs() {
        let query = args(&["status=ACTIVE"]).query().unwrap();
        assert!(query.contains(&("page".into(), "2".into())));
        assert!(query.contains(&("pageSize".into(), "20".into())));
        assert!(query.contains(&("activeOnly".into(), "true".into())));
        assert!(query.contains(&("status".into(), "ACTIVE".into())));
    }

    #[test]
    fn rejects_malformed_filters() {
        assert!(args(&["status"]).query().is_err());
    }
}
