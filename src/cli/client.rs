use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::StatusCode;
use serde_json::Value;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin JSON client for a running API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), token })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path`, returning the status and JSON body. Error bodies are
    /// returned too; callers decide what a non-2xx means.
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> anyhow::Result<(StatusCode, Value)> {
        let mut request = self.http.get(self.url(path)).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.with_context(|| format!("request to {} failed", self.url(path)))?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }
}

/// `{ error: { message } }` from an API error body, or the status text.
pub fn error_message(status: StatusCode, body: &Value) -> anyhow::Error {
    let message = body["error"]["message"].as_str().unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"));
    anyhow!("{} ({})", message, status.as_u16())
}
