#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use uuid::Uuid;

use stockroom_api::auth::{issue_token, Claims};
use stockroom_api::config::AppConfig;
use stockroom_api::provider::MemoryProvider;
use stockroom_api::{app, AppState};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const CARD_COUNT: usize = 53;

pub struct TestServer {
    pub base_url: String,
    pub provider: MemoryProvider,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<(reqwest::StatusCode, Value)> {
        let res = self.client.get(self.url(path)).send().await?;
        Ok((res.status(), res.json().await.unwrap_or(Value::Null)))
    }

    pub async fn get_as(&self, path: &str, token: &str) -> Result<(reqwest::StatusCode, Value)> {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await?;
        Ok((res.status(), res.json().await.unwrap_or(Value::Null)))
    }

    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> Result<(reqwest::StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        Ok((res.status(), res.json().await.unwrap_or(Value::Null)))
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config
}

/// Serve the router in-process on a free port. The server lives as long as
/// the calling test's runtime.
pub async fn spawn_with(provider: MemoryProvider, config: AppConfig) -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let router = app(AppState::new(config, Arc::new(provider.clone())));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(TestServer { base_url: format!("http://127.0.0.1:{}", port), provider, client: reqwest::Client::new() })
}

pub async fn spawn() -> Result<TestServer> {
    spawn_with(seeded_provider(), test_config()).await
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

pub fn user() -> TestUser {
    let id = Uuid::new_v4();
    let claims = Claims::new(id, Some(format!("{}@example.com", id)), chrono::Duration::minutes(10));
    let token = issue_token(&claims, JWT_SECRET).expect("token");
    TestUser { id, token }
}

pub const WAREHOUSE_MAIN: &str = "wh-main";
pub const WAREHOUSE_NORTH: &str = "wh-north";

/// 53 tally cards split across two warehouses, plus warehouses.
pub fn seeded_provider() -> MemoryProvider {
    MemoryProvider::new()
        .with_rows(
            "warehouses",
            [
                json!({ "id": WAREHOUSE_MAIN, "code": "MAIN", "name": "Main", "is_active": true }),
                json!({ "id": WAREHOUSE_NORTH, "code": "NORTH", "name": "North", "is_active": false }),
            ],
        )
        .with_rows(
            "tcm_tally_cards",
            (1..=CARD_COUNT).map(|i| {
                json!({
                    "id": format!("card-{:03}", i),
                    "card_uid": format!("uid-{:03}", i),
                    "tally_card_number": format!("TC-{:03}", i),
                    "warehouse_id": if i % 2 == 0 { WAREHOUSE_NORTH } else { WAREHOUSE_MAIN },
                    "item_number": 100000 + i,
                    "note": if i == 7 { "damaged bin" } else { "" },
                    "is_active": i % 5 != 0,
                    "snapshot_at": null,
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:00Z"
                })
            }),
        )
        .with_unique("tcm_tally_cards", "tally_card_number")
}

/// Register `user` in the `users` table with a role and warehouses.
pub fn add_user(provider: &MemoryProvider, user: &TestUser, role: &str, warehouses: &[&str]) {
    provider.seed(
        "users",
        [json!({
            "id": Uuid::new_v4().to_string(),
            "auth_id": user.id.to_string(),
            "email": format!("{}@example.com", user.id),
            "full_name": "Test User",
            "role_code": role,
            "warehouse_ids": warehouses,
            "is_active": true
        })],
    );
}
