mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use stockroom_api::auth::{issue_token, Claims};

#[tokio::test]
async fn role_reflects_the_users_row() -> Result<()> {
    let server = common::spawn().await?;
    let admin = common::user();
    let stranger = common::user();
    common::add_user(&server.provider, &admin, "admin", &[common::WAREHOUSE_MAIN, common::WAREHOUSE_NORTH]);

    let (status, body) = server.get_as("/api/me/role", &admin.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["user_id"], admin.id.to_string());
    assert_eq!(body["warehouse_ids"], json!([common::WAREHOUSE_MAIN, common::WAREHOUSE_NORTH]));

    let (status, body) = server.get_as("/api/me/role", &stranger.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], Value::Null);
    assert_eq!(body["is_admin"], false);

    let (status, _) = server.get("/api/me/role").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn permissions_are_sorted_and_unique() -> Result<()> {
    let server = common::spawn().await?;
    let user = common::user();
    let uid = user.id.to_string();
    server.provider.seed(
        "mv_effective_permissions",
        [
            json!({ "user_id": uid, "permission_key": "tally_cards.write" }),
            json!({ "user_id": uid, "permission_key": "inventory.read" }),
            json!({ "user_id": uid, "permission_key": "tally_cards.write" }),
            json!({ "user_id": "someone-else", "permission_key": "admin.all" }),
        ],
    );

    let (status, body) = server.get_as("/api/me/permissions", &user.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permissions"], json!(["inventory.read", "tally_cards.write"]));
    Ok(())
}

#[tokio::test]
async fn bad_tokens_are_rejected() -> Result<()> {
    let server = common::spawn().await?;

    let (status, body) = server.get_as("/api/tally_cards", "not-a-jwt").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let forged = issue_token(&Claims::new(uuid::Uuid::new_v4(), None, chrono::Duration::minutes(5)), "other-secret")?;
    let (status, _) = server.get_as("/api/tally_cards", &forged).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = issue_token(
        &Claims::new(uuid::Uuid::new_v4(), None, chrono::Duration::minutes(-10)),
        common::JWT_SECRET,
    )?;
    let (status, _) = server.get_as("/api/tally_cards", &expired).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/api/tally_cards"))
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn admin_endpoints_need_an_admin_role() -> Result<()> {
    let provider = common::seeded_provider()
        .with_rows(
            "mv_table_report_combined",
            [
                json!({ "table_name": "warehouses", "has_docs": true }),
                json!({ "table_name": "tcm_tally_cards", "has_docs": false }),
            ],
        )
        .with_rpc("admin_get_user", |args| {
            Ok(json!({ "id": args["_user_id"], "email": "found@example.com", "auth_id": "hidden" }))
        });
    let server = common::spawn_with(provider, common::test_config()).await?;
    let admin = common::user();
    let staff = common::user();
    common::add_user(&server.provider, &admin, "owner", &[]);
    common::add_user(&server.provider, &staff, "staff", &[common::WAREHOUSE_MAIN]);

    let (status, body) = server.get_as("/api/admin/users", &staff.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "Admin access required");

    let (status, body) = server.get_as("/api/admin/users", &admin.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert!(body["rows"].as_array().unwrap().iter().all(|r| r.get("auth_id").is_none()));

    let (status, body) = server.get_as("/api/admin/users?id=abc", &admin.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["row"]["email"], "found@example.com");

    let (status, body) = server.get_as("/api/admin/table-docs-health", &admin.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["undocumented"], 1);
    assert_eq!(body["tables"][0]["table_name"], "tcm_tally_cards");
    Ok(())
}

#[tokio::test]
async fn scoped_lists_follow_warehouse_access() -> Result<()> {
    let provider = common::seeded_provider();
    let staff = common::user();
    let admin = common::user();
    common::add_user(&provider, &staff, "staff", &[common::WAREHOUSE_MAIN]);
    common::add_user(&provider, &admin, "admin", &[]);
    let mut config = common::test_config();
    config.auth.scoping_enabled = true;
    let server = common::spawn_with(provider, config).await?;

    let (status, _) = server.get("/api/tally_cards").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = server.get_as("/api/tally_cards", &staff.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 27);

    let (_, body) = server.get_as("/api/tally_cards", &admin.token).await?;
    assert_eq!(body["total"], common::CARD_COUNT);

    // card-002 lives in the north warehouse.
    let (status, _) = server.get_as("/api/tally_cards/card-002", &staff.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server.get_as("/api/tally_cards/card-001", &staff.token).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .send(Method::DELETE, "/api/tally_cards/bulk", Some(&staff.token), json!({ "ids": ["card-002", "card-003"] }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);
    let remaining: Vec<String> = server
        .provider
        .rows("tcm_tally_cards")
        .iter()
        .filter_map(|r| r["id"].as_str().map(str::to_string))
        .collect();
    assert!(remaining.contains(&"card-002".to_string()));
    assert!(!remaining.contains(&"card-003".to_string()));
    Ok(())
}

#[tokio::test]
async fn scoped_writes_need_a_session_and_warehouse_access() -> Result<()> {
    let provider = common::seeded_provider()
        .with_rpc("fn_tcm_tally_cards_patch_scd2_v3", |args| {
            let mut row = json!({ "id": format!("{}-v2", args["_id"].as_str().unwrap_or_default()) });
            if let (Some(target), Some(patch)) = (row.as_object_mut(), args["_patch"].as_object()) {
                target.extend(patch.clone());
            }
            Ok(row)
        })
        .with_rpc("get_inventory_rows", |_| Ok(json!([])));
    let staff = common::user();
    let admin = common::user();
    common::add_user(&provider, &staff, "staff", &[common::WAREHOUSE_MAIN]);
    common::add_user(&provider, &admin, "admin", &[]);
    let mut config = common::test_config();
    config.auth.scoping_enabled = true;
    let server = common::spawn_with(provider, config).await?;
    let card = |number: &str, warehouse: &str| json!({ "tally_card_number": number, "warehouse_id": warehouse });

    let (status, _) = server.send(Method::POST, "/api/tally_cards", None, card("TC-801", common::WAREHOUSE_MAIN)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = server
        .send(Method::POST, "/api/tally_cards", Some(&staff.token), card("TC-802", common::WAREHOUSE_NORTH))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], format!("No access to warehouse {}", common::WAREHOUSE_NORTH));
    assert_eq!(server.provider.rows("tcm_tally_cards").len(), common::CARD_COUNT);

    let (status, _) = server
        .send(Method::POST, "/api/tally_cards", Some(&staff.token), card("TC-803", common::WAREHOUSE_MAIN))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = server
        .send(Method::POST, "/api/tally_cards", Some(&admin.token), card("TC-804", common::WAREHOUSE_NORTH))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let scd2 = |id: &str| format!("/api/tally-cards/{}/actions/patch-scd2", id);
    let (status, _) = server.send(Method::POST, &scd2("card-001"), None, json!({ "note": "x" })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // card-002 lives in the north warehouse.
    let (status, _) = server.send(Method::POST, &scd2("card-002"), Some(&staff.token), json!({ "note": "x" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server
        .send(Method::POST, &scd2("card-001"), Some(&staff.token), json!({ "warehouse_id": common::WAREHOUSE_NORTH }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = server.send(Method::POST, &scd2("card-001"), Some(&staff.token), json!({ "note": "x" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["row"]["id"], "card-001-v2");

    let (status, _) = server.get("/api/dashboard-inventory").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = server.get_as("/api/dashboard-inventory", &staff.token).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
