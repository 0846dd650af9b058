mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

const ENTRIES: &str = "tcm_user_tally_card_entries";
const ENTRY_LOCATIONS: &str = "tcm_user_tally_card_entry_locations";

#[tokio::test]
async fn multi_location_adjustment_writes_entry_and_locations() -> Result<()> {
    let server = common::spawn().await?;
    let user = common::user();

    let (status, body) = server
        .send(
            Method::POST,
            "/api/forms/stock-adjustments",
            Some(&user.token),
            json!({
                "tally_card_number": " tc-001 ",
                "multi_location": true,
                "locations": [
                    { "location": "B1", "qty": "2", "pos": 1 },
                    { "location": "  ", "qty": 9 },
                    { "location": "A1", "qty": 3, "pos": 0 }
                ],
                "user_id": "someone-else"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["row"]["tally_card_number"], "TC-001");
    assert_eq!(body["row"]["qty"], 5);
    assert_eq!(body["row"]["user_id"], user.id.to_string());

    let locations = body["locations"].as_array().unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0]["location"], "A1");
    assert_eq!(locations[0]["pos"], 0);
    assert_eq!(locations[1]["location"], "B1");
    assert_eq!(locations[1]["pos"], 1);
    assert_eq!(locations[0]["entry_id"], body["row"]["id"]);

    assert_eq!(server.provider.rows(ENTRIES).len(), 1);
    assert_eq!(server.provider.rows(ENTRY_LOCATIONS).len(), 2);
    Ok(())
}

#[tokio::test]
async fn single_location_adjustment_requires_whole_qty() -> Result<()> {
    let server = common::spawn().await?;
    let user = common::user();

    let (status, body) = server
        .send(
            Method::POST,
            "/api/forms/stock-adjustments",
            Some(&user.token),
            json!({ "tally_card_number": "TC-002", "qty": "-4", "location": "C3" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["row"]["qty"], -4);
    assert_eq!(body["row"]["location"], "C3");
    assert_eq!(body["locations"], json!([]));

    let (status, body) = server
        .send(
            Method::POST,
            "/api/forms/stock-adjustments",
            Some(&user.token),
            json!({ "tally_card_number": "TC-002", "qty": "lots" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "qty must be a whole number");
    Ok(())
}

#[tokio::test]
async fn multi_location_without_named_locations_is_rejected() -> Result<()> {
    let server = common::spawn().await?;
    let user = common::user();

    let (status, body) = server
        .send(
            Method::POST,
            "/api/forms/stock-adjustments",
            Some(&user.token),
            json!({ "tally_card_number": "TC-002", "multi_location": true, "locations": [{ "location": "" }] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap_or_default().starts_with("Multi-location mode requires"));
    assert!(server.provider.rows(ENTRIES).is_empty());
    Ok(())
}

#[tokio::test]
async fn adjustments_need_a_session() -> Result<()> {
    let server = common::spawn().await?;

    let (status, body) = server
        .send(Method::POST, "/api/forms/stock-adjustments", None, json!({ "tally_card_number": "TC-001", "qty": 1 }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn adjustments_only_go_through_their_form() -> Result<()> {
    let server = common::spawn().await?;
    let user = common::user();
    let entry = json!({ "tally_card_number": "TC-001", "qty": 1, "user_id": "someone-else" });

    let (status, body) = server.send(Method::POST, "/api/stock_adjustments", Some(&user.token), entry.clone()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Resource stock_adjustments is read-only");

    let (status, _) = server.send(Method::POST, "/api/forms/stock_adjustments", None, entry.clone()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = server.send(Method::POST, "/api/forms/stock_adjustments", Some(&user.token), entry).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(server.provider.rows(ENTRIES).is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_location_insert_leaves_no_entry() -> Result<()> {
    let provider = common::seeded_provider().fail_inserts_into(ENTRY_LOCATIONS);
    let server = common::spawn_with(provider, common::test_config()).await?;
    let user = common::user();

    let (status, _) = server
        .send(
            Method::POST,
            "/api/forms/stock-adjustments",
            Some(&user.token),
            json!({ "tally_card_number": "TC-001", "multi_location": true, "location": "A1", "qty": 4 }),
        )
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(server.provider.rows(ENTRIES).is_empty());
    assert!(server.provider.rows(ENTRY_LOCATIONS).is_empty());
    Ok(())
}

#[tokio::test]
async fn tally_card_form_checks_warehouse() -> Result<()> {
    let server = common::spawn().await?;

    let (status, body) = server
        .send(Method::POST, "/api/forms/tally-cards", None, json!({ "tally_card_number": "TC-700" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "warehouse_id is required");

    let (status, body) = server
        .send(
            Method::POST,
            "/api/forms/tally-cards",
            None,
            json!({ "tally_card_number": "TC-700", "warehouse_id": "wh-nowhere" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Unknown warehouse_id: wh-nowhere");

    let (status, body) = server
        .send(
            Method::POST,
            "/api/forms/tally-cards",
            None,
            json!({ "tally_card_number": "tc-700", "warehouse_id": common::WAREHOUSE_NORTH }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["row"]["tally_card_number"], "TC-700");
    assert_eq!(server.provider.rows("tcm_tally_cards").len(), common::CARD_COUNT + 1);
    Ok(())
}

#[tokio::test]
async fn tally_card_form_enforces_warehouse_access_when_scoped() -> Result<()> {
    let provider = common::seeded_provider();
    let user = common::user();
    common::add_user(&provider, &user, "staff", &[common::WAREHOUSE_MAIN]);
    let mut config = common::test_config();
    config.auth.scoping_enabled = true;
    let server = common::spawn_with(provider, config).await?;

    let (status, _) = server
        .send(
            Method::POST,
            "/api/forms/tally-cards",
            Some(&user.token),
            json!({ "tally_card_number": "TC-701", "warehouse_id": common::WAREHOUSE_NORTH }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .send(
            Method::POST,
            "/api/forms/tally-cards",
            Some(&user.token),
            json!({ "tally_card_number": "TC-701", "warehouse_id": common::WAREHOUSE_MAIN }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn generic_form_maps_dashed_key() -> Result<()> {
    let server = common::spawn().await?;
    let user = common::user();

    let (status, body) = server
        .send(
            Method::POST,
            "/api/forms/purchase-orders",
            Some(&user.token),
            json!({ "order_number": " po-17 ", "supplier_name": "Acme", "id": "forced" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_ne!(body["row"]["id"], "forced");
    assert_eq!(server.provider.rows("purchase_orders").len(), 1);

    let (status, _) = server.send(Method::POST, "/api/forms/users", Some(&user.token), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
