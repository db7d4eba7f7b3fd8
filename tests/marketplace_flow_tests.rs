mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{session_token, spawn_app, tx_hash, wallet, ESCROW_ADDRESS};

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

#[tokio::test]
async fn test_authenticated_routes_require_session() {
    let app = spawn_app().await;

    let (status, body) = app.send(axum::http::Method::POST, "/projects", None, Some(common::project_body("Test"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.get("/user/notifications", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_new_project_starts_in_draft() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));

    let project_id = app.create_project(&seller, "Test").await;

    let (status, body) = app.get(&format!("/projects/{}", project_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Test");
    assert_eq!(body["category"], "Art");
    assert_eq!(body["status"], "draft");
    assert_eq!(body["chainId"], "8453");
    assert_eq!(body["owner"]["address"], wallet(1));
    assert_eq!(body["ownerId"], body["owner"]["id"]);
    assert!(body["listing"].is_null());

    let (_, me) = app.get("/user", Some(&seller)).await;
    assert_eq!(me["id"], body["ownerId"]);
}

#[tokio::test]
async fn test_missing_required_fields_rejected() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));

    let (status, body) = app
        .post("/projects", &seller, json!({ "name": "Test", "category": "Art" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let mut invalid = common::project_body("Test");
    invalid["category"] = json!("Sculpture");
    let (status, _) = app.post("/projects", &seller, invalid).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = app.get("/projects", None).await;
    assert_eq!(list["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_listing_activates_project() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;

    let listing_id = app.list_project(&seller, project_id, 100.0, 42).await;

    let (status, body) = app.get(&format!("/projects/{}", project_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["listing"]["id"], listing_id.to_string());
    assert_eq!(body["listing"]["priceUSDC"], 100.0);
    assert_eq!(body["listing"]["saleId"], 42);

    // Recording the same registration again is a no-op
    let (status, again) = app
        .post(
            "/listings",
            &seller,
            json!({ "projectId": project_id, "priceUSDC": 100.0, "saleId": 42 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], listing_id.to_string());

    // A different registration while active is refused
    let (status, _) = app
        .post(
            "/listings",
            &seller,
            json!({ "projectId": project_id, "priceUSDC": 150.0, "saleId": 43 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_listing_price_validation() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;

    for price in [json!(0), json!(-5), json!(1.1234567)] {
        let (status, _) = app
            .post(
                "/listings",
                &seller,
                json!({ "projectId": project_id, "priceUSDC": price, "saleId": 1 }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "price {} accepted", price);
    }
    assert_eq!(app.project_status(project_id, &seller).await, "draft");
}

#[tokio::test]
async fn test_listing_requires_confirmed_registration() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;

    let hash = tx_hash(0x51);
    app.ledger.reject(&hash);
    let (status, _) = app
        .post(
            "/listings",
            &seller,
            json!({ "projectId": project_id, "priceUSDC": 10, "saleId": 7, "txHash": hash }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.project_status(project_id, &seller).await, "draft");

    let confirmed = tx_hash(0x52);
    let (status, body) = app
        .post(
            "/listings",
            &seller,
            json!({ "projectId": project_id, "priceUSDC": 10, "saleId": 7, "txHash": confirmed }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(app.ledger.confirmed().get(&confirmed), Some(&7));
}

#[tokio::test]
async fn test_listing_escrow_must_match_verified_contract() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;

    let (status, body) = app
        .post(
            "/listings",
            &seller,
            json!({ "projectId": project_id, "priceUSDC": 10, "saleId": 7, "escrowAddress": wallet(0xff) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "escrowAddress does not match the escrow contract");
    assert_eq!(app.project_status(project_id, &seller).await, "draft");

    let (status, body) = app
        .post(
            "/listings",
            &seller,
            json!({ "projectId": project_id, "priceUSDC": 10, "saleId": 7 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["escrowAddress"], ESCROW_ADDRESS);

    let listing_uri = format!("/listings/{}", body["id"].as_str().unwrap());
    let (status, _) = app
        .put(&listing_uri, &seller, json!({ "escrowAddress": wallet(0xff) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_active_listing_sale_change_needs_confirmed_registration() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;
    let listing_id = app.list_project(&seller, project_id, 100.0, 42).await;
    let uri = format!("/listings/{}", listing_id);

    let (status, _) = app.put(&uri, &seller, json!({ "saleId": 999 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let rejected = tx_hash(0x61);
    app.ledger.reject(&rejected);
    let (status, _) = app
        .put(&uri, &seller, json!({ "saleId": 999, "txHash": rejected }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listing) = app.get(&uri, None).await;
    assert_eq!(listing["saleId"], 42);

    let confirmed = tx_hash(0x62);
    let (status, body) = app
        .put(&uri, &seller, json!({ "saleId": 999, "txHash": confirmed }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["saleId"], 999);
    assert_eq!(app.ledger.confirmed().get(&confirmed), Some(&999));

    // Price changes and unchanged sale ids need no registration
    let (status, body) = app
        .put(&uri, &seller, json!({ "saleId": 999, "priceUSDC": 80 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["priceUSDC"], 80.0);
}

#[tokio::test]
async fn test_suspended_listing_sale_change_is_free() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;
    let listing_id = app.list_project(&seller, project_id, 100.0, 42).await;

    let (status, _) = app
        .put(
            &format!("/user/projects/{}/status", project_id),
            &seller,
            json!({ "status": "suspended" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .put(&format!("/listings/{}", listing_id), &seller, json!({ "saleId": 77 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["saleId"], 77);
    assert_eq!(app.project_status(project_id, &seller).await, "suspended");
}

#[tokio::test]
async fn test_purchase_marks_project_sold_and_notifies_seller() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let buyer = session_token("buyer", &wallet(2));
    let project_id = app.create_project(&seller, "Test").await;
    let listing_id = app.list_project(&seller, project_id, 100.0, 42).await;

    let (status, tx) = app
        .post(
            &format!("/projects/{}/purchase", project_id),
            &buyer,
            json!({ "txHash": tx_hash(0xaa) }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", tx);
    assert_eq!(tx["listingId"], listing_id.to_string());
    assert_eq!(tx["priceUSDC"], 100.0);
    assert_eq!(tx["txHash"], tx_hash(0xaa));

    assert_eq!(app.project_status(project_id, &seller).await, "sold");

    let (_, notifications) = app.get("/user/notifications", Some(&seller)).await;
    let notifications = notifications["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "purchase");
    assert_eq!(notifications[0]["title"], "NFT Purchased");
    assert_eq!(notifications[0]["projectId"], project_id.to_string());
    assert_eq!(notifications[0]["read"], false);
    assert_eq!(notifications[0]["metadata"]["txHash"], tx_hash(0xaa));

    let (_, buyer_notifications) = app.get("/user/notifications", Some(&buyer)).await;
    assert!(buyer_notifications["notifications"].as_array().unwrap().is_empty());

    let (_, listing) = app.get(&format!("/listings/{}", listing_id), None).await;
    assert_eq!(listing["transaction"]["id"], tx["id"]);
    assert_eq!(listing["project"]["status"], "sold");
}

#[tokio::test]
async fn test_second_purchase_rejected() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let buyer = session_token("buyer", &wallet(2));
    let other = session_token("other", &wallet(3));
    let project_id = app.create_project(&seller, "Test").await;
    app.list_project(&seller, project_id, 100.0, 42).await;

    let uri = format!("/projects/{}/purchase", project_id);
    let (status, _) = app.post(&uri, &buyer, json!({ "txHash": tx_hash(0xaa) })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post(&uri, &other, json!({ "txHash": tx_hash(0xbb) })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Listing is not active");

    let (_, transactions) = app.get(&format!("/transactions?projectId={}", project_id), None).await;
    assert_eq!(transactions["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_purchase_replay_returns_original_transaction() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let buyer = session_token("buyer", &wallet(2));
    let other = session_token("other", &wallet(3));
    let project_id = app.create_project(&seller, "Test").await;
    let listing_id = app.list_project(&seller, project_id, 25.5, 9).await;

    let body = json!({ "listingId": listing_id, "txHash": tx_hash(0xcc) });
    let (status, first) = app.post("/transactions", &buyer, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, replay) = app.post("/transactions", &buyer, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["id"], first["id"]);

    // Someone else presenting the same hash is not a replay
    let (status, _) = app.post("/transactions", &other, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = app.get(&format!("/transactions?listingId={}", listing_id), None).await;
    assert_eq!(list["pagination"]["total"], 1);

    let (_, notifications) = app.get("/user/notifications", Some(&seller)).await;
    assert_eq!(notifications["notifications"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_purchases_single_winner() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let first_buyer = session_token("buyer-1", &wallet(2));
    let second_buyer = session_token("buyer-2", &wallet(3));
    let project_id = app.create_project(&seller, "Test").await;
    app.list_project(&seller, project_id, 100.0, 42).await;

    let uri = format!("/projects/{}/purchase", project_id);
    let (first, second) = tokio::join!(
        app.post(&uri, &first_buyer, json!({ "txHash": tx_hash(0x01) })),
        app.post(&uri, &second_buyer, json!({ "txHash": tx_hash(0x02) })),
    );

    let statuses = [first.0, second.0];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::BAD_REQUEST).count(), 1);

    let (_, transactions) = app.get(&format!("/transactions?projectId={}", project_id), None).await;
    assert_eq!(transactions["pagination"]["total"], 1);
    assert_eq!(app.project_status(project_id, &seller).await, "sold");
}

#[tokio::test]
async fn test_owner_cannot_buy_own_project() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;
    app.list_project(&seller, project_id, 100.0, 42).await;

    let (status, body) = app
        .post(
            &format!("/projects/{}/purchase", project_id),
            &seller,
            json!({ "txHash": tx_hash(0xdd) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot buy your own project");
    assert_eq!(app.project_status(project_id, &seller).await, "active");
}

#[tokio::test]
async fn test_purchase_validation_and_chain_rejection() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let buyer = session_token("buyer", &wallet(2));
    let project_id = app.create_project(&seller, "Test").await;
    let uri = format!("/projects/{}/purchase", project_id);

    // Draft projects are not for sale
    let (status, body) = app.post(&uri, &buyer, json!({ "txHash": tx_hash(0x10) })).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);

    app.list_project(&seller, project_id, 100.0, 42).await;

    let (status, _) = app.post(&uri, &buyer, json!({ "txHash": "0x1234" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post(&uri, &buyer, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let rejected = tx_hash(0x11);
    app.ledger.reject(&rejected);
    let (status, _) = app.post(&uri, &buyer, json!({ "txHash": rejected })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.project_status(project_id, &seller).await, "active");

    let (status, _) = app
        .post(&format!("/projects/{}/purchase", uuid::Uuid::new_v4()), &buyer, json!({ "txHash": tx_hash(0x12) }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_and_transaction_queries() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let buyer = session_token("buyer", &wallet(2));
    let sold = app.create_project(&seller, "Sold").await;
    let open = app.create_project(&seller, "Open").await;
    app.list_project(&seller, sold, 10.0, 1).await;
    app.list_project(&seller, open, 20.0, 2).await;
    app.post(&format!("/projects/{}/purchase", sold), &buyer, json!({ "txHash": tx_hash(0x21) }))
        .await;

    let (_, active) = app.get("/listings?status=active", None).await;
    assert_eq!(active["pagination"]["total"], 1);
    assert_eq!(active["listings"][0]["projectId"], open.to_string());
    assert!(active["listings"][0]["transaction"].is_null());

    let (_, me) = app.get("/user", Some(&buyer)).await;
    let (_, bought) = app
        .get(&format!("/transactions?buyerId={}", me["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(bought["pagination"]["total"], 1);
    assert_eq!(bought["transactions"][0]["priceUSDC"], 10.0);

    let (status, _) = app.get("/listings?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/listings?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
