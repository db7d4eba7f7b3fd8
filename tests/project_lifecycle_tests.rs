mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{project_body, session_token, spawn_app, spawn_app_with, tx_hash, wallet};

#[tokio::test]
async fn test_disclosures_round_trip_in_order() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));

    let mut body = project_body("Disclosed");
    body["disclosures"] = json!([
        { "disclosureType": "team", "title": "Founders", "description": "Two artists" },
        { "disclosureType": "financial", "title": "Revenue", "description": "Royalties only" },
        { "disclosureType": "license", "title": "CC0", "description": "Public domain" },
    ]);
    let (status, created) = app.post("/projects", &seller, body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    let project_id = created["id"].as_str().unwrap().to_string();

    let (_, detail) = app.get(&format!("/projects/{}", project_id), None).await;
    let titles: Vec<&str> = detail["disclosures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Founders", "Revenue", "CC0"]);
    assert_eq!(detail["disclosures"][0]["disclosureType"], "team");

    let (_, filtered) = app
        .get(&format!("/project-disclosures?projectId={}&disclosureType=license", project_id), None)
        .await;
    assert_eq!(filtered["disclosures"].as_array().unwrap().len(), 1);
    assert_eq!(filtered["disclosures"][0]["title"], "CC0");

    let (status, _) = app
        .get(&format!("/project-disclosures?projectId={}&disclosureType=rumours", project_id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_edit_replaces_disclosures() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));

    let mut body = project_body("Editable");
    body["disclosures"] = json!([{ "disclosureType": "team", "title": "Old", "description": "x" }]);
    let (_, created) = app.post("/projects", &seller, body.clone()).await;
    let project_id = created["id"].as_str().unwrap().to_string();

    body["description"] = json!("Updated description");
    body["royaltyPct"] = json!(5.5);
    body["disclosures"] = json!([
        { "disclosureType": "tokenomics", "title": "Supply", "description": "10k" },
        { "disclosureType": "other", "title": "Roadmap", "description": "Q3" },
    ]);
    let (status, updated) = app.put(&format!("/projects/{}", project_id), &seller, body).await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["description"], "Updated description");
    assert_eq!(updated["royaltyPct"], 5.5);
    assert_eq!(updated["status"], "draft");
    let titles: Vec<&str> = updated["disclosures"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Supply", "Roadmap"]);
}

#[tokio::test]
async fn test_sold_project_cannot_be_edited() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let buyer = session_token("buyer", &wallet(2));
    let project_id = app.create_project(&seller, "Test").await;
    app.list_project(&seller, project_id, 100.0, 42).await;
    app.post(&format!("/projects/{}/purchase", project_id), &buyer, json!({ "txHash": tx_hash(0xaa) }))
        .await;

    let mut body = project_body("Test");
    body["disclosures"] = json!([{ "disclosureType": "team", "title": "New", "description": "x" }]);
    let (status, _) = app.put(&format!("/projects/{}", project_id), &seller, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, detail) = app.get(&format!("/projects/{}", project_id), None).await;
    assert!(detail["disclosures"].as_array().unwrap().is_empty());

    // Terminal: nothing moves a sold project
    for target in ["active", "suspended", "deleted", "draft"] {
        let (status, _) = app
            .put(
                &format!("/user/projects/{}/status", project_id),
                &seller,
                json!({ "status": target }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "sold -> {} allowed", target);
    }
    assert_eq!(app.project_status(project_id, &seller).await, "sold");
}

#[tokio::test]
async fn test_non_owner_gets_forbidden() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let stranger = session_token("stranger", &wallet(9));
    let project_id = app.create_project(&seller, "Test").await;

    let status_uri = format!("/user/projects/{}/status", project_id);
    for body in [json!({ "status": "deleted" }), json!({ "status": "bogus" }), json!({})] {
        let (status, _) = app.put(&status_uri, &stranger, body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = app
        .put(&format!("/projects/{}", project_id), &stranger, json!({ "name": "" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&format!("/projects/{}", project_id), &stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/listings",
            &stranger,
            json!({ "projectId": project_id, "priceUSDC": 1, "saleId": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/user/projects/{}", project_id), Some(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(app.project_status(project_id, &seller).await, "draft");
}

#[tokio::test]
async fn test_status_route_validation() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;
    let uri = format!("/user/projects/{}/status", project_id);

    let (status, body) = app.put(&uri, &seller, json!({ "status": "archived" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid status");

    let (status, _) = app
        .put(&uri, &seller, json!({ "status": "deleted", "projectId": uuid::Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Purchases are the only way to sell
    let (status, _) = app.put(&uri, &seller, json!({ "status": "sold" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Activation needs an escrow registration
    let (status, _) = app.put(&uri, &seller, json!({ "status": "active" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.put("/user/projects/not-an-id/status", &seller, json!({ "status": "active" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(&format!("/user/projects/{}/status", uuid::Uuid::new_v4()), &seller, json!({ "status": "active" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.project_status(project_id, &seller).await, "draft");
}

#[tokio::test]
async fn test_suspend_clears_sale_id_for_reregistration() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;
    app.list_project(&seller, project_id, 100.0, 42).await;
    let uri = format!("/user/projects/{}/status", project_id);

    let (status, body) = app
        .put(&uri, &seller, json!({ "status": "suspended", "projectId": project_id }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "suspended");

    let (_, detail) = app.get(&format!("/projects/{}", project_id), None).await;
    assert!(detail["listing"]["saleId"].is_null());

    let (status, _) = app.put(&uri, &seller, json!({ "status": "active" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A fresh registration relists
    app.list_project(&seller, project_id, 90.0, 77).await;
    let (_, detail) = app.get(&format!("/projects/{}", project_id), None).await;
    assert_eq!(detail["status"], "active");
    assert_eq!(detail["listing"]["saleId"], 77);
    assert_eq!(detail["listing"]["priceUSDC"], 90.0);
}

#[tokio::test]
async fn test_suspend_keeps_sale_id_when_reused() {
    let app = spawn_app_with(&[("RELIST_POLICY", "reuse")]).await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;
    app.list_project(&seller, project_id, 100.0, 42).await;
    let uri = format!("/user/projects/{}/status", project_id);

    let (status, _) = app.put(&uri, &seller, json!({ "status": "suspended" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.put(&uri, &seller, json!({ "status": "active" })).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "active");

    // Same-state requests are rejected
    let (status, _) = app.put(&uri, &seller, json!({ "status": "active" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_listing_suspends_project() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));
    let project_id = app.create_project(&seller, "Test").await;
    let listing_id = app.list_project(&seller, project_id, 100.0, 42).await;

    let (status, body) = app
        .put(&format!("/listings/{}", listing_id), &seller, json!({ "priceUSDC": 120.25 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["priceUSDC"], 120.25);

    let (status, body) = app.delete(&format!("/listings/{}", listing_id), &seller).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "suspended");

    let (status, _) = app.get(&format!("/listings/{}", listing_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_hides_project_and_clears_disclosures() {
    let app = spawn_app().await;
    let seller = session_token("seller", &wallet(1));

    let mut body = project_body("Doomed");
    body["disclosures"] = json!([{ "disclosureType": "team", "title": "Founders", "description": "x" }]);
    let (_, created) = app.post("/projects", &seller, body).await;
    let project_id = created["id"].as_str().unwrap().to_string();

    let (status, deleted) = app.delete(&format!("/projects/{}", project_id), &seller).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["status"], "deleted");

    let (status, _) = app.get(&format!("/projects/{}", project_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .get(&format!("/project-disclosures?projectId={}", project_id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, own) = app.get("/user/projects", Some(&seller)).await;
    assert!(own["projects"].as_array().unwrap().is_empty());

    let (status, _) = app.delete(&format!("/projects/{}", project_id), &seller).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_list_filters_and_pagination() {
    let app = spawn_app().await;
    let alice = session_token("alice", &wallet(1));
    let bob = session_token("bob", &wallet(2));

    for name in ["Pixel Apes", "Pixel Cats", "Chiptune Drops"] {
        app.create_project(&alice, name).await;
    }
    let mut music = project_body("Synth Pass");
    music["category"] = json!("Music");
    app.post("/projects", &bob, music).await;

    let (_, all) = app.get("/projects?limit=2", None).await;
    assert_eq!(all["pagination"]["total"], 4);
    assert_eq!(all["pagination"]["limit"], 2);
    assert_eq!(all["projects"].as_array().unwrap().len(), 2);
    // Newest first
    assert_eq!(all["projects"][0]["name"], "Synth Pass");

    let (_, search) = app.get("/projects?search=pixel", None).await;
    assert_eq!(search["pagination"]["total"], 2);

    let (_, literal) = app.get("/projects?search=%25", None).await;
    assert_eq!(literal["pagination"]["total"], 0);

    let (_, by_category) = app.get("/projects?category=Music", None).await;
    assert_eq!(by_category["pagination"]["total"], 1);

    let (_, me) = app.get("/user", Some(&alice)).await;
    let (_, by_owner) = app
        .get(&format!("/projects?ownerId={}", me["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(by_owner["pagination"]["total"], 3);

    let (_, page) = app.get("/projects?limit=2&offset=2", None).await;
    assert_eq!(page["projects"].as_array().unwrap().len(), 2);
    assert_eq!(page["pagination"]["offset"], 2);

    let (status, _) = app.get("/projects?limit=101", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/projects?category=Sculpture", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_social_profile_link() {
    let app = spawn_app().await;
    let user = session_token("collector", &wallet(4));

    let (status, body) = app
        .put("/user/social", &user, json!({ "username": "@collector", "avatar": "https://img.example/a.png" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["twitterUsername"], "collector");

    let (_, me) = app.get("/user", Some(&user)).await;
    assert_eq!(me["twitterUsername"], "collector");
    assert_eq!(me["twitterProfileImageUrl"], "https://img.example/a.png");
}

#[tokio::test]
async fn test_wallet_rotation_updates_user() {
    let app = spawn_app().await;

    let (_, before) = app.get("/user", Some(&session_token("rotating", &wallet(5)))).await;
    let (_, after) = app.get("/user", Some(&session_token("rotating", &wallet(6)))).await;

    assert_eq!(before["id"], after["id"]);
    assert_eq!(after["address"], wallet(6));
    assert_eq!(after["chain"], "EVM");
}
