//! End-to-end order lifecycle over HTTP.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{spawn_app, spawn_app_on_disk, spawn_app_with, test_config, FailingBroadcaster};
use galley_core::StockPolicy;

#[tokio::test]
async fn test_create_assigns_number_and_pending_status() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;

    assert_eq!(order["status"], "pending");
    assert_eq!(order["totalPrice"], 2 * 850 + 3 * 399);
    assert_eq!(order["lines"].as_array().unwrap().len(), 2);
    assert!(order["payment"].is_null());

    let number = order["orderNumber"].as_str().unwrap();
    assert!(number.ends_with("-0001"), "{number}");
    let second = app.burger_order("B").await;
    assert!(second["orderNumber"].as_str().unwrap().ends_with("-0002"));
}

#[tokio::test]
async fn test_burger_and_fries_paid_deducts_once() {
    let (app, _) = spawn_app().await;
    let kitchen = app.stock_kitchen("B", 10).await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let paid = app.put(&uri, json!({ "orderStatus": "paid" })).await;
    assert_eq!(paid.status, StatusCode::OK, "{}", paid.body);
    assert_eq!(paid.body["status"], "paid");
    assert!(!paid.body["paidAt"].is_null());

    assert_eq!(app.stock_milli("B", &kitchen.bun).await, Some(8_000));
    assert_eq!(app.stock_milli("B", &kitchen.beef).await, Some(9_600));
    assert_eq!(app.stock_milli("B", &kitchen.potato).await, Some(9_550));

    // re-submitting PAID succeeds without a second deduction
    let again = app.put(&uri, json!({ "orderStatus": "PAID" })).await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["paidAt"], paid.body["paidAt"]);
    assert_eq!(app.stock_milli("B", &kitchen.bun).await, Some(8_000));
    assert_eq!(app.stock_milli("B", &kitchen.potato).await, Some(9_550));
}

#[tokio::test]
async fn test_deduction_only_touches_the_order_branch() {
    let (app, _) = spawn_app().await;
    let kitchen = app.stock_kitchen("B", 10).await;
    for ingredient in [&kitchen.bun, &kitchen.beef, &kitchen.potato] {
        app.post(
            "/api/stock",
            json!({ "ingredientId": ingredient, "branchId": "OTHER", "quantity": "5" }),
        )
        .await;
    }

    let order = app.burger_order("B").await;
    app.put(
        &format!("/api/orders/{}", order["id"].as_str().unwrap()),
        json!({ "orderStatus": "paid" }),
    )
    .await;

    assert_eq!(app.stock_milli("OTHER", &kitchen.bun).await, Some(5_000));
    assert_eq!(app.stock_milli("B", &kitchen.bun).await, Some(8_000));
}

#[tokio::test]
async fn test_paid_without_stock_records_creates_none() {
    let (app, _) = spawn_app().await;
    app.stock_kitchen("B", 10).await;
    let order = app.burger_order("NEW").await;

    let paid = app
        .put(
            &format!("/api/orders/{}", order["id"].as_str().unwrap()),
            json!({ "orderStatus": "paid" }),
        )
        .await;
    assert_eq!(paid.status, StatusCode::OK);

    let stock = app.get("/api/branches/NEW/stock").await;
    assert_eq!(stock.body, json!([]));
}

#[tokio::test]
async fn test_unknown_status_is_rejected() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;

    let response = app
        .put(
            &format!("/api/orders/{}", order["id"].as_str().unwrap()),
            json!({ "orderStatus": "shipped" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_backward_transition_is_conflict() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    assert_eq!(app.put(&uri, json!({ "orderStatus": "completed" })).await.status, StatusCode::OK);

    let back = app.put(&uri, json!({ "orderStatus": "processing" })).await;
    assert_eq!(back.status, StatusCode::CONFLICT);
    assert_eq!(back.body["code"], "INVALID_TRANSITION");

    assert_eq!(app.put(&uri, json!({ "orderStatus": "paid" })).await.status, StatusCode::OK);
    let leave_paid = app.put(&uri, json!({ "orderStatus": "pending" })).await;
    assert_eq!(leave_paid.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_missing_order_is_not_found() {
    let (app, _) = spawn_app().await;
    let response = app.put("/api/orders/nope", json!({ "orderStatus": "paid" })).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/orders/nope").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_line_reconciliation_updates_in_place_and_appends() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());
    let burger_line = order["lines"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .put(
            &uri,
            json!({
                "orderLines": [
                    { "id": burger_line, "menuItemId": "burger", "quantity": 3, "price": 900 },
                    { "menuItemId": "cola", "quantity": 1, "price": 250 }
                ],
                "totalPrice": 3 * 900 + 3 * 399 + 250
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let lines = response.body["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 3);

    let burger = lines.iter().find(|l| l["id"] == burger_line.as_str()).unwrap();
    assert_eq!(burger["quantity"], 3);
    assert_eq!(burger["totalPrice"], 2_700);

    let cola = lines.iter().find(|l| l["menuItemId"] == "cola").unwrap();
    assert!(!cola["id"].as_str().unwrap().is_empty());
    assert_ne!(cola["id"], burger_line.as_str());
    assert_eq!(response.body["totalPrice"], 3 * 900 + 3 * 399 + 250);
}

#[tokio::test]
async fn test_unknown_line_id_aborts_every_edit() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let response = app
        .put(
            &uri,
            json!({
                "orderStatus": "processing",
                "orderLines": [
                    { "menuItemId": "cola", "quantity": 1, "price": 250 },
                    { "id": "ghost", "menuItemId": "burger", "quantity": 1, "price": 850 }
                ]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let reloaded = app.get(&uri).await;
    assert_eq!(reloaded.body["status"], "pending");
    assert_eq!(reloaded.body["lines"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_non_positive_line_quantity_is_rejected() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;

    let response = app
        .put(
            &format!("/api/orders/{}", order["id"].as_str().unwrap()),
            json!({ "orderLines": [{ "menuItemId": "cola", "quantity": 0, "price": 250 }] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overflowing_line_price_is_rejected() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let response = app
        .put(
            &uri,
            json!({ "orderLines": [{ "menuItemId": "soda", "quantity": 2, "price": i64::MAX }] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", response.body);
    assert_eq!(response.body["code"], "VALIDATION_ERROR");

    let created = app
        .post(
            "/api/orders",
            json!({
                "companyId": "C",
                "branchId": "B",
                "orderLines": [{ "menuItemId": "soda", "quantity": 999, "price": 100_000_000 }]
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::BAD_REQUEST, "{}", created.body);

    let reloaded = app.get(&uri).await;
    assert_eq!(reloaded.body["lines"].as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_paid_updates_on_distinct_orders_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let app = Arc::new(spawn_app_on_disk(&dir).await);
    let kitchen = app.stock_kitchen("B", 20).await;

    let mut uris = Vec::new();
    for _ in 0..6 {
        let order = app.burger_order("B").await;
        uris.push(format!("/api/orders/{}", order["id"].as_str().unwrap()));
    }

    let handles: Vec<_> = uris
        .into_iter()
        .map(|uri| {
            let app = app.clone();
            tokio::spawn(async move { app.put(&uri, json!({ "orderStatus": "paid" })).await })
        })
        .collect();
    for handle in handles {
        let response = handle.await.unwrap();
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        assert_eq!(response.body["status"], "paid");
    }

    // 6 orders × 2 buns
    assert_eq!(app.stock_milli("B", &kitchen.bun).await, Some(8_000));
    assert_eq!(app.stock_milli("B", &kitchen.potato).await, Some(20_000 - 6 * 450));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_paid_updates_on_one_order_deduct_once() {
    let dir = tempfile::tempdir().unwrap();
    let app = Arc::new(spawn_app_on_disk(&dir).await);
    let kitchen = app.stock_kitchen("B", 10).await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let app = app.clone();
            let uri = uri.clone();
            tokio::spawn(async move { app.put(&uri, json!({ "orderStatus": "paid" })).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().status, StatusCode::OK);
    }

    assert_eq!(app.stock_milli("B", &kitchen.bun).await, Some(8_000));
    assert_eq!(app.stock_milli("B", &kitchen.beef).await, Some(9_600));
}

#[tokio::test]
async fn test_paid_order_lines_are_locked() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());
    app.put(&uri, json!({ "orderStatus": "paid" })).await;

    let response = app
        .put(
            &uri,
            json!({ "orderLines": [{ "menuItemId": "cola", "quantity": 1, "price": 250 }] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], "ORDER_LOCKED");
}

#[tokio::test]
async fn test_strict_policy_rejects_and_rolls_back() {
    let mut config = test_config();
    config.stock_policy = StockPolicy::Strict;
    let app = spawn_app_with(config, Arc::new(galley_relay::NoOpBroadcaster)).await;

    // 1 bun in stock, 2 burgers ordered
    let kitchen = app.stock_kitchen("B", 1).await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let response = app.put(&uri, json!({ "orderStatus": "paid" })).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], "INSUFFICIENT_STOCK");

    let reloaded = app.get(&uri).await;
    assert_eq!(reloaded.body["status"], "pending");
    assert!(reloaded.body["paidAt"].is_null());
    assert_eq!(app.stock_milli("B", &kitchen.potato).await, Some(1_000));
}

#[tokio::test]
async fn test_allow_negative_policy_oversells() {
    let (app, _) = spawn_app().await;
    let kitchen = app.stock_kitchen("B", 1).await;
    let order = app.burger_order("B").await;

    let response = app
        .put(
            &format!("/api/orders/{}", order["id"].as_str().unwrap()),
            json!({ "orderStatus": "paid" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let stock = app.get("/api/branches/B/stock").await;
    let bun = stock
        .body
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["ingredientId"] == kitchen.bun.as_str())
        .unwrap();
    assert_eq!(bun["quantityMilli"], -1_000);
    assert_eq!(bun["quantity"], "-1.000");
    assert_eq!(bun["short"], true);
}

#[tokio::test]
async fn test_update_is_broadcast_on_branch_topic() {
    let (app, broadcaster) = spawn_app().await;
    let order = app.burger_order("B").await;
    let mut rx = broadcaster.subscribe();

    let response = app
        .put(
            &format!("/api/orders/{}", order["id"].as_str().unwrap()),
            json!({ "orderStatus": "processing" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.journal().contains("broadcast=completed"));

    let message = rx.recv().await.unwrap();
    assert_eq!(message.topic, "orders:branch:B");
    let payload: serde_json::Value = serde_json::from_str(&message.payload).unwrap();
    assert_eq!(payload, response.body);
}

#[tokio::test]
async fn test_broadcast_failure_does_not_fail_the_update() {
    let failing = Arc::new(FailingBroadcaster::default());
    let app = spawn_app_with(test_config(), failing.clone()).await;
    let kitchen = app.stock_kitchen("B", 10).await;
    let order = app.burger_order("B").await;
    let attempts_after_create = failing.attempts();

    let response = app
        .put(
            &format!("/api/orders/{}", order["id"].as_str().unwrap()),
            json!({ "orderStatus": "paid" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "paid");
    assert!(response.journal().starts_with("persisted=completed"));
    assert!(response.journal().ends_with("broadcast=failed"));
    assert_eq!(failing.attempts() - attempts_after_create, 3);
    assert_eq!(app.stock_milli("B", &kitchen.bun).await, Some(8_000));
}

#[tokio::test]
async fn test_update_evicts_named_listings() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let listed = app.get("/api/branches/B/orders").await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);
    assert!(app.cache.contains("orders:branch:B").await);

    // no scope in the request: nothing evicted
    let unscoped = app.put(&uri, json!({ "discount": 100 })).await;
    assert!(unscoped.journal().contains("cache_invalidated=skipped"));
    assert!(app.cache.contains("orders:branch:B").await);

    let scoped = app
        .put(&uri, json!({ "orderStatus": "processing", "branchId": "B", "companyId": "C" }))
        .await;
    assert!(scoped.journal().contains("cache_invalidated=completed"));
    assert!(!app.cache.contains("orders:branch:B").await);

    let relisted = app.get("/api/branches/B/orders").await;
    assert_eq!(relisted.body[0]["status"], "processing");
}

#[tokio::test]
async fn test_delete_cascades_and_evicts() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());
    app.get("/api/branches/B/orders").await;

    let deleted = app.send(Method::DELETE, &uri, None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(!app.cache.contains("orders:branch:B").await);
    assert_eq!(app.get(&uri).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.send(Method::DELETE, &uri, None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_payment_is_recorded_once() {
    let (app, _) = spawn_app().await;
    let order = app.burger_order("B").await;
    let id = order["id"].as_str().unwrap();
    let uri = format!("/api/orders/{id}/payment");

    let bad_method = app.post(&uri, json!({ "method": "barter", "amount": 2897 })).await;
    assert_eq!(bad_method.status, StatusCode::BAD_REQUEST);

    let paid = app
        .post(&uri, json!({ "method": "card", "amount": 2897, "reference": "AUTH-1" }))
        .await;
    assert_eq!(paid.status, StatusCode::CREATED, "{}", paid.body);
    assert_eq!(paid.body["method"], "card");

    let again = app.post(&uri, json!({ "method": "cash", "amount": 2897 })).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let detail = app.get(&format!("/api/orders/{id}")).await;
    assert_eq!(detail.body["payment"]["amount"], 2897);
    assert_eq!(detail.body["status"], "pending");
}

#[tokio::test]
async fn test_health() {
    let (app, _) = spawn_app().await;
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["database"], true);
}
