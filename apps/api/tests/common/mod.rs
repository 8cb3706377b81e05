//! Shared harness for HTTP tests: an in-memory app driven with `oneshot`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use galley_api::{router, ApiConfig, AppState};
use galley_db::{Database, DbConfig};
use galley_relay::{Broadcaster, ChannelBroadcaster, MemoryCache, RelayError, RelayResult};

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub cache: Arc<MemoryCache>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn journal(&self) -> &str {
        self.headers
            .get("x-galley-journal")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

/// Relay settings that keep retries fast.
pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.relay.retry.initial_backoff_ms = 1;
    config.relay.retry.max_backoff_ms = 5;
    config
}

pub async fn spawn_app() -> (TestApp, Arc<ChannelBroadcaster>) {
    let broadcaster = Arc::new(ChannelBroadcaster::default());
    let app = spawn_app_with(test_config(), broadcaster.clone()).await;
    (app, broadcaster)
}

pub async fn spawn_app_with(config: ApiConfig, broadcaster: Arc<dyn Broadcaster>) -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    serve(db, config, broadcaster)
}

/// App over a SQLite file in `dir`, so requests get their own connections.
pub async fn spawn_app_on_disk(dir: &tempfile::TempDir) -> TestApp {
    let mut config = test_config();
    config.database_path = dir.path().join("galley.db");
    config.db_max_connections = 8;
    let db = Database::new(config.db_config()).await.unwrap();
    serve(db, config, Arc::new(ChannelBroadcaster::default()))
}

fn serve(db: Database, config: ApiConfig, broadcaster: Arc<dyn Broadcaster>) -> TestApp {
    let cache = Arc::new(MemoryCache::new());
    let state = AppState::new(db.clone(), cache.clone(), broadcaster, config);

    TestApp {
        app: router(state),
        db,
        cache,
    }
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    /// 2 × burger at 8.50 and 3 × fries at 3.99 for company `C`, waiter `w1`.
    pub async fn burger_order(&self, branch_id: &str) -> Value {
        let response = self
            .post(
                "/api/orders",
                json!({
                    "companyId": "C",
                    "branchId": branch_id,
                    "waiterId": "w1",
                    "orderLines": [
                        { "menuItemId": "burger", "quantity": 2, "price": 850 },
                        { "menuItemId": "fries", "quantity": 3, "price": 399 }
                    ]
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Bun / beef / potato with the burger and fries recipes, and
    /// `units` of each in stock at `branch_id`. Returns the ingredient ids.
    pub async fn stock_kitchen(&self, branch_id: &str, units: i64) -> Kitchen {
        let mut ids = Vec::new();
        for (name, unit) in [("Bun", "pcs"), ("Beef", "kg"), ("Potato", "kg")] {
            let response = self
                .post(
                    "/api/ingredients",
                    json!({ "companyId": "C", "name": name, "unit": unit }),
                )
                .await;
            assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
            ids.push(response.body["id"].as_str().unwrap().to_string());
        }
        let kitchen = Kitchen {
            bun: ids[0].clone(),
            beef: ids[1].clone(),
            potato: ids[2].clone(),
        };

        for (menu, ingredient, amount) in [
            ("burger", &kitchen.bun, "1"),
            ("burger", &kitchen.beef, "0.2"),
            ("fries", &kitchen.potato, "0.15"),
        ] {
            let response = self
                .post(
                    "/api/recipes",
                    json!({ "menuItemId": menu, "ingredientId": ingredient, "amount": amount }),
                )
                .await;
            assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        }

        for ingredient in [&kitchen.bun, &kitchen.beef, &kitchen.potato] {
            let response = self
                .post(
                    "/api/stock",
                    json!({
                        "ingredientId": ingredient,
                        "branchId": branch_id,
                        "quantityMilli": units * 1_000
                    }),
                )
                .await;
            assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        }

        kitchen
    }

    /// Stock of `ingredient_id` at `branch_id` in thousandths, if a record exists.
    pub async fn stock_milli(&self, branch_id: &str, ingredient_id: &str) -> Option<i64> {
        let response = self.get(&format!("/api/branches/{branch_id}/stock")).await;
        assert_eq!(response.status, StatusCode::OK);
        response
            .body
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["ingredientId"] == ingredient_id)
            .map(|r| r["quantityMilli"].as_i64().unwrap())
    }
}

pub struct Kitchen {
    pub bun: String,
    pub beef: String,
    pub potato: String,
}

/// Broadcaster whose every publish fails.
#[derive(Default)]
pub struct FailingBroadcaster {
    pub attempts: AtomicU32,
}

impl FailingBroadcaster {
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broadcaster for FailingBroadcaster {
    async fn publish(&self, _topic: &str, _payload: &str) -> RelayResult<usize> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(RelayError::Broadcast("subscriber channel closed".into()))
    }
}
