//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::util::ServiceExt;
use uuid::Uuid;

use course_ledger::api::{self, AppState};
use course_ledger::cache::ExpiringStore;
use course_ledger::db;
use course_ledger::domain::{Course, RatingAggregate, UserContact};
use course_ledger::notify::{PurchaseNotifier, StoreNotificationSink, TracingMailer};
use course_ledger::payment::{midtrans_signature, MidtransVerifier, PaymentCallback, PaymentGateway};
use course_ledger::storage::{LedgerStore, MemoryLedgerStore};

pub const SERVER_KEY: &str = "SB-Mid-server-integration";

/// Router wired to an in-memory store, plus handles to seed it
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryLedgerStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        let dyn_store: Arc<dyn LedgerStore> = store.clone();

        let payments = PaymentGateway::new(
            dyn_store.clone(),
            Arc::new(MidtransVerifier::new(SERVER_KEY)),
            ExpiringStore::new(),
            Duration::from_secs(60),
        );
        let notifier = PurchaseNotifier::new(
            dyn_store.clone(),
            Arc::new(TracingMailer::new("no-reply@courses.test")),
            Arc::new(StoreNotificationSink::new(dyn_store.clone())),
        );

        let router = api::build_router(AppState {
            store: dyn_store,
            notifier,
            payments,
        });

        Self { router, store }
    }

    pub async fn user(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .register_user(UserContact {
                id,
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
            })
            .await;
        id
    }

    pub async fn course(&self, instructor_id: Uuid, price: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .register_course(Course {
                id,
                title: "Rust for Accountants".to_string(),
                instructor_id,
                price: Decimal::new(price, 0),
                rating: RatingAggregate::empty(),
            })
            .await;
        id
    }

    /// Send a request and decode the JSON body (Null for plain-text bodies)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user_id: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("X-Request-User-Id", user_id.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

/// A settlement callback signed with `SERVER_KEY`
pub fn signed_callback(order_id: &str, user_id: Uuid, amount: &str) -> PaymentCallback {
    PaymentCallback {
        provider_transaction_id: order_id.to_string(),
        user_id,
        amount: amount.to_string(),
        status: "settlement".to_string(),
        status_code: "200".to_string(),
        signature: midtrans_signature(order_id, "200", amount, SERVER_KEY),
    }
}

/// Decimal fields are serialized as strings
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal string: {}", value))
}

static SCHEMA: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();

/// Setup test database - connect and apply the schema once per test binary.
/// Tests share the database; each one seeds its own fresh ids.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    SCHEMA
        .get_or_init(|| async {
            db::apply_schema(&pool).await.expect("Failed to apply schema");
        })
        .await;

    pool
}
