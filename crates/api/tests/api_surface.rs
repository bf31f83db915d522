//! Control-plane surface tests.
//!
//! These run without a live database: the pool is lazy with a short
//! acquire timeout, so handlers that touch it observe fast errors while
//! validation-first paths never reach it at all.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use remit_api::config::ServerConfig;
use remit_api::routes;
use remit_api::state::AppState;
use remit_dispatch::{DispatchEngine, EngineConfig, JobStore, PgJobStore};
use remit_events::EventBus;
use remit_gateway::{GatewayConfig, HttpTokenProvider, PaymentGateway};
use remit_scheduler::{PaymentScheduler, PgClientSource, PgStateStore};
use sqlx::postgres::PgPoolOptions;
use tower::util::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        cors_origins: vec![],
        request_timeout_secs: 5,
        batch_delay_ms: 0,
    }
}

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        primary_url: "http://127.0.0.1:1".into(),
        fallback_url: "http://127.0.0.1:1".into(),
        token_url: "http://127.0.0.1:1/oauth/token".into(),
        client_id: "test".into(),
        client_secret: String::new(),
        primary_split: 0.5,
        request_timeout: Duration::from_millis(100),
    }
}

/// Full application state wired against an unreachable database.
fn offline_state() -> AppState {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(100))
        .connect_lazy("postgres://remit@127.0.0.1:1/remit")
        .expect("lazy pool construction cannot fail");

    let bus = Arc::new(EventBus::default());
    let gateway_config = gateway_config();
    let tokens = Arc::new(HttpTokenProvider::from_config(&gateway_config));
    let gateway = Arc::new(PaymentGateway::new(gateway_config, tokens));
    let job_store = Arc::new(PgJobStore::new(pool.clone()));
    let engine = Arc::new(DispatchEngine::with_config(
        gateway,
        Arc::clone(&job_store) as Arc<dyn JobStore>,
        Arc::clone(&bus),
        EngineConfig {
            batch_delay: Duration::ZERO,
            ..EngineConfig::default()
        },
    ));
    let scheduler = Arc::new(PaymentScheduler::new(
        engine,
        job_store,
        Arc::new(PgClientSource::new(pool.clone())),
        Arc::new(PgStateStore::new(pool.clone())),
        Arc::clone(&bus),
    ));

    AppState {
        pool,
        config: Arc::new(test_config()),
        scheduler,
        event_bus: bus,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_degraded_without_database() {
    let app = routes::app().with_state(offline_state());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["db_healthy"], false);
}

#[tokio::test]
async fn start_with_out_of_bounds_settings_is_rejected() {
    let app = routes::app().with_state(offline_state());

    let request = Request::post("/api/v1/scheduler/start")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "interval_hours": 99, "batch_size": 50 }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("interval_hours"));
}

#[tokio::test]
async fn manual_run_is_accepted_with_a_job_id() {
    let app = routes::app().with_state(offline_state());

    let response = app
        .oneshot(
            Request::post("/api/v1/scheduler/run")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert!(body["data"]["job_id"].is_string());
}

#[tokio::test]
async fn unknown_routes_are_404() {
    let app = routes::app().with_state(offline_state());

    let response = app
        .oneshot(
            Request::get("/api/v1/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
