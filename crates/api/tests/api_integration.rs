//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::OrderStore;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemoryReservationStore, Orchestrator, PaymentBehavior, StubPaymentGateway};
use tower::ServiceExt;

use api::config::SagaMode;
use api::routes::orders::{AppState, SagaDriver};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup(mode: SagaMode) -> axum::Router {
    let state = api::create_default_state(mode).unwrap();
    api::create_app(state, get_metrics_handle())
}

fn setup_orchestrated_with(behavior: PaymentBehavior) -> axum::Router {
    let orders = OrderStore::new();
    let reservations = InMemoryReservationStore::new();
    let payments = StubPaymentGateway::with_behavior(behavior);
    let driver = SagaDriver::Orchestrated(Orchestrator::new(
        orders.clone(),
        reservations.clone(),
        payments,
    ));
    let state = Arc::new(AppState {
        driver,
        orders,
        reservations,
    });
    api::create_app(state, get_metrics_handle())
}

fn create_order_request(product_id: u64, quantity: u32) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/create_order")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "product_id": product_id, "quantity": quantity }).to_string(),
        ))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup(SagaMode::Orchestrated);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["mode"], "orchestrated");
}

#[tokio::test]
async fn test_health_reports_choreographed_mode() {
    let app = setup(SagaMode::Choreographed);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["mode"], "choreographed");
}

#[tokio::test]
async fn test_orchestrated_create_blocks_to_terminal_state() {
    let app = setup(SagaMode::Orchestrated);

    let response = app.oneshot(create_order_request(1, 2)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "Completed");
    assert!(json["order_id"].is_string());
}

#[tokio::test]
async fn test_orchestrated_declined_payment_returns_failed() {
    let app = setup_orchestrated_with(PaymentBehavior::Fail);

    let response = app
        .clone()
        .oneshot(create_order_request(7, 3))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "Failed");

    // compensation released the stock
    let response = app
        .oneshot(
            Request::builder()
                .uri("/inventory/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["reserved"], 0);
}

#[tokio::test]
async fn test_choreographed_create_returns_accepted_then_completes() {
    let app = setup(SagaMode::Choreographed);

    let response = app
        .clone()
        .oneshot(create_order_request(1, 2))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "Pending");
    let order_id = json["order_id"].as_str().unwrap().to_string();

    let mut status = String::new();
    for _ in 0..400 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/order/{order_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        status = body_json(response).await["status"]
            .as_str()
            .unwrap()
            .to_string();
        if status == "Completed" || status == "Failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(status, "Completed");
}

#[tokio::test]
async fn test_zero_quantity_is_bad_request() {
    let app = setup(SagaMode::Orchestrated);

    let response = app.oneshot(create_order_request(1, 0)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let app = setup(SagaMode::Orchestrated);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/order/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_order_id_is_bad_request() {
    let app = setup(SagaMode::Orchestrated);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/order/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let app = setup(SagaMode::Orchestrated);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
