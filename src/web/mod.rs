use axum::{Router, http::Method, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::server::dashboard::DashboardController;
use crate::web::routes::*;

pub mod error;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<DashboardController>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(dashboard: Arc<DashboardController>) -> Router {
    let app_state = Arc::new(AppState { dashboard });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/dashboard", dashboard_routes::dashboard_router())
        .with_state(app_state)
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::SummaryOptions;
    use crate::events::EventRecord;
    use crate::services::scripted::{Scripted, bad_gateway, image};
    use crate::services::upstream::SnapshotImage;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn router(
        events: Scripted<Vec<EventRecord>>,
        snapshots: Scripted<SnapshotImage>,
    ) -> Router {
        let dashboard = DashboardController::new(
            Arc::new(events),
            Arc::new(snapshots),
            SummaryOptions::default(),
        );
        create_axum_router(Arc::new(dashboard))
    }

    async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn call_json(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let (status, body) = call(app, method, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn sample_events() -> Vec<EventRecord> {
        [
            json!({"id": 3, "timestamp": "2024-05-01T12:00:00Z", "vehicle_type": "Truck", "material_type": "Sand", "load_percentage": 60}),
            json!({"id": 2, "timestamp": "2024-05-01T11:00:00Z", "vehicle_type": "Car", "load_percentage": "abc"}),
            json!({"id": 1, "timestamp": "2024-05-01T10:00:00Z", "vehicle_type": "Truck", "material_type": "Sand", "load_percentage": 20}),
        ]
        .into_iter()
        .map(EventRecord::from_value)
        .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(Scripted::new(), Scripted::new());
        let (status, body) = call(&app, Method::GET, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_refresh_then_summary() {
        let app = router(Scripted::new().respond(Ok(sample_events())), Scripted::new());

        let (status, outcome) = call_json(&app, Method::POST, "/api/dashboard/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome, json!({ "adopted": true, "fetchedEvents": 3 }));

        let (status, summary) = call_json(&app, Method::GET, "/api/dashboard/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["totalEvents"], json!(3));
        assert_eq!(
            summary["vehicleMix"],
            json!([{ "label": "Truck", "count": 2 }, { "label": "Car", "count": 1 }])
        );
        assert_eq!(
            summary["materialMix"],
            json!([{ "label": "Sand", "count": 2 }, { "label": "Unknown", "count": 1 }])
        );
        assert_eq!(summary["averageLoad"], json!(40.0));
        assert_eq!(summary["recent"][0]["id"], json!(3));
        assert_eq!(summary["lastCapture"], json!("2024-05-01T12:00:00Z"));

        let (status, events) = call_json(&app, Method::GET, "/api/dashboard/events").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(events.as_array().unwrap().len(), 3);
        assert_eq!(events[1]["load_percentage"], json!("abc"));
    }

    #[tokio::test]
    async fn test_refresh_failure_is_bad_gateway() {
        let app = router(Scripted::new().respond(Err(bad_gateway())), Scripted::new());

        let (status, body) = call_json(&app, Method::POST, "/api/dashboard/refresh").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().starts_with("Upstream error"));

        let (_, summary) = call_json(&app, Method::GET, "/api/dashboard/summary").await;
        assert_eq!(summary["totalEvents"], json!(0));
    }

    #[tokio::test]
    async fn test_snapshot_not_found_before_fetch() {
        let app = router(Scripted::new(), Scripted::new());
        let (status, body) = call_json(&app, Method::GET, "/api/dashboard/snapshot").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("No snapshot fetched yet"));
    }

    #[tokio::test]
    async fn test_snapshot_refresh_and_serve() {
        let snapshots = Scripted::new()
            .respond(Ok(image(b"\x89PNG-frame")))
            .respond(Err(bad_gateway()));
        let app = router(Scripted::new(), snapshots);

        let (status, _) = call(&app, Method::POST, "/api/dashboard/snapshot/refresh").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, Method::POST, "/api/dashboard/snapshot/refresh").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/dashboard/snapshot")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"\x89PNG-frame");
    }
}
