//! HTTP surface of the usage dashboard
//!
//! Provides both the HTML pages and a JSON API over the same service.

pub mod handlers;
pub mod pages;
pub mod service;

pub use service::DashboardService;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(service: Arc<DashboardService>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Pages
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route("/tech", get(pages::tech))
        .route("/team", get(pages::team))
        .route("/dashboard", get(pages::dashboard))
        // JSON API
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/filters", get(handlers::get_filters))
        .route("/api/v1/kpis", get(handlers::get_kpis))
        .route("/api/v1/forecast", post(handlers::post_forecast))
        .route("/api/v1/refresh", post(handlers::post_refresh))
        // State and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::model::Regressor;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    async fn app() -> Router {
        let model: Arc<dyn Regressor> = Arc::new(|_: &FeatureVector| 1.5);
        let service = service::tests::seeded_service(Some(model)).await;
        create_router(Arc::new(service))
    }

    /// Percent-encode a query value
    fn encode(value: &str) -> String {
        value
            .bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
                _ => format!("%{:02X}", b),
            })
            .collect()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn get_path(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_text(response).await)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_path(app().await, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ok"));
    }

    #[tokio::test]
    async fn test_static_pages_render_navigation() {
        for path in ["/", "/about", "/tech", "/team"] {
            let (status, body) = get_path(app().await, path).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.contains(r#"href="/dashboard""#));
            assert!(body.contains(&format!(r#"<a href="{}" class="active">"#, path)));
        }
    }

    #[tokio::test]
    async fn test_dashboard_prompts_for_selection() {
        let (status, body) = get_path(app().await, "/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("notice info"));
        assert!(body.contains(r#"name="department""#));
    }

    #[tokio::test]
    async fn test_dashboard_with_many_roles_warns() {
        let service = Arc::new(service::tests::seeded_service(None).await);
        let departments = service.filters(&[]).await.unwrap().departments;
        let roles = service.filters(&departments).await.unwrap().roles;
        assert!(roles.len() >= 2);

        let query: Vec<String> = departments
            .iter()
            .map(|d| format!("department={}", encode(d)))
            .chain(roles.iter().map(|r| format!("role={}", encode(r))))
            .collect();
        let uri = format!("/dashboard?{}", query.join("&"));
        let (status, body) = get_path(create_router(service), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Total consumption (filtered)"));
        assert!(body.contains("Select exactly 1 role"));
        assert!(!body.contains("Generate forecast"));
    }

    #[tokio::test]
    async fn test_dashboard_runs_forecast_for_one_role() {
        let model: Arc<dyn Regressor> = Arc::new(|_: &FeatureVector| 1.5);
        let service = service::tests::seeded_service(Some(model)).await;
        let records = service.usage_records().await.unwrap();
        let (dept, role) = (records[0].department.clone(), records[0].role.clone());
        let service = service.with_forecast_settings(crate::forecast::ForecastSettings {
            min_history: 1,
            ..Default::default()
        });

        let uri = format!(
            "/dashboard?department={}&role={}&horizon=2&run=1",
            encode(&dept),
            encode(&role)
        );
        let (status, body) = get_path(create_router(Arc::new(service)), &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<svg"));
        assert!(body.contains(&format!("Projection ({})", role)));
    }

    #[tokio::test]
    async fn test_filters_endpoint() {
        let (status, body) = get_path(app().await, "/api/v1/filters").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(!json["departments"].as_array().unwrap().is_empty());
        assert!(json["roles"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_kpis_without_role_is_bad_request() {
        let (status, body) = get_path(app().await, "/api/v1/kpis?department=Vendas").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("error"));
    }

    #[tokio::test]
    async fn test_forecast_endpoint_rejects_two_roles() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/forecast")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"departments":["Vendas"],"roles":["Vendedor","Supervisor"],"horizon_months":3}"#,
            ))
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Select exactly 1 role"));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_service_unavailable() {
        let mut settings = service::tests::test_settings();
        settings.db.db_endpoint = "ws://127.0.0.1:1".into();
        let app = create_router(Arc::new(DashboardService::new(settings)));

        let (status, body) = get_path(app.clone(), "/api/v1/filters").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Database connection failed"));

        let (status, body) = get_path(app, "/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("notice error"));
        assert!(!body.contains(r#"name="department""#));
    }

    #[tokio::test]
    async fn test_forecast_endpoint_unknown_scope() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/forecast")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"departments":["Nowhere"],"roles":["Vendedor"]}"#))
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("No historical data"));
    }
}
