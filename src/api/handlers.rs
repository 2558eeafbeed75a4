//! JSON API handlers for the usage dashboard
//!
//! These handlers use the shared DashboardService.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::service::{DashboardService, FilterOptions, ForecastReport, ForecastRequest};
use crate::aggregate::Kpis;
use crate::error::DashboardError;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type AppState = Arc<DashboardService>;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Status code for a dashboard failure
pub fn status_for(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::MissingSelection
        | DashboardError::RoleSelection
        | DashboardError::Horizon(_) => StatusCode::BAD_REQUEST,
        DashboardError::EmptyDataset
        | DashboardError::NoHistory
        | DashboardError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DashboardError::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
        DashboardError::Query(_)
        | DashboardError::RowShape(_)
        | DashboardError::ModelLoad { .. }
        | DashboardError::Export { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: DashboardError) -> ApiError {
    warn!(error = %err, "Request failed");
    (status_for(&err), Json(ErrorResponse { error: err.to_string() }))
}

/// Every value of a repeated query parameter, in order
pub fn values_of(params: &[(String, String)], key: &str) -> Vec<String> {
    params
        .iter()
        .filter(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.clone())
        .collect()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/v1/filters?department=A&department=B
pub async fn get_filters(
    State(service): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<FilterOptions>, ApiError> {
    let departments = values_of(&params, "department");
    service.filters(&departments).await.map(Json).map_err(api_error)
}

/// GET /api/v1/kpis?department=A&role=R
pub async fn get_kpis(
    State(service): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Kpis>, ApiError> {
    let departments = values_of(&params, "department");
    let roles = values_of(&params, "role");
    service.kpis(&departments, &roles).await.map(Json).map_err(api_error)
}

/// POST /api/v1/forecast
pub async fn post_forecast(
    State(service): State<AppState>,
    Json(request): Json<ForecastRequest>,
) -> Result<Json<ForecastReport>, ApiError> {
    service.forecast(&request).await.map(Json).map_err(api_error)
}

/// POST /api/v1/refresh
pub async fn post_refresh(State(service): State<AppState>) -> impl IntoResponse {
    service.refresh().await;
    Json(serde_json::json!({"status": "refreshed"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_of_collects_repeats() {
        let params = vec![
            ("department".to_string(), "Vendas".to_string()),
            ("role".to_string(), "Gerente".to_string()),
            ("department".to_string(), "Diretoria".to_string()),
            ("department".to_string(), String::new()),
        ];
        assert_eq!(values_of(&params, "department"), vec!["Vendas", "Diretoria"]);
        assert_eq!(values_of(&params, "role"), vec!["Gerente"]);
        assert!(values_of(&params, "horizon").is_empty());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&DashboardError::RoleSelection), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&DashboardError::NoHistory), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&DashboardError::ModelLoad {
                path: "m.txt".into(),
                reason: "missing".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
