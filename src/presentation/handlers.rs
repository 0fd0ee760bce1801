// HTTP request handlers
use crate::application::dashboard_service::{Access, RenderedDashboard};
use crate::domain::ids::DashboardId;
use crate::domain::registry::{self, WidgetType};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Palette of placeable widget types
pub async fn list_widget_types() -> Json<&'static [WidgetType]> {
    Json(registry::list_types())
}

/// List publicly shared dashboards
pub async fn list_dashboards(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.dashboard_service.list_public().await {
        Ok(dashboards) => Json(dashboards),
        Err(e) => {
            tracing::error!("Error fetching dashboards: {:#}", e);
            // Return empty list on error
            Json(Vec::new())
        }
    }
}

/// Rendered dashboard for a share link
pub async fn view_dashboard(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let id = DashboardId::new(id);
    rendered(&id, state.dashboard_service.render(&id, Access::Link).await)
}

/// Rendered dashboard for an iframe embed
pub async fn embed_dashboard(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let id = DashboardId::new(id);
    rendered(&id, state.dashboard_service.render(&id, Access::Embed).await)
}

fn rendered(id: &DashboardId, result: anyhow::Result<Option<RenderedDashboard>>) -> Response {
    match result {
        Ok(Some(dashboard)) => Json(dashboard).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(dashboard = %id, "Error rendering dashboard: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Download a shared dashboard as `<name>.json`
pub async fn export_dashboard(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let id = DashboardId::new(id);
    let file = match state.dashboard_service.export(&id).await {
        Ok(Some(file)) => file,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(dashboard = %id, "Error exporting dashboard: {:#}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match content_disposition(&file.file_name) {
        Ok(disposition) => (
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            file.contents,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(dashboard = %id, "Invalid export file name: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Attachment header with an ASCII fallback name and the exact UTF-8 name.
fn content_disposition(file_name: &str) -> Result<HeaderValue, header::InvalidHeaderValue> {
    let fallback: String = file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition() {
        let value = content_disposition("Q1 \"Sales\" €.json").unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "attachment; filename=\"Q1 _Sales_ _.json\"; filename*=UTF-8''Q1%20%22Sales%22%20%E2%82%AC.json"
        );
    }
}
