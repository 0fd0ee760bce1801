// HTTP routes
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    embed_dashboard, export_dashboard, health_check, list_dashboards, list_widget_types, view_dashboard,
};
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/widget-types", get(list_widget_types))
        .route("/dashboards", get(list_dashboards))
        .route("/dashboard/:id", get(view_dashboard))
        .route("/embed/dashboard/:id", get(embed_dashboard))
        .route("/dashboards/:id/export", get(export_dashboard))
        .with_state(state)
}
