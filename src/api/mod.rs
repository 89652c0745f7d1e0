use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::{Arc, RwLock};

pub mod handlers;
pub mod responses;

pub fn router(state: Arc<RwLock<AppState>>) -> Router {
    Router::new()
        .route("/api/detections", get(handlers::get_detections))
        .route("/api/detections/center", get(handlers::get_center_detections))
        .route("/api/detections/search", get(handlers::search_detections))
        .route("/api/navigation/minimal", get(handlers::get_minimal_navigation))
        .route("/api/navigation/maximal", get(handlers::get_maximal_navigation))
        .route("/api/objects", get(handlers::get_objects))
        .route("/api/calibration", get(handlers::get_calibration))
        .route("/api/health", get(handlers::get_health))
        .with_state(state)
}
