pub mod api;
pub mod sse;
pub mod ui;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // State
        .route("/api/state", get(api::handle_state))
        .route("/api/slots/{id}", get(api::handle_get_slot))
        .route("/api/events", get(sse::handle_events))
        // Triggers
        .route("/api/refresh/{id}", post(api::handle_refresh))
        .route("/api/health", post(api::handle_check_health))
        .route("/api/requests", get(api::handle_in_flight))
        .route("/api/requests/{id}/{seq}", delete(api::handle_cancel))
        // Own liveness
        .route("/healthz", get(api::handle_healthz))
        // Dashboard UI
        .route("/ui/", get(ui::handle_dashboard))
        .route("/ui/refresh/{id}", post(ui::handle_refresh))
        // Root redirect
        .route(
            "/",
            get(|| async {
                axum::response::Redirect::to("/ui/")
            }),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
