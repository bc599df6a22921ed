use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;

use crate::helpers::{background_color, updated_label};
use crate::models::endpoint::Endpoint;
use crate::AppState;

// Pre-computed slot card for the template
#[derive(Debug, Clone)]
struct CardView {
    id: String,
    label: String,
    value: String,
    is_image: bool,
    error: bool,
    updated: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    title: String,
    api_base_url: String,
    backend_status: String,
    reachable: bool,
    background: String,
    cards: Vec<CardView>,
}

fn render_template(tmpl: &impl Template) -> Response {
    match tmpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("template error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

pub async fn handle_dashboard(State(state): State<AppState>) -> Response {
    let snap = state.orchestrator.snapshot().await;
    let now = Utc::now();

    let background = background_color(
        snap.slots
            .iter()
            .find(|s| s.id == Endpoint::Color.id())
            .map(|s| &s.slot),
    );

    let cards = snap
        .slots
        .iter()
        .map(|s| {
            let endpoint = s.id.parse::<Endpoint>().ok();
            CardView {
                id: s.id.clone(),
                label: endpoint
                    .map(|e| e.label().to_string())
                    .unwrap_or_else(|| s.id.clone()),
                value: s.slot.value.clone(),
                is_image: endpoint.is_some_and(|e| e.is_image()) && !s.slot.error,
                error: s.slot.error,
                updated: updated_label(s.slot.updated_at, now),
            }
        })
        .collect();

    let tmpl = DashboardTemplate {
        title: "Pulse Console".to_string(),
        api_base_url: state.config.api_base_url.clone(),
        backend_status: snap.backend_status,
        reachable: snap.reachable,
        background,
        cards,
    };

    render_template(&tmpl)
}

pub async fn handle_refresh(State(state): State<AppState>, Path(id): Path<String>) -> Redirect {
    state.orchestrator.request(&id);
    Redirect::to("/ui/")
}
