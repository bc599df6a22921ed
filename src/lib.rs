pub mod clients;
pub mod config;
pub mod helpers;
pub mod models;
pub mod normalizer;
pub mod routes;

use std::sync::Arc;

use clients::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Arc<config::Config>,
}
