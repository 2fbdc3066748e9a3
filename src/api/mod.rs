//! HTTP API - lottery relay, history view and health check

pub mod routes;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::history::HistoryBuffer;
use crate::predictor::PredictorSettings;
use crate::upstream::DrawSource;

/// State shared across handlers
///
/// The history lock is held across the whole fetch, classify, append and
/// predict sequence, so rounds are processed one at a time.
pub struct AppState {
    pub history: Mutex<HistoryBuffer>,
    pub source: Arc<dyn DrawSource>,
    pub settings: PredictorSettings,
}

impl AppState {
    pub fn new(
        source: Arc<dyn DrawSource>,
        settings: PredictorSettings,
        history: HistoryBuffer,
    ) -> Self {
        Self {
            history: Mutex::new(history),
            source,
            settings,
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Create the API router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/taixiu/lottery", get(routes::api_lottery))
        .route("/api/taixiu/history", get(routes::api_history))
        // Health check
        .route("/health", get(routes::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
