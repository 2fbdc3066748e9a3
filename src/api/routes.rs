//! API route handlers

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use tracing::{error, info};

use super::SharedState;
use crate::error::ApiError;
use crate::history::classify;
use crate::predictor::predict;
use crate::upstream::RoundId;

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "OK"
}

/// Latest round plus the prediction for the next one
#[derive(Debug, Serialize)]
pub struct LotteryResponse {
    #[serde(rename = "Phien")]
    pub round: RoundId,
    #[serde(rename = "Xuc_xac1")]
    pub die1: u8,
    #[serde(rename = "Xuc_xac2")]
    pub die2: u8,
    #[serde(rename = "Xuc_xac3")]
    pub die3: u8,
    #[serde(rename = "Tổng")]
    pub sum: u8,
    #[serde(rename = "Ket_qua")]
    pub outcome: &'static str,
    #[serde(rename = "Phien_du_doan")]
    pub next_round: u64,
    #[serde(rename = "Du_doan")]
    pub prediction: &'static str,
    #[serde(rename = "Do_tin_cay")]
    pub confidence: u8,
    #[serde(rename = "Ly_do")]
    pub rationale: &'static str,
    #[serde(rename = "Pattern")]
    pub pattern: String,
}

/// GET /api/taixiu/lottery
pub async fn api_lottery(
    State(state): State<SharedState>,
) -> Result<Json<LotteryResponse>, ApiError> {
    // Run detached so a client hanging up does not cancel a round mid-way
    let response = tokio::spawn(play_round(state))
        .await
        .map_err(|e| {
            error!(error = %e, "Round task failed");
            ApiError::Internal(e.to_string())
        })??;

    Ok(Json(response))
}

async fn play_round(state: SharedState) -> Result<LotteryResponse, ApiError> {
    let mut history = state.history.lock().await;

    let draw = state.source.latest_draw().await.map_err(|e| {
        error!(error = %e, "Failed to fetch upstream draw");
        ApiError::from(e)
    })?;

    let sum = draw.sum();
    let outcome = classify(sum);
    history.append(outcome);

    let prediction = predict(history.current(), &state.settings);

    info!(
        round = ?draw.round,
        dice = ?draw.dice,
        sum,
        outcome = %outcome,
        prediction = prediction.label(),
        confidence = prediction.confidence,
        rule = prediction.rationale.rule_name(),
        "Round processed"
    );

    let [die1, die2, die3] = draw.dice;
    Ok(LotteryResponse {
        round: draw.round,
        die1,
        die2,
        die3,
        sum,
        outcome: outcome.label(),
        next_round: draw.next_round,
        prediction: prediction.label(),
        confidence: prediction.confidence,
        rationale: prediction.rationale.tag(),
        pattern: history.pattern(),
    })
}

/// Read-only view of the rolling history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    #[serde(rename = "Pattern")]
    pub pattern: String,
    pub length: usize,
    pub capacity: usize,
    pub policy: &'static str,
}

/// GET /api/taixiu/history
pub async fn api_history(State(state): State<SharedState>) -> Json<HistoryResponse> {
    let history = state.history.lock().await;

    Json(HistoryResponse {
        pattern: history.pattern(),
        length: history.len(),
        capacity: history.capacity(),
        policy: state.settings.policy.as_str(),
    })
}
