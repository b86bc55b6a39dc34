// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook dispatcher diagnostics.

use super::{ApiError, AppState};
use ah_adapters::MuxAdapter;
use ah_core::Clock;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

pub async fn status<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "configuredUrl": state.dispatcher.configured_url(),
        "deliveries": state.dispatcher.records(),
    }))
}

pub async fn test<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = state
        .dispatcher
        .send_test()
        .await
        .map_err(|message| ApiError::new(StatusCode::BAD_GATEWAY, "RECEIVER_UNREACHABLE", message))?;
    Ok(Json(serde_json::json!({ "delivered": true, "status": status })))
}

pub async fn probe<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = state
        .dispatcher
        .probe_receiver()
        .await
        .map_err(|message| ApiError::new(StatusCode::BAD_GATEWAY, "RECEIVER_UNREACHABLE", message))?;
    Ok(Json(serde_json::json!({ "reachable": true, "status": status })))
}
