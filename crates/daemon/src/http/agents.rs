// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent handlers.

use super::{ApiError, AppState};
use ah_adapters::{internals, MuxAdapter};
use ah_core::{Agent, AgentSpec, Clock};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

fn require_agent<M: MuxAdapter, C: Clock>(
    state: &AppState<M, C>,
    project: &str,
    id: &str,
) -> Result<Agent, ApiError> {
    state
        .manager
        .store()
        .agent_in_project(project, id)
        .ok_or_else(|| ApiError::not_found(format!("agent not found: {}/{}", project, id)))
}

pub async fn list<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path(project): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.manager.store().project(&project).is_none() {
        return Err(ApiError::not_found(format!("project not found: {}", project)));
    }
    let agents = state.manager.store().agents_in_project(&project);
    Ok(Json(serde_json::json!({ "agents": agents })))
}

pub async fn create<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path(project): Path<String>,
    Json(spec): Json<AgentSpec>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if spec.provider.is_empty() {
        return Err(ApiError::invalid_body("provider is required"));
    }
    let agent = state.manager.create_agent(&project, spec).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "agent": agent })),
    ))
}

pub async fn fetch<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path((project, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let agent = require_agent(&state, &project, &id)?;
    Ok(Json(serde_json::json!({ "agent": agent })))
}

pub async fn remove<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path((project, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.manager.delete_agent(&project, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct InputBody {
    pub text: String,
}

pub async fn input<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path((project, id)): Path<(String, String)>,
    Json(body): Json<InputBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.manager.send_input(&project, &id, &body.text).await?;
    Ok(Json(serde_json::json!({ "delivered": true })))
}

pub async fn abort<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path((project, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.manager.abort_agent(&project, &id).await?;
    Ok(Json(serde_json::json!({ "aborted": true })))
}

#[derive(Debug, Deserialize)]
pub struct OutputParams {
    pub lines: Option<u32>,
}

pub async fn output<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path((project, id)): Path<(String, String)>,
    Query(params): Query<OutputParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let agent = require_agent(&state, &project, &id)?;
    let lines = params
        .lines
        .unwrap_or(state.manager.config().capture_lines)
        .clamp(1, 10_000);
    let output = state
        .manager
        .mux()
        .capture_pane(&agent.mux_target, lines)
        .await
        .map_err(|e| ApiError::from(ah_engine::ManagerError::Mux(e)))?;
    Ok(Json(serde_json::json!({ "output": output, "lines": lines })))
}

#[derive(Debug, Deserialize)]
pub struct MessagesParams {
    pub limit: Option<usize>,
    pub role: Option<String>,
}

/// Where this agent's session file lives, if internals are present.
fn session_file(agent: &Agent) -> Option<std::path::PathBuf> {
    if let Some(path) = agent.provider_session_file.as_deref() {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }
    agent
        .provider_runtime_dir
        .as_deref()
        .and_then(internals::latest_jsonl)
}

pub async fn messages<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path((project, id)): Path<(String, String)>,
    Query(params): Query<MessagesParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let agent = require_agent(&state, &project, &id)?;
    let limit = params.limit.unwrap_or(100);
    let result = match session_file(&agent) {
        Some(path) => internals::read_messages(&path, limit, params.role.as_deref()),
        None => internals::SessionMessages {
            warnings: vec!["no provider internals for this agent".to_string()],
            ..internals::SessionMessages::default()
        },
    };
    Ok(Json(serde_json::to_value(result).unwrap_or_default()))
}

pub async fn last_message<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path((project, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let agent = require_agent(&state, &project, &id)?;
    let last = session_file(&agent).and_then(|path| internals::last_assistant_text(&path));
    Ok(Json(serde_json::json!({ "lastMessage": last })))
}

pub async fn debug<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path((project, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let debug = state.manager.get_agent_debug(&project, &id).await?;
    Ok(Json(serde_json::to_value(debug).unwrap_or_default()))
}
