// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project CRUD handlers.

use super::{ApiError, AppState};
use ah_adapters::MuxAdapter;
use ah_core::{Callback, Clock};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub cwd: PathBuf,
    #[serde(default)]
    pub callback: Option<Callback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    #[serde(default)]
    pub callback: Option<Callback>,
}

pub async fn list<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
) -> Json<serde_json::Value> {
    let projects = state.manager.list_projects();
    Json(serde_json::json!({ "projects": projects }))
}

pub async fn create<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Json(body): Json<CreateProject>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let project = state
        .manager
        .create_project(&body.name, body.cwd, body.callback)
        .await?;
    let mux_session = project.mux_session.clone();
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "project": project, "muxSession": mux_session })),
    ))
}

pub async fn fetch<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project = state
        .manager
        .store()
        .project(&name)
        .ok_or_else(|| ApiError::not_found(format!("project not found: {}", name)))?;
    let agents = state.manager.store().agents_in_project(&name);
    Ok(Json(
        serde_json::json!({ "project": project, "agentCount": agents.len() }),
    ))
}

pub async fn update<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path(name): Path<String>,
    Json(body): Json<UpdateProject>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project = state.manager.update_project(&name, body.callback).await?;
    Ok(Json(serde_json::json!({ "project": project })))
}

pub async fn remove<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.manager.delete_project(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
