// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface: a thin adapter over the manager.
//!
//! Routes live under `/api/v1`. JSON in, JSON out; errors use the shape
//! `{error: CODE, message}`. When a bearer token is configured it is
//! required on every route.

mod agents;
mod events;
mod projects;
mod webhook;

use ah_adapters::{MuxAdapter, MuxError};
use ah_core::Clock;
use ah_engine::{Manager, ManagerError, WebhookDispatcher};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared handler state.
pub struct AppState<M: MuxAdapter, C: Clock> {
    pub manager: Manager<M, C>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub start_time: Instant,
    pub auth_token: Option<String>,
}

impl<M: MuxAdapter, C: Clock> Clone for AppState<M, C> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
            start_time: self.start_time,
            auth_token: self.auth_token.clone(),
        }
    }
}

/// Typed API failure.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_BODY", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<ManagerError> for ApiError {
    fn from(error: ManagerError) -> Self {
        let message = error.to_string();
        match error {
            ManagerError::ProjectExists(_) | ManagerError::AgentIdTaken(_) => {
                Self::new(StatusCode::CONFLICT, "CONFLICT", message)
            }
            ManagerError::ProjectNotFound(_) | ManagerError::AgentNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
            }
            ManagerError::ProviderUnknown(_) => {
                Self::new(StatusCode::BAD_REQUEST, "PROVIDER_UNKNOWN", message)
            }
            ManagerError::InvalidName(_) => Self::invalid_body(message),
            ManagerError::Mux(MuxError::MuxNotInstalled) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "MUX_UNAVAILABLE", message)
            }
            ManagerError::Mux(e) if e.is_not_found() => Self::not_found(message),
            ManagerError::Mux(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "COMMAND_FAILED", message)
            }
        }
    }
}

/// Build the full router for the daemon.
pub fn router<M: MuxAdapter, C: Clock>(state: AppState<M, C>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/projects", get(projects::list).post(projects::create))
        .route(
            "/projects/{name}",
            get(projects::fetch)
                .patch(projects::update)
                .delete(projects::remove),
        )
        .route(
            "/projects/{project}/agents",
            get(agents::list).post(agents::create),
        )
        .route(
            "/projects/{project}/agents/{id}",
            get(agents::fetch).delete(agents::remove),
        )
        .route("/projects/{project}/agents/{id}/input", post(agents::input))
        .route("/projects/{project}/agents/{id}/abort", post(agents::abort))
        .route("/projects/{project}/agents/{id}/output", get(agents::output))
        .route(
            "/projects/{project}/agents/{id}/messages",
            get(agents::messages),
        )
        .route(
            "/projects/{project}/agents/{id}/messages/last",
            get(agents::last_message),
        )
        .route("/projects/{project}/agents/{id}/debug", get(agents::debug))
        .route("/projects/{project}/events", get(events::project_stream))
        .route(
            "/projects/{project}/agents/{id}/events",
            get(events::agent_stream),
        )
        .route("/subscriptions", get(subscriptions))
        .route("/webhook/status", get(webhook::status))
        .route("/webhook/test", post(webhook::test))
        .route("/webhook/probe-receiver", post(webhook::probe))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<M, C>,
        ))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn require_auth<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    let Some(ref expected) = state.auth_token else {
        return next.run(request).await;
    };
    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected.as_str()) {
        next.run(request).await
    } else {
        ApiError::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "missing or invalid bearer token",
        )
        .into_response()
    }
}

/// Always succeeds; degradation is reported, not failed.
async fn health<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
) -> Json<serde_json::Value> {
    let (projects, agents) = state.manager.store().counts();
    Json(serde_json::json!({
        "uptime": state.start_time.elapsed().as_secs(),
        "projects": projects,
        "agents": agents,
        "muxAvailable": state.manager.mux_available(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn subscriptions<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
) -> Json<serde_json::Value> {
    let summaries = state.manager.subscription_summaries();
    Json(serde_json::json!({ "subscriptions": summaries }))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
