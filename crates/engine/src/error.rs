// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.

use ah_adapters::MuxError;
use ah_core::NameError;
use thiserror::Error;

/// Errors from manager operations.
///
/// Each variant maps 1:1 onto an HTTP failure class at the surface:
/// conflicts to 409, not-found to 404, validation to 400, mux transport
/// to 503/500.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("project already exists: {0}")]
    ProjectExists(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("agent id taken: {0}")]
    AgentIdTaken(String),
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("unknown provider: {0}")]
    ProviderUnknown(String),
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error(transparent)]
    Mux(#[from] MuxError),
}

impl ManagerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ManagerError::ProjectNotFound(_) | ManagerError::AgentNotFound(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ManagerError::ProjectExists(_) | ManagerError::AgentIdTaken(_)
        )
    }
}
