// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque credential handles.
//!
//! Subscriptions are produced and validated by the credential-discovery
//! layer; the engine only attaches them to agents and composes their env
//! into the spawn command. Secret values never appear in listings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sealed credential token attached to an agent at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub provider: String,
    pub mode: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Environment overrides injected into the agent process
    #[serde(default, skip_serializing)]
    pub env: BTreeMap<String, String>,
}

impl Subscription {
    /// Redacted summary for the subscriptions listing.
    pub fn summary(&self) -> SubscriptionSummary {
        SubscriptionSummary {
            id: self.id.clone(),
            provider: self.provider.clone(),
            mode: self.mode.clone(),
        }
    }
}

/// What the HTTP surface exposes about a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub id: String,
    pub provider: String,
    pub mode: String,
}
