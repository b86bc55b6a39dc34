// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ah-engine: the supervisory engine
//!
//! Four cooperating subsystems share one process: the manager owns every
//! project/agent mutation and keeps store, mux, and bus consistent; the
//! poller turns pane captures into statuses and events; the bus fans
//! normalized events out to subscribers; the webhook dispatcher delivers
//! terminal events to per-agent callbacks with retry.

pub mod bus;
pub mod diff;
pub mod error;
pub mod fusion;
pub mod ident;
pub mod manager;
pub mod poller;
pub mod store;
pub mod webhook;

pub use bus::{BusSnapshot, EventBus, SubscriptionGuard};
pub use error::ManagerError;
pub use manager::{AgentDebug, Manager, ManagerDeps};
pub use poller::Poller;
pub use store::Store;
pub use webhook::{DeliveryRecord, WebhookDispatcher, WebhookPayload};
