// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ah-daemon (ahd)
//!
//! Hosts the supervisory engine behind an HTTP surface: REST for
//! commands, SSE for the event stream. Owns process-level concerns:
//! configuration loading, the lock file, tracing, and signal-driven
//! shutdown.

pub mod http;
pub mod lifecycle;

pub use lifecycle::{Config, DaemonState, LifecycleError};
