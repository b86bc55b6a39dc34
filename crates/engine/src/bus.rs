// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: bounded history ring with synchronous fan-out.
//!
//! `emit` assigns the next id, appends, evicts, and snapshots the
//! subscriber list under one lock; subscriber callbacks run outside it.
//! Callbacks MUST be non-blocking — slow consumers (SSE connections,
//! webhook delivery) buffer into their own bounded queues.

use ah_core::{Clock, EventFilter, EventId, EventPayload, NormalizedEvent, SystemClock};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

type Callback = Arc<dyn Fn(&NormalizedEvent) + Send + Sync>;

struct Subscriber {
    id: u64,
    filter: EventFilter,
    callback: Callback,
}

struct BusInner {
    next_seq: u64,
    next_subscriber: u64,
    capacity: usize,
    ring: VecDeque<NormalizedEvent>,
    subscribers: Vec<Subscriber>,
}

/// Diagnostic view of the bus.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusSnapshot {
    pub next_seq: u64,
    pub history_len: usize,
    pub capacity: usize,
    pub subscriber_count: usize,
}

/// Append-only event ring. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
    now: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, SystemClock)
    }

    pub fn with_clock<C: Clock>(capacity: usize, clock: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                next_seq: 1,
                next_subscriber: 1,
                capacity,
                ring: VecDeque::new(),
                subscribers: Vec::new(),
            })),
            now: Arc::new(move || clock.now()),
        }
    }

    /// Publish an event: assign the id, append, evict, fan out.
    ///
    /// The id counter never resets, so ids stay strictly monotonic even
    /// after history eviction.
    pub fn emit(
        &self,
        project: impl Into<String>,
        agent_id: Option<String>,
        payload: EventPayload,
    ) -> NormalizedEvent {
        let event;
        let recipients: Vec<Callback>;
        {
            let mut inner = self.inner.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            event = NormalizedEvent {
                id: EventId::from_seq(seq),
                ts: (self.now)(),
                project: project.into(),
                agent_id,
                payload,
            };
            inner.ring.push_back(event.clone());
            while inner.ring.len() > inner.capacity {
                inner.ring.pop_front();
            }
            // Snapshot matching subscribers so callbacks run lock-free
            recipients = inner
                .subscribers
                .iter()
                .filter(|s| s.filter.matches(&event))
                .map(|s| Arc::clone(&s.callback))
                .collect();
        }

        for callback in recipients {
            callback(&event);
        }
        event
    }

    /// Register a subscriber. Dropping the guard unsubscribes.
    pub fn subscribe<F>(&self, filter: EventFilter, callback: F) -> SubscriptionGuard
    where
        F: Fn(&NormalizedEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner.subscribers.push(Subscriber {
            id,
            filter,
            callback: Arc::new(callback),
        });
        SubscriptionGuard {
            bus: Arc::clone(&self.inner),
            id,
        }
    }

    /// Matching history, strictly after `since` when given, oldest first.
    pub fn history(
        &self,
        filter: &EventFilter,
        since: Option<&EventId>,
        limit: Option<usize>,
    ) -> Vec<NormalizedEvent> {
        let floor = since.and_then(EventId::seq).unwrap_or(0);
        let inner = self.inner.lock();
        let mut events: Vec<NormalizedEvent> = inner
            .ring
            .iter()
            .filter(|e| e.id.seq().is_some_and(|s| s > floor))
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        if let Some(limit) = limit {
            let len = events.len();
            if len > limit {
                events.drain(..len - limit);
            }
        }
        events
    }

    /// Seq of the most recently assigned id, 0 when nothing was emitted.
    pub fn last_seq(&self) -> u64 {
        self.inner.lock().next_seq - 1
    }

    pub fn snapshot(&self) -> BusSnapshot {
        let inner = self.inner.lock();
        BusSnapshot {
            next_seq: inner.next_seq,
            history_len: inner.ring.len(),
            capacity: inner.capacity,
            subscriber_count: inner.subscribers.len(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("EventBus")
            .field("next_seq", &snapshot.next_seq)
            .field("history_len", &snapshot.history_len)
            .field("subscribers", &snapshot.subscriber_count)
            .finish()
    }
}

/// Removes its subscriber from the bus on drop.
pub struct SubscriptionGuard {
    bus: Arc<Mutex<BusInner>>,
    id: u64,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let mut inner = self.bus.lock();
        inner.subscribers.retain(|s| s.id != self.id);
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard").field("id", &self.id).finish()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
