// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSE event streams.
//!
//! On connect the stream replays bus history strictly after `since`,
//! then goes live. Each connection owns a bounded queue: the bus
//! callback never blocks, a slow consumer first loses its oldest
//! buffered frames and is then disconnected.

use super::{ApiError, AppState};
use ah_adapters::MuxAdapter;
use ah_core::{Clock, EventFilter, EventId, NormalizedEvent};
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, Sse};
use futures_util::stream::{self, Stream, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Slow-consumer threshold: at this many queued frames the connection
/// is sacrificed to protect the daemon.
const QUEUE_CAP: usize = 1024;
const HEARTBEAT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub since: Option<String>,
}

pub async fn project_stream<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path(project): Path<String>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if state.manager.store().project(&project).is_none() {
        return Err(ApiError::not_found(format!("project not found: {}", project)));
    }
    Ok(stream_for(&state, EventFilter::for_project(project), params.since))
}

pub async fn agent_stream<M: MuxAdapter, C: Clock>(
    State(state): State<AppState<M, C>>,
    Path((project, id)): Path<(String, String)>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if state.manager.store().agent_in_project(&project, &id).is_none() {
        return Err(ApiError::not_found(format!("agent not found: {}/{}", project, id)));
    }
    Ok(stream_for(&state, EventFilter::for_agent(project, id), params.since))
}

/// Per-connection bounded frame queue.
struct ConnQueue {
    frames: Mutex<VecDeque<NormalizedEvent>>,
    notify: Notify,
    closed: AtomicBool,
}

impl ConnQueue {
    fn new() -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn push(&self, event: NormalizedEvent) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        {
            let mut frames = self.frames.lock();
            if frames.len() >= QUEUE_CAP {
                frames.pop_front();
                self.closed.store(true, Ordering::Release);
                tracing::warn!("sse consumer too slow, closing connection");
            }
            frames.push_back(event);
        }
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<NormalizedEvent> {
        self.frames.lock().pop_front()
    }

    fn done(&self) -> bool {
        self.closed.load(Ordering::Acquire) && self.frames.lock().is_empty()
    }
}

fn event_frame(event: &NormalizedEvent) -> Event {
    Event::default()
        .id(event.id.as_str())
        .event(event.payload.kind())
        .data(serde_json::to_string(event).unwrap_or_default())
}

fn heartbeat_frame() -> Event {
    Event::default().event("heartbeat").data("")
}

struct Live {
    queue: Arc<ConnQueue>,
    // Held so the bus subscription survives as long as the stream
    _guard: ah_engine::SubscriptionGuard,
    min_seq: u64,
    heartbeat: tokio::time::Interval,
}

fn stream_for<M: MuxAdapter, C: Clock>(
    state: &AppState<M, C>,
    filter: EventFilter,
    since: Option<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let bus = state.manager.bus().clone();
    let queue = Arc::new(ConnQueue::new());

    // Subscribe before snapshotting history so no event can fall into
    // the gap; replayed ids are deduplicated below via min_seq.
    let sink = Arc::clone(&queue);
    let guard = bus.subscribe(filter.clone(), move |event| sink.push(event.clone()));

    let since_id = since.as_deref().and_then(EventId::parse);
    let history = bus.history(&filter, since_id.as_ref(), None);
    let min_seq = history
        .last()
        .and_then(|e| e.id.seq())
        .or_else(|| since_id.as_ref().and_then(EventId::seq))
        .unwrap_or(0);

    let replay = stream::iter(
        history
            .into_iter()
            .map(|e| Ok::<_, Infallible>(event_frame(&e)))
            .collect::<Vec<_>>(),
    );

    let mut heartbeat = tokio::time::interval_at(
        tokio::time::Instant::now() + HEARTBEAT,
        HEARTBEAT,
    );
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let live = stream::unfold(
        Live {
            queue,
            _guard: guard,
            min_seq,
            heartbeat,
        },
        |mut live| async move {
            loop {
                if live.queue.done() {
                    return None;
                }
                if let Some(event) = live.queue.pop() {
                    if event.id.seq().is_some_and(|s| s <= live.min_seq) {
                        continue;
                    }
                    let frame = event_frame(&event);
                    return Some((Ok::<_, Infallible>(frame), live));
                }
                tokio::select! {
                    _ = live.queue.notify.notified() => {}
                    _ = live.heartbeat.tick() => {
                        return Some((Ok::<_, Infallible>(heartbeat_frame()), live));
                    }
                }
            }
        },
    );

    Sse::new(replay.chain(live))
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
