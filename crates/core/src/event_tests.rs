// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn sample(payload: EventPayload) -> NormalizedEvent {
    NormalizedEvent {
        id: EventId::from_seq(7),
        ts: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        project: "alpha".to_string(),
        agent_id: Some("codex-brave-otter".to_string()),
        payload,
    }
}

#[test]
fn event_id_round_trip() {
    let id = EventId::from_seq(42);
    assert_eq!(id.as_str(), "evt-42");
    assert_eq!(id.seq(), Some(42));
    assert_eq!(EventId::parse("evt-42"), Some(id));
    assert_eq!(EventId::parse("evt-"), None);
    assert_eq!(EventId::parse("42"), None);
}

#[test]
fn status_changed_serializes_with_tag() {
    let event = sample(EventPayload::StatusChanged {
        from: AgentStatus::Starting,
        to: AgentStatus::Idle,
        source: Some(StatusSource::UiParser),
    });
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "status_changed");
    assert_eq!(json["from"], "starting");
    assert_eq!(json["to"], "idle");
    assert_eq!(json["source"], "ui-parser");
    assert_eq!(json["id"], "evt-7");
    assert_eq!(json["agentId"], "codex-brave-otter");
}

#[test]
fn exit_code_is_camel_case_and_nullable() {
    let event = sample(EventPayload::AgentExited { exit_code: None });
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "agent_exited");
    assert!(json["exitCode"].is_null());
}

#[test]
fn payload_round_trips() {
    let event = sample(EventPayload::QuestionAsked {
        question: "Deploy?".to_string(),
        options: vec![QuestionOption {
            label: "yes".to_string(),
        }],
    });
    let json = serde_json::to_string(&event).unwrap();
    let back: NormalizedEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[yare::parameterized(
    matches_project    = { EventFilter::for_project("alpha"), true },
    wrong_project      = { EventFilter::for_project("beta"), false },
    matches_agent      = { EventFilter::for_agent("alpha", "codex-brave-otter"), true },
    wrong_agent        = { EventFilter::for_agent("alpha", "other"), false },
    empty_matches_all  = { EventFilter::default(), true },
)]
fn filter_matching(filter: EventFilter, expected: bool) {
    let event = sample(EventPayload::AgentStarted);
    assert_eq!(filter.matches(&event), expected);
}

#[test]
fn filter_by_type() {
    let filter = EventFilter {
        types: Some(vec!["output".to_string(), "error".to_string()]),
        ..EventFilter::default()
    };
    assert!(filter.matches(&sample(EventPayload::Output {
        text: "hi".to_string()
    })));
    assert!(!filter.matches(&sample(EventPayload::AgentStarted)));
}
