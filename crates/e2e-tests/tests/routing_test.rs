//! Routing E2E tests through `/debug/routing`.
//!
//! Verifies precedence over every flag combination and that the diagnostic
//! path never touches the collaborators.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::{query_body, TestHarness, INCIDENT_QUERY, LEAK_QUERY};

#[tokio::test]
async fn test_precedence_over_all_flag_combinations() {
    let harness = TestHarness::new();

    let cases = [
        (false, false, "FAST"),
        (true, false, "COMPREHENSIVE"),
        (false, true, "INCIDENT"),
        (true, true, "INCIDENT"),
    ];

    for (can_wait, incident, expected) in cases {
        let (status, body) = harness
            .post("/debug/routing", query_body(LEAK_QUERY, can_wait, incident))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["routing_decision"], expected,
            "can_wait={can_wait} incident={incident}"
        );
        assert!(!body["routing_reasoning"].as_str().unwrap().is_empty());
    }

    assert_eq!(harness.embedder.calls(), 0);
    assert_eq!(harness.index.calls(), 0);
    assert_eq!(harness.completer.calls(), 0);
}

#[tokio::test]
async fn test_reasoning_matches_decision() {
    let harness = TestHarness::new();

    let (_, fast) = harness
        .post("/debug/routing", query_body(LEAK_QUERY, false, false))
        .await;
    assert!(fast["routing_reasoning"]
        .as_str()
        .unwrap()
        .contains("No override signal"));

    let (_, comprehensive) = harness
        .post("/debug/routing", query_body(LEAK_QUERY, true, false))
        .await;
    assert!(comprehensive["routing_reasoning"]
        .as_str()
        .unwrap()
        .contains("broader"));

    let (_, incident) = harness
        .post("/debug/routing", query_body(INCIDENT_QUERY, true, true))
        .await;
    let reasoning = incident["routing_reasoning"].as_str().unwrap();
    assert!(reasoning.contains("urgent"));
    assert!(reasoning.contains("fastest"));
}

#[tokio::test]
async fn test_routing_is_pure() {
    let harness = TestHarness::new();
    let body = query_body(INCIDENT_QUERY, true, false);

    let (_, first) = harness.post("/debug/routing", body.clone()).await;
    let (_, second) = harness.post("/debug/routing", body).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_flags_default_to_false() {
    let harness = TestHarness::new();
    let (status, body) = harness
        .post("/debug/routing", json!({"query": LEAK_QUERY}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["routing_decision"], "FAST");
}

#[tokio::test]
async fn test_query_text_does_not_change_decision() {
    let harness = TestHarness::new();
    let (_, leak) = harness
        .post("/debug/routing", query_body(LEAK_QUERY, false, false))
        .await;
    let (_, outage) = harness
        .post("/debug/routing", query_body(INCIDENT_QUERY, false, false))
        .await;
    assert_eq!(leak, outage);
}
