//! Routing decision engine.
//!
//! Decides how hard to search for a query from two caller-supplied signals:
//! `production_incident` and `user_can_wait`. Precedence, first match wins:
//!
//! 1. production incident -> INCIDENT
//! 2. user can wait -> COMPREHENSIVE
//! 3. otherwise -> FAST
//!
//! The query text is validated but does not influence the decision.

use tracing::debug;

use cuttlefish_types::{Decision, RagError, RoutingDecision};

const INCIDENT_REASONING: &str = "Production incident flagged: urgent request, so the fastest \
                                  available retrieval path is used and prioritized ahead of \
                                  queued work.";

const COMPREHENSIVE_REASONING: &str = "User can wait: opted into a broader, slower comprehensive \
                                       search for better recall.";

const FAST_REASONING: &str = "No override signal present (user_can_wait and \
                              production_incident both false): default low-latency fast \
                              retrieval.";

/// Routing decision engine.
///
/// Pure and deterministic: identical inputs always produce identical
/// decisions and reasoning, so the diagnostic endpoint and the full pipeline
/// can call it independently and agree.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingDecisionEngine;

impl RoutingDecisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decide which retrieval path a query takes.
    ///
    /// Fails with `InvalidInput` when the query is blank.
    pub fn decide(
        &self,
        query_text: &str,
        user_can_wait: bool,
        production_incident: bool,
    ) -> Result<RoutingDecision, RagError> {
        if query_text.trim().is_empty() {
            return Err(RagError::InvalidInput(
                "query must not be empty".to_string(),
            ));
        }

        let (decision, reasoning) = if production_incident {
            (Decision::Incident, INCIDENT_REASONING)
        } else if user_can_wait {
            (Decision::Comprehensive, COMPREHENSIVE_REASONING)
        } else {
            (Decision::Fast, FAST_REASONING)
        };

        debug!(
            decision = decision.as_str(),
            user_can_wait, production_incident, "Routing decision made"
        );

        Ok(RoutingDecision {
            decision,
            reasoning: reasoning.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "How to fix memory leaks in XML parser";

    #[test]
    fn test_default_is_fast() {
        let engine = RoutingDecisionEngine::new();
        let result = engine.decide(QUERY, false, false).unwrap();
        assert_eq!(result.decision, Decision::Fast);
        assert!(result.reasoning.contains("No override signal"));
    }

    #[test]
    fn test_can_wait_is_comprehensive() {
        let engine = RoutingDecisionEngine::new();
        let result = engine.decide(QUERY, true, false).unwrap();
        assert_eq!(result.decision, Decision::Comprehensive);
        assert!(result.reasoning.contains("broader"));
    }

    #[test]
    fn test_incident_dominates_all_combinations() {
        let engine = RoutingDecisionEngine::new();
        for can_wait in [false, true] {
            let result = engine
                .decide("Production system down with ClassCastException", can_wait, true)
                .unwrap();
            assert_eq!(result.decision, Decision::Incident);
            assert!(result.reasoning.contains("urgent"));
            assert!(result.reasoning.contains("fastest"));
        }
    }

    #[test]
    fn test_decide_is_pure() {
        let engine = RoutingDecisionEngine::new();
        for (can_wait, incident) in [(false, false), (true, false), (false, true), (true, true)] {
            let first = engine.decide(QUERY, can_wait, incident).unwrap();
            let second = engine.decide(QUERY, can_wait, incident).unwrap();
            assert_eq!(first, second);
            assert!(!first.reasoning.is_empty());
        }
    }

    #[test]
    fn test_text_does_not_influence_decision() {
        let engine = RoutingDecisionEngine::new();
        let a = engine.decide("production outage right now!!", false, false).unwrap();
        let b = engine.decide("minor typo in docs", false, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_blank_query_rejected() {
        let engine = RoutingDecisionEngine::new();
        for text in ["", "   ", "\n\t"] {
            let err = engine.decide(text, false, true).unwrap_err();
            assert!(matches!(err, RagError::InvalidInput(_)));
        }
    }
}
