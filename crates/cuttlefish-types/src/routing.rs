//! Routing vocabulary shared by the decision engine, the strategies and the
//! response contract.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which retrieval path a request takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Single-shot, low-latency retrieval (default)
    Fast,

    /// Wider, multi-pass retrieval for users who opted to wait
    Comprehensive,

    /// Production incident: fastest path, prioritized ahead of queued work
    Incident,
}

impl Decision {
    /// Returns the wire name for this decision.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Fast => "FAST",
            Decision::Comprehensive => "COMPREHENSIVE",
            Decision::Incident => "INCIDENT",
        }
    }

    /// Method tag reported when the strategy for this decision fully succeeds.
    pub fn method(&self) -> RetrievalMethod {
        match self {
            Decision::Fast => RetrievalMethod::Fast,
            Decision::Comprehensive => RetrievalMethod::Comprehensive,
            Decision::Incident => RetrievalMethod::Incident,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing decision plus its human-readable justification.
///
/// Produced once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Selected path
    pub decision: Decision,

    /// Why this path was selected (never empty)
    pub reasoning: String,
}

/// Tag identifying which retrieval strategy produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalMethod {
    /// Fast retrieval on the default path
    Fast,
    /// Fast retrieval triggered by a production incident
    Incident,
    /// Every comprehensive pass succeeded
    Comprehensive,
    /// Some comprehensive passes failed; recall is reduced
    ComprehensivePartial,
}

impl RetrievalMethod {
    /// Returns the wire name for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMethod::Fast => "fast",
            RetrievalMethod::Incident => "incident",
            RetrievalMethod::Comprehensive => "comprehensive",
            RetrievalMethod::ComprehensivePartial => "comprehensive-partial",
        }
    }

    /// True when the method signals reduced recall.
    pub fn is_degraded(&self) -> bool {
        matches!(self, RetrievalMethod::ComprehensivePartial)
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_wire_format() {
        assert_eq!(
            serde_json::to_string(&Decision::Comprehensive).unwrap(),
            "\"COMPREHENSIVE\""
        );
        let decoded: Decision = serde_json::from_str("\"INCIDENT\"").unwrap();
        assert_eq!(decoded, Decision::Incident);
    }

    #[test]
    fn test_method_wire_format() {
        assert_eq!(
            serde_json::to_string(&RetrievalMethod::ComprehensivePartial).unwrap(),
            "\"comprehensive-partial\""
        );
        assert_eq!(RetrievalMethod::Incident.to_string(), "incident");
    }

    #[test]
    fn test_decision_method() {
        assert_eq!(Decision::Fast.method(), RetrievalMethod::Fast);
        assert_eq!(Decision::Incident.method(), RetrievalMethod::Incident);
        assert!(!Decision::Comprehensive.method().is_degraded());
    }
}
