//! Outward-facing response types.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use cuttlefish_retrieval::RetrievalResult;
use cuttlefish_types::{Decision, RetrievalMethod, RoutingDecision, Ticket};

/// Diagnostics returned with every routed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub routing_decision: Decision,
    pub routing_reasoning: String,
    pub retrieval_method: RetrievalMethod,

    /// Seconds spent from routing to response assembly
    pub processing_time: f64,

    /// Always equal to the length of the response context
    pub num_tickets_found: usize,
}

/// Answer to a routed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    pub context: Vec<Ticket>,
    pub metadata: ResponseMetadata,
}

/// Answer without routing metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RagAnswer {
    pub text: String,
    pub context: Vec<Ticket>,
}

/// Combines pipeline outputs into a [`RagResponse`].
pub struct ResponseAssembler;

impl ResponseAssembler {
    /// Assemble the response. Processing time is measured last, from `started`.
    pub fn assemble(
        routing: RoutingDecision,
        retrieval: RetrievalResult,
        answer: String,
        started: Instant,
    ) -> RagResponse {
        let context = retrieval.tickets;
        let metadata = ResponseMetadata {
            routing_decision: routing.decision,
            routing_reasoning: routing.reasoning,
            retrieval_method: retrieval.method,
            processing_time: 0.0,
            num_tickets_found: context.len(),
        };

        let mut response = RagResponse {
            answer,
            context,
            metadata,
        };
        response.metadata.processing_time = started.elapsed().as_secs_f64();
        response
    }
}
