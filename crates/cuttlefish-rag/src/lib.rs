//! # cuttlefish-rag
//!
//! Answer generation on top of the routing and retrieval core.
//!
//! A request flows through:
//! 1. [`RoutingDecisionEngine`](cuttlefish_retrieval::RoutingDecisionEngine)
//! 2. the [`RetrievalStrategy`](cuttlefish_retrieval::RetrievalStrategy) for
//!    the decision
//! 3. [`ContextAssembler`], bounded by a character budget
//! 4. [`AnswerSynthesizer`], which masks empty completions with a fallback
//! 5. [`ResponseAssembler`]
//!
//! [`RagPipeline`] wires these together and bounds each request by a
//! deadline and a cancellation token.

pub mod context;
pub mod mock;
pub mod pipeline;
pub mod response;
pub mod synthesis;

pub use context::{ContextAssembler, ContextBlock, CONTEXT_SEPARATOR};
pub use pipeline::{AgentStatus, HealthStatus, PipelineConfig, PipelineHealth, RagPipeline};
pub use response::{RagAnswer, RagResponse, ResponseAssembler, ResponseMetadata};
pub use synthesis::{AnswerSynthesizer, Completer, Completion, FALLBACK_ANSWER};
