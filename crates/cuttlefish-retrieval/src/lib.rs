//! # cuttlefish-retrieval
//!
//! Routing and multi-strategy retrieval core for the Cuttlefish ticket RAG
//! service.
//!
//! ## Core Concepts
//!
//! - **Routing Decision**: FAST, COMPREHENSIVE or INCIDENT, chosen from the
//!   caller's `production_incident` and `user_can_wait` signals
//! - **Retrieval Strategy**: How tickets are fetched for a decision
//!   (single-shot fast retrieval, or multi-pass comprehensive retrieval)
//! - **Sub-query Generation**: Pluggable decomposition of compound queries
//! - **Merge**: Order-independent union of result sets, max score per ticket
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cuttlefish_retrieval::{RetrievalContext, RoutingDecisionEngine, StrategyConfig, StrategySet};
//!
//! // 1. Decide
//! let engine = RoutingDecisionEngine::new();
//! let routing = engine.decide("How to fix memory leaks in XML parser", false, false)?;
//!
//! // 2. Retrieve with the strategy for that decision
//! let strategies = StrategySet::new(&StrategyConfig::default());
//! let result = strategies
//!     .for_decision(routing.decision)
//!     .retrieve(query, RetrievalContext { embedder, index, credential: None })
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`router`]: Routing decision engine
//! - [`strategy`]: Fast and comprehensive retrieval strategies
//! - [`subquery`]: Sub-query generators
//! - [`merge`]: Ranking and merging
//! - [`provider`]: Embedding and vector index collaborator traits
//! - [`mock`]: In-memory collaborators for tests

pub mod merge;
pub mod mock;
pub mod provider;
pub mod router;
pub mod strategy;
pub mod subquery;

pub use merge::{merge_ranked, sort_ranked};
pub use provider::{Embedder, SearchFilter, VectorIndex};
pub use router::RoutingDecisionEngine;
pub use strategy::{
    CallTimeouts, ComprehensiveRetrieval, FastRetrieval, PassOutcome, RetrievalContext,
    RetrievalResult, RetrievalStrategy, StrategyConfig, StrategySet,
};
pub use subquery::{ConjunctionSplitter, NoSubQueries, SubQueryGenerator};
