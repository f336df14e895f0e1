//! # cuttlefish-types
//!
//! Shared domain types for the Cuttlefish ticket RAG service.
//!
//! This crate defines the data structures used throughout the system:
//! - Query: An incoming support question plus its urgency signals
//! - RoutingDecision: Which retrieval strategy runs, and why
//! - Ticket: A read-only projection of an indexed issue-tracker record
//! - Errors: The stage-aware error taxonomy surfaced to callers
//! - Settings: Layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use cuttlefish_types::{Decision, Query};
//!
//! let query = Query::new("How to fix memory leaks in XML parser", false, false);
//! assert!(!query.production_incident());
//! assert_eq!(Decision::Fast.as_str(), "FAST");
//! ```

pub mod config;
pub mod error;
pub mod query;
pub mod routing;
pub mod ticket;

pub use config::{
    ContextSettings, OpenAiSettings, QdrantSettings, RetrievalSettings, Settings, TimeoutSettings,
};
pub use error::{ConfigError, ProviderError, RagError, Stage};
pub use query::Query;
pub use routing::{Decision, RetrievalMethod, RoutingDecision};
pub use ticket::{PointId, ScoredPoint, Ticket};
