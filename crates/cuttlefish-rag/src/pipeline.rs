//! Request orchestration.
//!
//! `RagPipeline` owns the configured components and the shared collaborators,
//! and runs one request through routing, retrieval, context assembly,
//! synthesis and response assembly. Every entry point is bounded by the
//! request timeout and aborts promptly when its cancellation token fires.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cuttlefish_retrieval::{
    Embedder, RetrievalContext, RetrievalResult, RetrievalStrategy, RoutingDecisionEngine,
    StrategyConfig, StrategySet, SubQueryGenerator, VectorIndex,
};
use cuttlefish_types::{Query, RagError, RoutingDecision, Settings, Stage};

use crate::context::ContextAssembler;
use crate::response::{RagAnswer, RagResponse, ResponseAssembler};
use crate::synthesis::{AnswerSynthesizer, Completer};

/// Construction-time configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub strategies: StrategyConfig,
    pub context_max_chars: usize,
    pub completion_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyConfig::default(),
            context_max_chars: crate::context::DEFAULT_MAX_CHARS,
            completion_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            strategies: StrategyConfig::from_settings(settings),
            context_max_chars: settings.context.max_chars,
            completion_timeout: settings.timeouts.completion(),
            request_timeout: settings.timeouts.request(),
        }
    }
}

/// Readiness of a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Ready,
    Unconfigured,
    Unreachable,
}

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Error,
}

/// Health snapshot of every agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineHealth {
    pub status: HealthStatus,
    pub agents: BTreeMap<String, AgentStatus>,
}

/// The retrieval-augmented answering pipeline.
pub struct RagPipeline {
    router: RoutingDecisionEngine,
    strategies: StrategySet,
    context: ContextAssembler,
    synthesizer: AnswerSynthesizer,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    completer: Arc<dyn Completer>,
    config: PipelineConfig,
}

impl RagPipeline {
    pub fn new(
        config: PipelineConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        completer: Arc<dyn Completer>,
    ) -> Self {
        Self {
            router: RoutingDecisionEngine::new(),
            strategies: StrategySet::new(&config.strategies),
            context: ContextAssembler::new(config.context_max_chars),
            synthesizer: AnswerSynthesizer::new(config.completion_timeout),
            embedder,
            index,
            completer,
            config,
        }
    }

    /// Replace the sub-query generator used by comprehensive retrieval.
    pub fn with_generator(mut self, generator: Arc<dyn SubQueryGenerator>) -> Self {
        self.strategies = StrategySet::with_generator(&self.config.strategies, generator);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Routing decision only. Makes no external calls.
    pub fn route(&self, query: &Query) -> Result<RoutingDecision, RagError> {
        self.router.decide(
            query.text(),
            query.user_can_wait(),
            query.production_incident(),
        )
    }

    /// Route, retrieve, synthesize and assemble a response.
    pub async fn process(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<RagResponse, RagError> {
        self.guarded(cancel, self.run(query)).await
    }

    /// Fast retrieval without routing or synthesis.
    pub async fn similar(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<RetrievalResult, RagError> {
        self.guarded(cancel, async {
            validate(query)?;
            self.strategies
                .fast()
                .retrieve(query.text(), self.retrieval_context(query))
                .await
        })
        .await
    }

    /// Fast retrieval plus synthesis, without routing metadata.
    pub async fn simple_rag(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<RagAnswer, RagError> {
        self.guarded(cancel, async {
            validate(query)?;
            let retrieval = self
                .strategies
                .fast()
                .retrieve(query.text(), self.retrieval_context(query))
                .await?;
            let answer = self.answer(query, &retrieval).await?;
            Ok(RagAnswer {
                text: answer,
                context: retrieval.tickets,
            })
        })
        .await
    }

    /// Readiness of each agent.
    ///
    /// Retrieval agents need an embedding credential and a reachable index;
    /// synthesis needs a completion credential. Routing is always ready.
    pub async fn health(&self) -> PipelineHealth {
        let index_reachable = match tokio::time::timeout(
            self.config.strategies.timeouts.search,
            self.index.ping(),
        )
        .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Vector index ping failed");
                false
            }
            Err(_) => {
                warn!("Vector index ping timed out");
                false
            }
        };

        let retrieval = if !index_reachable {
            AgentStatus::Unreachable
        } else if self.embedder.has_default_credential() {
            AgentStatus::Ready
        } else {
            AgentStatus::Unconfigured
        };
        let synthesis = if self.completer.has_default_credential() {
            AgentStatus::Ready
        } else {
            AgentStatus::Unconfigured
        };

        let agents: BTreeMap<String, AgentStatus> = [
            ("routing", AgentStatus::Ready),
            ("fast_retrieval", retrieval),
            ("comprehensive_retrieval", retrieval),
            ("incident_retrieval", retrieval),
            ("synthesis", synthesis),
        ]
        .into_iter()
        .map(|(name, status)| (name.to_string(), status))
        .collect();

        let status = if !index_reachable {
            HealthStatus::Error
        } else if agents.values().all(|s| *s == AgentStatus::Ready) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        PipelineHealth { status, agents }
    }

    async fn run(&self, query: &Query) -> Result<RagResponse, RagError> {
        let started = Instant::now();

        let routing = self.route(query)?;
        info!(
            decision = routing.decision.as_str(),
            reasoning = %routing.reasoning,
            "Routed query"
        );

        let retrieval = self
            .strategies
            .for_decision(routing.decision)
            .retrieve(query.text(), self.retrieval_context(query))
            .await?;
        debug!(
            method = retrieval.method.as_str(),
            tickets = retrieval.count(),
            elapsed_ms = retrieval.elapsed.as_millis() as u64,
            "Retrieved tickets"
        );

        let answer = self.answer(query, &retrieval).await?;
        let response = ResponseAssembler::assemble(routing, retrieval, answer, started);

        info!(
            decision = response.metadata.routing_decision.as_str(),
            method = response.metadata.retrieval_method.as_str(),
            tickets = response.metadata.num_tickets_found,
            elapsed_ms = (response.metadata.processing_time * 1000.0) as u64,
            "Request complete"
        );
        Ok(response)
    }

    async fn answer(&self, query: &Query, retrieval: &RetrievalResult) -> Result<String, RagError> {
        let block = self.context.assemble(&retrieval.tickets);
        if block.dropped > 0 {
            debug!(
                dropped = block.dropped,
                max_chars = self.context.max_chars(),
                "Context budget exceeded, dropped lowest-scored tickets"
            );
        }
        self.synthesizer
            .synthesize(
                query.text(),
                &block,
                self.completer.as_ref(),
                query.credential(),
            )
            .await
    }

    fn retrieval_context<'a>(&'a self, query: &'a Query) -> RetrievalContext<'a> {
        RetrievalContext {
            embedder: self.embedder.as_ref(),
            index: self.index.as_ref(),
            credential: query.credential(),
        }
    }

    /// Bound `work` by the request timeout and the cancellation token.
    async fn guarded<T>(
        &self,
        cancel: &CancellationToken,
        work: impl Future<Output = Result<T, RagError>>,
    ) -> Result<T, RagError> {
        let deadline = self.config.request_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Request cancelled before completion");
                Err(RagError::Cancelled)
            }
            outcome = tokio::time::timeout(deadline, work) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_ms = deadline.as_millis() as u64, "Request deadline exceeded");
                    Err(RagError::Timeout {
                        stage: Stage::Request,
                        elapsed_ms: deadline.as_millis() as u64,
                    })
                }
            },
        }
    }
}

fn validate(query: &Query) -> Result<(), RagError> {
    if query.text().trim().is_empty() {
        return Err(RagError::InvalidInput("query must not be empty".to_string()));
    }
    Ok(())
}
