//! Retrieval strategies.
//!
//! A closed set of strategies sits behind one trait, selected once per request
//! by the routing decision:
//!
//! - `FastRetrieval`: one embedding call, one search call. Serves FAST and
//!   INCIDENT (same mechanics, different method tag).
//! - `ComprehensiveRetrieval`: the original query at a wider `top_k` plus any
//!   generated sub-queries, searched concurrently and merged.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use secrecy::SecretString;
use tracing::{debug, info, warn};

use cuttlefish_types::{
    Decision, ProviderError, RagError, RetrievalMethod, Settings, Stage, Ticket,
};

use crate::merge::{merge_ranked, sort_ranked};
use crate::provider::{Embedder, SearchFilter, VectorIndex};
use crate::subquery::{ConjunctionSplitter, SubQueryGenerator};

/// Outcome of one embed+search pass.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    /// Query text searched by this pass
    pub query: String,

    /// Whether this pass searched the original query
    pub primary: bool,

    /// Tickets returned
    pub hits: usize,

    /// Error message if the pass failed
    pub error: Option<String>,

    /// Pass duration in milliseconds
    pub elapsed_ms: u64,
}

/// Tickets produced by a strategy, with diagnostics.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// Descending score, ties by ascending id
    pub tickets: Vec<Ticket>,

    /// Which strategy ran (and whether it degraded)
    pub method: RetrievalMethod,

    /// Time spent retrieving
    pub elapsed: Duration,

    /// Per-pass detail
    pub passes: Vec<PassOutcome>,
}

impl RetrievalResult {
    /// True when some passes failed and recall is reduced.
    pub fn is_degraded(&self) -> bool {
        self.method.is_degraded()
    }

    pub fn count(&self) -> usize {
        self.tickets.len()
    }
}

/// Collaborators and credential for one retrieval.
#[derive(Clone, Copy)]
pub struct RetrievalContext<'a> {
    pub embedder: &'a dyn Embedder,
    pub index: &'a dyn VectorIndex,
    pub credential: Option<&'a SecretString>,
}

/// Deadlines for individual collaborator calls.
#[derive(Debug, Clone, Copy)]
pub struct CallTimeouts {
    pub embed: Duration,
    pub search: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            embed: Duration::from_secs(10),
            search: Duration::from_secs(10),
        }
    }
}

/// A way of turning a query into ranked tickets.
#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    /// Method tag reported on full success.
    fn method(&self) -> RetrievalMethod;

    /// Retrieve tickets for `query`.
    async fn retrieve(
        &self,
        query: &str,
        ctx: RetrievalContext<'_>,
    ) -> Result<RetrievalResult, RagError>;
}

/// Embed `query`, search the index, and rank the hits.
async fn run_pass(
    query: &str,
    top_k: usize,
    filter: Option<&SearchFilter>,
    timeouts: CallTimeouts,
    ctx: RetrievalContext<'_>,
) -> Result<Vec<Ticket>, RagError> {
    let vector = match tokio::time::timeout(timeouts.embed, ctx.embedder.embed(query, ctx.credential))
        .await
    {
        Ok(result) => result.map_err(RagError::embedding)?,
        Err(_) => {
            return Err(RagError::Timeout {
                stage: Stage::Embedding,
                elapsed_ms: timeouts.embed.as_millis() as u64,
            })
        }
    };

    let points = match tokio::time::timeout(timeouts.search, ctx.index.search(&vector, top_k, filter))
        .await
    {
        Ok(result) => result.map_err(RagError::index)?,
        Err(_) => {
            return Err(RagError::Timeout {
                stage: Stage::Index,
                elapsed_ms: timeouts.search.as_millis() as u64,
            })
        }
    };

    let mut tickets: Vec<Ticket> = points.into_iter().map(Ticket::from_point).collect();
    sort_ranked(&mut tickets);
    tickets.truncate(top_k);
    Ok(tickets)
}

/// Single-shot retrieval.
#[derive(Debug, Clone)]
pub struct FastRetrieval {
    top_k: usize,
    method: RetrievalMethod,
    filter: Option<SearchFilter>,
    timeouts: CallTimeouts,
}

impl FastRetrieval {
    /// Fast path for the default decision.
    pub fn fast(top_k: usize) -> Self {
        Self {
            top_k,
            method: RetrievalMethod::Fast,
            filter: None,
            timeouts: CallTimeouts::default(),
        }
    }

    /// Fast path triggered by a production incident.
    pub fn incident(top_k: usize) -> Self {
        Self {
            method: RetrievalMethod::Incident,
            ..Self::fast(top_k)
        }
    }

    pub fn with_filter(mut self, filter: Option<SearchFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[async_trait]
impl RetrievalStrategy for FastRetrieval {
    fn method(&self) -> RetrievalMethod {
        self.method
    }

    async fn retrieve(
        &self,
        query: &str,
        ctx: RetrievalContext<'_>,
    ) -> Result<RetrievalResult, RagError> {
        let start = Instant::now();

        let tickets = run_pass(query, self.top_k, self.filter.as_ref(), self.timeouts, ctx)
            .await
            .inspect_err(|e| warn!(method = self.method.as_str(), error = %e, "Retrieval failed"))?;

        let elapsed = start.elapsed();
        debug!(
            method = self.method.as_str(),
            tickets = tickets.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Fast retrieval complete"
        );

        Ok(RetrievalResult {
            passes: vec![PassOutcome {
                query: query.to_string(),
                primary: true,
                hits: tickets.len(),
                error: None,
                elapsed_ms: elapsed.as_millis() as u64,
            }],
            tickets,
            method: self.method,
            elapsed,
        })
    }
}

/// Multi-pass retrieval for better recall.
#[derive(Clone)]
pub struct ComprehensiveRetrieval {
    top_k: usize,
    limit: usize,
    generator: Arc<dyn SubQueryGenerator>,
    filter: Option<SearchFilter>,
    timeouts: CallTimeouts,
}

impl ComprehensiveRetrieval {
    /// Create with the default conjunction splitter.
    pub fn new(top_k: usize, limit: usize) -> Self {
        Self {
            top_k,
            limit,
            generator: Arc::new(ConjunctionSplitter::default()),
            filter: None,
            timeouts: CallTimeouts::default(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn SubQueryGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_filter(mut self, filter: Option<SearchFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[async_trait]
impl RetrievalStrategy for ComprehensiveRetrieval {
    fn method(&self) -> RetrievalMethod {
        RetrievalMethod::Comprehensive
    }

    async fn retrieve(
        &self,
        query: &str,
        ctx: RetrievalContext<'_>,
    ) -> Result<RetrievalResult, RagError> {
        let start = Instant::now();

        let mut queries = vec![query.to_string()];
        queries.extend(self.generator.generate(query));
        debug!(passes = queries.len(), "Dispatching comprehensive passes");

        // Futures are polled concurrently and dropped together on cancellation.
        let outcomes = join_all(queries.iter().map(|q| async move {
            let pass_start = Instant::now();
            let result = run_pass(q, self.top_k, self.filter.as_ref(), self.timeouts, ctx).await;
            (result, pass_start.elapsed())
        }))
        .await;

        let mut sets = Vec::new();
        let mut passes = Vec::with_capacity(queries.len());
        let mut primary_error = None;
        let mut first_error = None;

        for (i, (q, (result, pass_elapsed))) in queries.iter().zip(outcomes).enumerate() {
            let elapsed_ms = pass_elapsed.as_millis() as u64;
            match result {
                Ok(tickets) => {
                    passes.push(PassOutcome {
                        query: q.clone(),
                        primary: i == 0,
                        hits: tickets.len(),
                        error: None,
                        elapsed_ms,
                    });
                    sets.push(tickets);
                }
                Err(e) => {
                    warn!(query = %q, error = %e, "Comprehensive pass failed");
                    passes.push(PassOutcome {
                        query: q.clone(),
                        primary: i == 0,
                        hits: 0,
                        error: Some(e.to_string()),
                        elapsed_ms,
                    });
                    if i == 0 {
                        primary_error = Some(e);
                    } else if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        // Without an embedding of the original query there is nothing to ground on.
        if let Some(err) = primary_error.take() {
            let embedding_failed = err.stage() == Stage::Embedding;
            if embedding_failed || sets.is_empty() {
                return Err(err);
            }
            first_error.get_or_insert(err);
        }
        if sets.is_empty() {
            return Err(first_error.unwrap_or_else(|| {
                RagError::IndexUnavailable(ProviderError::Malformed(
                    "no retrieval passes ran".to_string(),
                ))
            }));
        }

        let method = if first_error.is_some() {
            RetrievalMethod::ComprehensivePartial
        } else {
            RetrievalMethod::Comprehensive
        };
        let tickets = merge_ranked(sets, self.limit);
        let elapsed = start.elapsed();

        info!(
            method = method.as_str(),
            passes = passes.len(),
            failed = passes.iter().filter(|p| p.error.is_some()).count(),
            tickets = tickets.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Comprehensive retrieval complete"
        );

        Ok(RetrievalResult {
            tickets,
            method,
            elapsed,
            passes,
        })
    }
}

/// Sizing and deadlines for the strategy set.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub fast_top_k: usize,
    pub comprehensive_top_k: usize,
    pub comprehensive_limit: usize,
    pub max_sub_queries: usize,
    pub filter: Option<SearchFilter>,
    pub timeouts: CallTimeouts,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fast_top_k: 5,
            comprehensive_top_k: 20,
            comprehensive_limit: 20,
            max_sub_queries: 4,
            filter: None,
            timeouts: CallTimeouts::default(),
        }
    }
}

impl StrategyConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            fast_top_k: settings.retrieval.fast_top_k,
            comprehensive_top_k: settings.retrieval.comprehensive_top_k,
            comprehensive_limit: settings.retrieval.comprehensive_limit,
            max_sub_queries: settings.retrieval.max_sub_queries,
            filter: settings
                .retrieval
                .project
                .as_ref()
                .map(|project| SearchFilter::field_equals("project", project.clone())),
            timeouts: CallTimeouts {
                embed: settings.timeouts.embed(),
                search: settings.timeouts.search(),
            },
        }
    }
}

/// One configured instance of every strategy, dispatched by decision.
#[derive(Clone)]
pub struct StrategySet {
    fast: FastRetrieval,
    incident: FastRetrieval,
    comprehensive: ComprehensiveRetrieval,
}

impl StrategySet {
    /// Build the set with the default conjunction splitter.
    pub fn new(config: &StrategyConfig) -> Self {
        Self::with_generator(
            config,
            Arc::new(ConjunctionSplitter::new(config.max_sub_queries)),
        )
    }

    /// Build the set with a custom sub-query generator.
    pub fn with_generator(config: &StrategyConfig, generator: Arc<dyn SubQueryGenerator>) -> Self {
        Self {
            fast: FastRetrieval::fast(config.fast_top_k)
                .with_filter(config.filter.clone())
                .with_timeouts(config.timeouts),
            incident: FastRetrieval::incident(config.fast_top_k)
                .with_filter(config.filter.clone())
                .with_timeouts(config.timeouts),
            comprehensive: ComprehensiveRetrieval::new(
                config.comprehensive_top_k,
                config.comprehensive_limit,
            )
            .with_generator(generator)
            .with_filter(config.filter.clone())
            .with_timeouts(config.timeouts),
        }
    }

    /// Strategy serving `decision`.
    pub fn for_decision(&self, decision: Decision) -> &dyn RetrievalStrategy {
        match decision {
            Decision::Fast => &self.fast,
            Decision::Incident => &self.incident,
            Decision::Comprehensive => &self.comprehensive,
        }
    }

    /// The default fast strategy, for callers that skip routing.
    pub fn fast(&self) -> &FastRetrieval {
        &self.fast
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{sample_index, MockEmbedder, MockIndex};
    use crate::subquery::NoSubQueries;
    use cuttlefish_types::PointId;

    fn ctx<'a>(embedder: &'a MockEmbedder, index: &'a MockIndex) -> RetrievalContext<'a> {
        RetrievalContext {
            embedder,
            index,
            credential: None,
        }
    }

    fn assert_ranked(tickets: &[Ticket]) {
        for pair in tickets.windows(2) {
            assert!(
                pair[0].rank_cmp(&pair[1]).is_lt(),
                "{:?}/{} before {:?}/{}",
                pair[0].id,
                pair[0].score,
                pair[1].id,
                pair[1].score
            );
        }
    }

    #[tokio::test]
    async fn test_fast_retrieval() {
        let embedder = MockEmbedder::new();
        let index = sample_index();

        let result = FastRetrieval::fast(5)
            .retrieve("memory leak in XML parser", ctx(&embedder, &index))
            .await
            .unwrap();

        assert_eq!(result.method, RetrievalMethod::Fast);
        assert_eq!(result.count(), 5);
        assert_eq!(result.tickets[0].key, "HBASE-001");
        assert_ranked(&result.tickets);
        assert_eq!(embedder.calls(), 1);
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test]
    async fn test_incident_uses_fast_mechanics() {
        let embedder = MockEmbedder::new();
        let index = sample_index();

        let result = FastRetrieval::incident(5)
            .retrieve("ClassCastException", ctx(&embedder, &index))
            .await
            .unwrap();

        assert_eq!(result.method, RetrievalMethod::Incident);
        assert_eq!(result.count(), 5);
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test]
    async fn test_fast_embedding_failure() {
        let embedder = MockEmbedder::new().failing(ProviderError::Unauthorized("bad key".into()));
        let index = sample_index();

        let err = FastRetrieval::fast(5)
            .retrieve("anything", ctx(&embedder, &index))
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
        assert_eq!(index.calls(), 0);
    }

    #[tokio::test]
    async fn test_fast_index_failure() {
        let embedder = MockEmbedder::new();
        let index = sample_index().failing(ProviderError::http(503, "down"));

        let err = FastRetrieval::fast(5)
            .retrieve("anything", ctx(&embedder, &index))
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn test_embedding_timeout() {
        let embedder = MockEmbedder::new().with_delay(Duration::from_millis(200));
        let index = sample_index();
        let strategy = FastRetrieval::fast(5).with_timeouts(CallTimeouts {
            embed: Duration::from_millis(20),
            search: Duration::from_secs(1),
        });

        let err = strategy
            .retrieve("anything", ctx(&embedder, &index))
            .await
            .unwrap_err();

        match err {
            RagError::Timeout { stage, .. } => assert_eq!(stage, Stage::Embedding),
            other => panic!("Expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_comprehensive_is_wider() {
        let embedder = MockEmbedder::new();
        let index = sample_index();

        let fast = FastRetrieval::fast(5)
            .retrieve("memory leak in XML parser", ctx(&embedder, &index))
            .await
            .unwrap();
        let comprehensive = ComprehensiveRetrieval::new(20, 20)
            .retrieve("memory leak in XML parser", ctx(&embedder, &index))
            .await
            .unwrap();

        assert_eq!(comprehensive.method, RetrievalMethod::Comprehensive);
        assert!(comprehensive.count() > fast.count());
        assert_ranked(&comprehensive.tickets);
    }

    #[tokio::test]
    async fn test_comprehensive_runs_sub_queries() {
        let embedder = MockEmbedder::new();
        let index = sample_index();

        let result = ComprehensiveRetrieval::new(3, 10)
            .retrieve(
                "XML parser memory leak and ZooKeeper quota exceeded",
                ctx(&embedder, &index),
            )
            .await
            .unwrap();

        assert_eq!(result.passes.len(), 3);
        assert!(result.passes[0].primary);
        assert_eq!(index.calls(), 3);

        let keys: Vec<&str> = result.tickets.iter().map(|t| t.key.as_str()).collect();
        assert!(keys.contains(&"HBASE-001"));
        assert!(keys.contains(&"HBASE-004"));

        let mut unique = result.tickets.iter().map(|t| t.id.clone()).collect::<Vec<PointId>>();
        unique.dedup();
        assert_eq!(unique.len(), result.tickets.len());
    }

    #[tokio::test]
    async fn test_comprehensive_partial_on_sub_query_failure() {
        let embedder = MockEmbedder::new().fail_on("ZooKeeper");
        let index = sample_index();

        let result = ComprehensiveRetrieval::new(20, 20)
            .retrieve(
                "XML parser memory leak and ZooKeeper quota exceeded",
                ctx(&embedder, &index),
            )
            .await;

        // The primary query itself mentions ZooKeeper, so embedding it fails.
        assert!(matches!(result, Err(RagError::EmbeddingUnavailable(_))));

        let embedder = MockEmbedder::new().fail_on("quota");
        let result = ComprehensiveRetrieval::new(20, 20)
            .with_generator(Arc::new(FixedSubQueries(vec![
                "ZooKeeper quota exceeded".to_string(),
                "Hibernate lazy loading".to_string(),
            ])))
            .retrieve("XML parser memory leak", ctx(&embedder, &index))
            .await
            .unwrap();

        assert_eq!(result.method, RetrievalMethod::ComprehensivePartial);
        assert!(result.is_degraded());
        assert!(!result.tickets.is_empty());
        assert_eq!(result.passes.iter().filter(|p| p.error.is_some()).count(), 1);
    }

    #[tokio::test]
    async fn test_comprehensive_partial_on_primary_search_failure() {
        let embedder = MockEmbedder::new();
        let index = sample_index().fail_for_query("XML parser memory leak");

        let result = ComprehensiveRetrieval::new(20, 20)
            .with_generator(Arc::new(FixedSubQueries(vec![
                "ZooKeeper quota exceeded".to_string(),
            ])))
            .retrieve("XML parser memory leak", ctx(&embedder, &index))
            .await
            .unwrap();

        assert_eq!(result.method, RetrievalMethod::ComprehensivePartial);
        assert_eq!(result.tickets.len(), 8);
        assert_ranked(&result.tickets);

        let primary = result.passes.iter().find(|p| p.primary).unwrap();
        assert!(primary.error.is_some());
        assert_eq!(primary.hits, 0);
        assert_eq!(index.calls(), 2);
    }

    #[tokio::test]
    async fn test_comprehensive_all_searches_fail() {
        let embedder = MockEmbedder::new();
        let index = sample_index().failing(ProviderError::Transport("refused".into()));

        let err = ComprehensiveRetrieval::new(20, 20)
            .retrieve("memory leak and quota exceeded", ctx(&embedder, &index))
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn test_generator_order_does_not_change_result() {
        let embedder = MockEmbedder::new();
        let index = sample_index();
        let a = vec!["ZooKeeper quota".to_string(), "lazy loading".to_string()];
        let b = vec!["lazy loading".to_string(), "ZooKeeper quota".to_string()];

        let first = ComprehensiveRetrieval::new(4, 6)
            .with_generator(Arc::new(FixedSubQueries(a)))
            .retrieve("XML parser", ctx(&embedder, &index))
            .await
            .unwrap();
        let second = ComprehensiveRetrieval::new(4, 6)
            .with_generator(Arc::new(FixedSubQueries(b)))
            .retrieve("XML parser", ctx(&embedder, &index))
            .await
            .unwrap();

        assert_eq!(first.tickets, second.tickets);
    }

    #[tokio::test]
    async fn test_strategy_set_dispatch() {
        let set = StrategySet::with_generator(&StrategyConfig::default(), Arc::new(NoSubQueries));
        assert_eq!(
            set.for_decision(Decision::Fast).method(),
            RetrievalMethod::Fast
        );
        assert_eq!(
            set.for_decision(Decision::Incident).method(),
            RetrievalMethod::Incident
        );
        assert_eq!(
            set.for_decision(Decision::Comprehensive).method(),
            RetrievalMethod::Comprehensive
        );
        assert_eq!(set.fast().top_k(), 5);
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = Settings::default();
        settings.retrieval.project = Some("HBASE".to_string());
        let config = StrategyConfig::from_settings(&settings);
        assert_eq!(config.fast_top_k, 5);
        assert_eq!(
            config.filter,
            Some(SearchFilter::field_equals("project", "HBASE"))
        );
    }

    struct FixedSubQueries(Vec<String>);

    impl SubQueryGenerator for FixedSubQueries {
        fn generate(&self, _query: &str) -> Vec<String> {
            self.0.clone()
        }
    }
}
