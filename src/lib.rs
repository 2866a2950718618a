//! IR Eval - precision/recall evaluation of search strategies against a gold standard.
//!
//! A gold standard lists queries, each with a free-text `keyword_query`, a
//! structured `kibana_query` and the documents judged relevant. This crate
//! runs each strategy against an Elasticsearch index (or replays saved
//! rankings), computes precision and recall at fixed cutoffs, and aggregates
//! the results per strategy.
//!
//! # Quick Start
//!
//! ```no_run
//! use ir_eval::{
//!     config::Config,
//!     gold::GoldStandard,
//!     report::{EvaluationReporter, ReporterConfig},
//!     retrieval::ElasticClient,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let gold = GoldStandard::load(Path::new("gold_standard.json"))?;
//!     let client = ElasticClient::connect(config.search.clone()).await?;
//!
//!     let reporter = EvaluationReporter::new(
//!         &gold,
//!         &client,
//!         ReporterConfig::from_eval_config(&config.eval),
//!     )?;
//!     let report = reporter.run(&[1, 3, 7]).await?;
//!     report.print_summary();
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **GoldStandard**: queries and relevance judgments, indexed by number
//! - **reconcile**: repairs partial result files against the gold standard
//! - **Retriever**: ranked document ids per (query, strategy)
//! - **MetricsCalculator**: precision/recall at cutoffs with explicit undefined values
//! - **EvaluationReporter**: drives the pipeline and aggregates the report
//! - **AnswerChecker**: asks an LLM whether the judged evidence names the expected answers

pub mod answers;
pub mod collect;
pub mod config;
pub mod error;
pub mod gold;
pub mod llm;
pub mod metrics;
pub mod persistence;
pub mod reconcile;
pub mod report;
pub mod retrieval;

// Re-export commonly used types
pub use answers::{AnswerCheck, AnswerChecker, AnswerOutcome};
pub use collect::collect_results;
pub use config::Config;
pub use error::{EvalError, Result};
pub use gold::{DocId, GoldStandard, Match, Query};
pub use llm::{Completion, LlmClient};
pub use metrics::{CutoffMetrics, MetricsCalculator, UndefinedMetric};
pub use reconcile::{ReconcileSummary, ResultFile, ResultRecord, reconcile};
pub use report::{
    BackendErrorPolicy, EvaluationRecord, EvaluationReport, EvaluationReporter, ReporterConfig,
};
pub use retrieval::{ElasticClient, RetrievalResultSet, Retriever, StoredRankings, Strategy};
