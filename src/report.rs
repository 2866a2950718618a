//! Evaluation runner and report.

use crate::config::EvalConfig;
use crate::error::{EvalError, Result};
use crate::gold::{GoldStandard, Query};
use crate::metrics::{CutoffMetrics, MetricsCalculator, UndefinedMetric};
use crate::retrieval::{Retriever, Strategy, fetch_result_set};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

/// What to do when the retrieval backend fails for a (query, strategy) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendErrorPolicy {
    /// Stop the run and return the error.
    #[default]
    Abort,
    /// Record the failure in the report and carry on.
    SkipPair,
}

/// Configuration for the reporter.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Cutoffs at which precision and recall are computed.
    pub cutoffs: Vec<usize>,
    /// Strategies evaluated for every query, in order.
    pub strategies: Vec<Strategy>,
    /// Number of results requested per (query, strategy).
    pub depth: usize,
    /// Report unknown query numbers as skipped instead of failing.
    pub skip_unknown: bool,
    /// Handling of retrieval failures.
    pub on_backend_error: BackendErrorPolicy,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        let eval = EvalConfig::default();
        Self {
            cutoffs: eval.cutoffs,
            strategies: Strategy::ALL.to_vec(),
            depth: eval.depth,
            skip_unknown: false,
            on_backend_error: BackendErrorPolicy::Abort,
        }
    }
}

impl ReporterConfig {
    /// Take cutoffs and depth from the evaluation settings.
    pub fn from_eval_config(eval: &EvalConfig) -> Self {
        Self {
            cutoffs: eval.cutoffs.clone(),
            depth: eval.depth,
            ..Default::default()
        }
    }
}

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub query_number: u32,
    pub strategy: Strategy,
    pub cutoff: usize,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub hit_count: Option<usize>,
    pub judged_count: usize,
    pub returned_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub undefined: Vec<UndefinedMetric>,
}

impl EvaluationRecord {
    fn from_metrics(query_number: u32, strategy: Strategy, metrics: CutoffMetrics) -> Self {
        Self {
            query_number,
            strategy,
            cutoff: metrics.cutoff,
            precision: metrics.precision,
            recall: metrics.recall,
            hit_count: metrics.hit_count,
            judged_count: metrics.judged_count,
            returned_count: metrics.returned_count,
            undefined: metrics.undefined,
        }
    }
}

/// Mean precision/recall for one strategy at one cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub strategy: Strategy,
    pub cutoff: usize,
    /// Mean over records with a defined precision.
    pub mean_precision: Option<f64>,
    /// Mean over records with a defined recall.
    pub mean_recall: Option<f64>,
    pub precision_samples: usize,
    pub recall_samples: usize,
    /// Records with at least one undefined metric.
    pub undefined_records: usize,
}

/// A selected query that was not evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedQuery {
    pub number: u32,
    pub reason: String,
}

/// A (query, strategy) pair whose retrieval failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRetrieval {
    pub query_number: u32,
    pub strategy: Strategy,
    pub error: String,
}

/// Evaluation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Number of queries in the gold standard.
    pub gold_standard_queries: usize,
    /// Queries evaluated, in evaluation order.
    pub evaluated_queries: Vec<u32>,
    pub cutoffs: Vec<usize>,
    pub strategies: Vec<Strategy>,
    /// One record per (query, strategy, cutoff).
    pub records: Vec<EvaluationRecord>,
    /// Per strategy, per cutoff averages.
    pub summary: Vec<StrategySummary>,
    pub skipped: Vec<SkippedQuery>,
    pub failures: Vec<FailedRetrieval>,
    /// Total evaluation time (seconds).
    pub total_time_secs: f64,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn fmt_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{:.2}", v))
}

impl EvaluationReport {
    /// Create an empty report.
    pub fn new(gold_standard_queries: usize, cutoffs: Vec<usize>, strategies: Vec<Strategy>) -> Self {
        Self {
            gold_standard_queries,
            evaluated_queries: Vec::new(),
            cutoffs,
            strategies,
            records: Vec::new(),
            summary: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
            total_time_secs: 0.0,
        }
    }

    /// Recompute the per strategy, per cutoff averages from the records.
    ///
    /// Undefined values are left out of the averages, not counted as zero.
    pub fn calculate_summary(&mut self) {
        let mut summary = Vec::with_capacity(self.strategies.len() * self.cutoffs.len());

        for &strategy in &self.strategies {
            for &cutoff in &self.cutoffs {
                let rows: Vec<&EvaluationRecord> = self
                    .records
                    .iter()
                    .filter(|r| r.strategy == strategy && r.cutoff == cutoff)
                    .collect();

                let precisions: Vec<f64> = rows.iter().filter_map(|r| r.precision).collect();
                let recalls: Vec<f64> = rows.iter().filter_map(|r| r.recall).collect();

                summary.push(StrategySummary {
                    strategy,
                    cutoff,
                    mean_precision: mean(&precisions),
                    mean_recall: mean(&recalls),
                    precision_samples: precisions.len(),
                    recall_samples: recalls.len(),
                    undefined_records: rows.iter().filter(|r| !r.undefined.is_empty()).count(),
                });
            }
        }

        self.summary = summary;
    }

    /// The record for a (query, strategy, cutoff) triple.
    pub fn record(&self, query_number: u32, strategy: Strategy, cutoff: usize) -> Option<&EvaluationRecord> {
        self.records.iter().find(|r| {
            r.query_number == query_number && r.strategy == strategy && r.cutoff == cutoff
        })
    }

    /// The aggregate for a (strategy, cutoff) pair.
    pub fn summary_for(&self, strategy: Strategy, cutoff: usize) -> Option<&StrategySummary> {
        self.summary
            .iter()
            .find(|s| s.strategy == strategy && s.cutoff == cutoff)
    }

    /// Print the report to stdout.
    pub fn print_summary(&self) {
        println!("{}", self);
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cutoffs = self
            .cutoffs
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(f, "========== Evaluation Results ==========")?;
        writeln!(f, "Queries in gold standard: {}", self.gold_standard_queries)?;
        writeln!(f, "Queries evaluated:        {}", self.evaluated_queries.len())?;
        writeln!(f, "Cutoffs:                  {}", cutoffs)?;

        for &number in &self.evaluated_queries {
            writeln!(f, "----------------------------------------")?;
            writeln!(f, "Query {}", number)?;
            for &strategy in &self.strategies {
                if let Some(failure) = self
                    .failures
                    .iter()
                    .find(|x| x.query_number == number && x.strategy == strategy)
                {
                    writeln!(f, "  {:<8} retrieval failed: {}", strategy, failure.error)?;
                    continue;
                }

                for record in self
                    .records
                    .iter()
                    .filter(|r| r.query_number == number && r.strategy == strategy)
                {
                    write!(
                        f,
                        "  {:<8} n={:<3} Precision = {:<9} Recall = {:<9}",
                        strategy,
                        record.cutoff,
                        fmt_metric(record.precision),
                        fmt_metric(record.recall)
                    )?;
                    if let Some(hits) = record.hit_count {
                        write!(f, " ({}/{} relevant found)", hits, record.judged_count)?;
                    }
                    writeln!(f)?;
                    for reason in &record.undefined {
                        writeln!(f, "           ! {}", reason)?;
                    }
                }
            }
        }

        if !self.skipped.is_empty() {
            writeln!(f, "----------------------------------------")?;
            writeln!(f, "Skipped queries:")?;
            for skipped in &self.skipped {
                writeln!(f, "  {}: {}", skipped.number, skipped.reason)?;
            }
        }

        writeln!(f, "----------------------------------------")?;
        writeln!(f, "Mean over defined values:")?;
        for s in &self.summary {
            writeln!(
                f,
                "  {:<8} n={:<3} Precision = {} ({} queries)  Recall = {} ({} queries)  undefined: {}",
                s.strategy,
                s.cutoff,
                fmt_metric(s.mean_precision),
                s.precision_samples,
                fmt_metric(s.mean_recall),
                s.recall_samples,
                s.undefined_records
            )?;
        }
        writeln!(f, "----------------------------------------")?;
        writeln!(f, "Total time: {:.1}s", self.total_time_secs)?;
        write!(f, "========================================")
    }
}

/// Runs the evaluation pipeline over a selection of queries.
pub struct EvaluationReporter<'a> {
    gold: &'a GoldStandard,
    retriever: &'a dyn Retriever,
    config: ReporterConfig,
    calculator: MetricsCalculator,
}

impl<'a> EvaluationReporter<'a> {
    /// Create a reporter. Fails on empty or zero cutoffs, a zero depth, a
    /// cutoff above the depth, or no strategies.
    pub fn new(
        gold: &'a GoldStandard,
        retriever: &'a dyn Retriever,
        config: ReporterConfig,
    ) -> Result<Self> {
        let calculator = MetricsCalculator::new(config.cutoffs.clone())?;

        if config.depth == 0 {
            return Err(EvalError::InvalidConfig(
                "Result depth must be at least 1".to_string(),
            ));
        }
        if let Some(&cutoff) = config.cutoffs.iter().find(|&&c| c > config.depth) {
            return Err(EvalError::InvalidConfig(format!(
                "Cutoff {} exceeds result depth {}",
                cutoff, config.depth
            )));
        }
        if config.strategies.is_empty() {
            return Err(EvalError::InvalidConfig(
                "At least one strategy is required".to_string(),
            ));
        }

        Ok(Self {
            gold,
            retriever,
            config,
            calculator,
        })
    }

    /// Resolve the selection to gold-standard queries. An empty selection
    /// means every query. Runs before any retrieval.
    fn select(&self, selection: &[u32]) -> Result<(Vec<&'a Query>, Vec<SkippedQuery>)> {
        if selection.is_empty() {
            return Ok((self.gold.queries().iter().collect(), Vec::new()));
        }

        let mut seen = HashSet::new();
        let mut queries = Vec::new();
        let mut skipped = Vec::new();

        for &number in selection {
            if !seen.insert(number) {
                continue;
            }
            match self.gold.get(number) {
                Some(query) => queries.push(query),
                None if self.config.skip_unknown => {
                    warn!(query = number, "Selected query is not in the gold standard, skipping");
                    skipped.push(SkippedQuery {
                        number,
                        reason: EvalError::unknown_query(number, "requested for evaluation")
                            .to_string(),
                    });
                }
                None => {
                    return Err(EvalError::unknown_query(number, "requested for evaluation"));
                }
            }
        }

        Ok((queries, skipped))
    }

    /// Evaluate the selected queries with every configured strategy.
    pub async fn run(&self, selection: &[u32]) -> Result<EvaluationReport> {
        let start_time = Instant::now();
        let (queries, skipped) = self.select(selection)?;

        let mut report = EvaluationReport::new(
            self.gold.len(),
            self.calculator.cutoffs().to_vec(),
            self.config.strategies.clone(),
        );
        report.skipped = skipped;

        info!(
            queries = queries.len(),
            strategies = self.config.strategies.len(),
            "Running evaluation"
        );

        for query in queries {
            let relevant = query.relevant_ids();
            if relevant.is_empty() {
                warn!(query = query.number, "No gold hits for query, recall is undefined");
            }

            for &strategy in &self.config.strategies {
                let results = match fetch_result_set(
                    self.retriever,
                    query,
                    strategy,
                    self.config.depth,
                )
                .await
                {
                    Ok(results) => results,
                    Err(e) => match self.config.on_backend_error {
                        BackendErrorPolicy::Abort => return Err(e),
                        BackendErrorPolicy::SkipPair => {
                            warn!(
                                query = query.number,
                                strategy = %strategy,
                                error = %e,
                                "Retrieval failed, skipping pair"
                            );
                            report.failures.push(FailedRetrieval {
                                query_number: query.number,
                                strategy,
                                error: e.to_string(),
                            });
                            continue;
                        }
                    },
                };

                info!(
                    query = query.number,
                    strategy = %strategy,
                    hits = results.len(),
                    "Retrieved results"
                );

                for metrics in self.calculator.evaluate(&results, &relevant) {
                    for reason in &metrics.undefined {
                        warn!(
                            query = query.number,
                            strategy = %strategy,
                            cutoff = metrics.cutoff,
                            "Undefined metric: {}",
                            reason
                        );
                    }
                    report.records.push(EvaluationRecord::from_metrics(
                        query.number,
                        strategy,
                        metrics,
                    ));
                }
            }

            report.evaluated_queries.push(query.number);
        }

        report.total_time_secs = start_time.elapsed().as_secs_f64();
        report.calculate_summary();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gold::{Match, Query};
    use crate::retrieval::testing::FakeRetriever;
    use serde_json::json;

    fn query(number: u32, matches: &[&str]) -> Query {
        let mut q = Query::new(number, matches.iter().map(|&id| Match::new(id)).collect());
        q.keyword_query = Some(format!("keywords {}", number));
        q.kibana_query = Some(json!({ "query": { "match": { "title": number.to_string() } } }));
        q
    }

    /// Ten queries; #3 judges docA and docB, #7 has no judgments.
    fn gold() -> GoldStandard {
        let queries = (1..=10)
            .map(|n| match n {
                3 => query(3, &["docA", "docB"]),
                7 => query(7, &[]),
                n => query(n, &["doc1"]),
            })
            .collect();
        GoldStandard::from_queries(queries).unwrap()
    }

    fn config(cutoffs: Vec<usize>) -> ReporterConfig {
        ReporterConfig {
            cutoffs,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_precision_and_recall_for_query_three() {
        let gold = gold();
        let retriever = FakeRetriever::new()
            .with_ranking(3, Strategy::Keyword, &["docX", "docA", "docY", "docB", "docZ"]);
        let reporter = EvaluationReporter::new(
            &gold,
            &retriever,
            ReporterConfig {
                strategies: vec![Strategy::Keyword],
                ..config(vec![2, 5])
            },
        )
        .unwrap();

        let report = reporter.run(&[3]).await.unwrap();
        assert_eq!(report.records.len(), 2);

        let at2 = report.record(3, Strategy::Keyword, 2).unwrap();
        assert_eq!(at2.precision, Some(0.5));
        assert_eq!(at2.recall, Some(0.5));

        let at5 = report.record(3, Strategy::Keyword, 5).unwrap();
        assert_eq!(at5.precision, Some(0.4));
        assert_eq!(at5.recall, Some(1.0));
        assert_eq!(at5.hit_count, Some(2));
        assert_eq!(at5.judged_count, 2);
    }

    #[tokio::test]
    async fn test_query_without_judgments() {
        let gold = gold();
        let retriever = FakeRetriever::new()
            .with_ranking(7, Strategy::Keyword, &["a", "b", "c", "d", "e"])
            .with_ranking(7, Strategy::Structured, &["a", "b"]);
        let reporter = EvaluationReporter::new(&gold, &retriever, config(vec![2, 5])).unwrap();

        let report = reporter.run(&[7]).await.unwrap();
        assert_eq!(report.records.len(), 4);
        for record in &report.records {
            assert_eq!(record.recall, None);
            assert!(record.undefined.contains(&UndefinedMetric::NoJudgments));
        }

        assert_eq!(report.record(7, Strategy::Keyword, 5).unwrap().precision, Some(0.0));
        assert_eq!(report.record(7, Strategy::Structured, 2).unwrap().precision, Some(0.0));
        assert_eq!(report.record(7, Strategy::Structured, 5).unwrap().precision, None);
    }

    #[tokio::test]
    async fn test_short_list_without_judgments_records_both_reasons() {
        let gold = gold();
        let retriever = FakeRetriever::new().with_ranking(7, Strategy::Keyword, &["a", "b"]);
        let reporter = EvaluationReporter::new(
            &gold,
            &retriever,
            ReporterConfig {
                strategies: vec![Strategy::Keyword],
                ..config(vec![5])
            },
        )
        .unwrap();

        let report = reporter.run(&[7]).await.unwrap();
        let record = report.record(7, Strategy::Keyword, 5).unwrap();
        assert_eq!(record.precision, None);
        assert_eq!(record.recall, None);
        assert_eq!(
            record.undefined,
            vec![
                UndefinedMetric::InsufficientResults {
                    returned: 2,
                    cutoff: 5
                },
                UndefinedMetric::NoJudgments,
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_selection_evaluated_once() {
        let gold = gold();
        let retriever = FakeRetriever::new()
            .with_ranking(3, Strategy::Keyword, &["docX", "docA", "docY", "docB", "docZ"]);
        let reporter = EvaluationReporter::new(
            &gold,
            &retriever,
            ReporterConfig {
                strategies: vec![Strategy::Keyword],
                ..config(vec![2, 5])
            },
        )
        .unwrap();

        let report = reporter.run(&[3, 3]).await.unwrap();
        assert_eq!(report.evaluated_queries, vec![3]);
        assert_eq!(report.records.len(), 2);
        assert_eq!(retriever.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_query_fails_before_retrieval() {
        let gold = gold();
        let retriever = FakeRetriever::new();
        let reporter = EvaluationReporter::new(&gold, &retriever, config(vec![5])).unwrap();

        let err = reporter.run(&[1, 99]).await.unwrap_err();
        assert!(matches!(err, EvalError::UnknownQueryNumber { number: 99, .. }));
        assert!(retriever.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_query_reported_when_skipping() {
        let gold = gold();
        let retriever = FakeRetriever::new().with_ranking(1, Strategy::Keyword, &["doc1"]);
        let reporter = EvaluationReporter::new(
            &gold,
            &retriever,
            ReporterConfig {
                skip_unknown: true,
                ..config(vec![1])
            },
        )
        .unwrap();

        let report = reporter.run(&[99, 1]).await.unwrap();
        assert_eq!(report.evaluated_queries, vec![1]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].number, 99);
        assert!(report.records.iter().all(|r| r.query_number == 1));
    }

    #[tokio::test]
    async fn test_backend_error_aborts_by_default() {
        let gold = gold();
        let retriever = FakeRetriever::new().failing_for(2, Strategy::Structured);
        let reporter = EvaluationReporter::new(&gold, &retriever, config(vec![1])).unwrap();

        let err = reporter.run(&[2]).await.unwrap_err();
        assert!(matches!(err, EvalError::RetrievalBackend(_)));
    }

    #[tokio::test]
    async fn test_backend_error_skips_pair_when_configured() {
        let gold = gold();
        let retriever = FakeRetriever::new()
            .with_ranking(2, Strategy::Keyword, &["doc1"])
            .failing_for(2, Strategy::Structured);
        let reporter = EvaluationReporter::new(
            &gold,
            &retriever,
            ReporterConfig {
                on_backend_error: BackendErrorPolicy::SkipPair,
                ..config(vec![1])
            },
        )
        .unwrap();

        let report = reporter.run(&[2]).await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].strategy, Strategy::Structured);
        assert_eq!(report.record(2, Strategy::Keyword, 1).unwrap().precision, Some(1.0));
        assert!(report.record(2, Strategy::Structured, 1).is_none());
    }

    #[tokio::test]
    async fn test_summary_excludes_undefined() {
        let gold = gold();
        let retriever = FakeRetriever::new()
            .with_ranking(1, Strategy::Keyword, &["doc1", "x"])
            .with_ranking(2, Strategy::Keyword, &["x", "y"])
            .with_ranking(4, Strategy::Keyword, &["doc1"]);
        let reporter = EvaluationReporter::new(
            &gold,
            &retriever,
            ReporterConfig {
                strategies: vec![Strategy::Keyword],
                ..config(vec![2])
            },
        )
        .unwrap();

        let report = reporter.run(&[1, 2, 4]).await.unwrap();
        let summary = report.summary_for(Strategy::Keyword, 2).unwrap();
        assert_eq!(summary.precision_samples, 2);
        assert_eq!(summary.mean_precision, Some(0.25));
        assert_eq!(summary.mean_recall, Some(0.5));
        assert_eq!(summary.undefined_records, 1);
    }

    #[tokio::test]
    async fn test_empty_selection_evaluates_all() {
        let gold = gold();
        let retriever = FakeRetriever::new();
        let reporter = EvaluationReporter::new(&gold, &retriever, config(vec![1])).unwrap();

        let report = reporter.run(&[]).await.unwrap();
        assert_eq!(report.evaluated_queries, (1..=10).collect::<Vec<_>>());
        assert_eq!(report.records.len(), 20);
        // Empty rankings leave everything undefined.
        assert!(report.records.iter().all(|r| r.precision.is_none()));
        assert_eq!(report.summary_for(Strategy::Keyword, 1).unwrap().mean_precision, None);
    }

    #[tokio::test]
    async fn test_unsubmittable_query_is_not_sent() {
        let mut queries = vec![query(1, &["doc1"])];
        queries[0].keyword_query = Some("   ".to_string());
        let gold = GoldStandard::from_queries(queries).unwrap();
        let retriever = FakeRetriever::new().with_ranking(1, Strategy::Keyword, &["doc1"]);
        let reporter = EvaluationReporter::new(
            &gold,
            &retriever,
            ReporterConfig {
                strategies: vec![Strategy::Keyword],
                ..config(vec![1])
            },
        )
        .unwrap();

        let report = reporter.run(&[1]).await.unwrap();
        assert!(retriever.calls.lock().unwrap().is_empty());
        assert_eq!(report.record(1, Strategy::Keyword, 1).unwrap().returned_count, 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let gold = gold();
        let retriever = FakeRetriever::new();
        assert!(EvaluationReporter::new(&gold, &retriever, config(vec![])).is_err());
        assert!(EvaluationReporter::new(&gold, &retriever, config(vec![41])).is_err());
        assert!(
            EvaluationReporter::new(
                &gold,
                &retriever,
                ReporterConfig {
                    strategies: vec![],
                    ..config(vec![5])
                }
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn test_text_rendering_marks_undefined() {
        let gold = gold();
        let retriever = FakeRetriever::new().with_ranking(7, Strategy::Keyword, &["a", "b"]);
        let reporter = EvaluationReporter::new(
            &gold,
            &retriever,
            ReporterConfig {
                strategies: vec![Strategy::Keyword],
                skip_unknown: true,
                ..config(vec![2, 5])
            },
        )
        .unwrap();

        let text = reporter.run(&[7, 99]).await.unwrap().to_string();
        assert!(text.contains("Query 7"));
        assert!(text.contains("Recall = undefined"));
        assert!(text.contains("n=5"));
        assert!(text.contains("Skipped queries"));
    }

    #[tokio::test]
    async fn test_report_serializes_undefined_as_null() {
        let gold = gold();
        let retriever = FakeRetriever::new().with_ranking(7, Strategy::Keyword, &["a"]);
        let reporter = EvaluationReporter::new(
            &gold,
            &retriever,
            ReporterConfig {
                strategies: vec![Strategy::Keyword],
                ..config(vec![1])
            },
        )
        .unwrap();

        let report = reporter.run(&[7]).await.unwrap();
        let value = serde_json::to_value(&report).unwrap();
        let record = &value["records"][0];
        assert_eq!(record["strategy"], "keyword");
        assert!(record["recall"].is_null());
        assert_eq!(record["precision"], 0.0);
        assert_eq!(record["undefined"][0]["reason"], "no_judgments");
    }
}
