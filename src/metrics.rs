//! Precision and recall at fixed cutoffs.
//!
//! A metric that cannot be computed is reported as `None` together with the
//! reason, never as zero:
//! - fewer results than the cutoff leaves precision, recall and the hit count undefined;
//! - a query with no judged-relevant documents leaves recall undefined.

use crate::error::{EvalError, Result};
use crate::gold::DocId;
use crate::retrieval::RetrievalResultSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Why a metric is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UndefinedMetric {
    /// The backend returned fewer results than the cutoff.
    InsufficientResults { returned: usize, cutoff: usize },
    /// The gold standard has no relevant documents for the query.
    NoJudgments,
}

impl fmt::Display for UndefinedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedMetric::InsufficientResults { returned, cutoff } => write!(
                f,
                "not enough results ({}) to compute P/R at n={}",
                returned, cutoff
            ),
            UndefinedMetric::NoJudgments => {
                write!(f, "no relevance judgments in the gold standard")
            }
        }
    }
}

/// Metrics for one cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoffMetrics {
    pub cutoff: usize,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub hit_count: Option<usize>,
    pub judged_count: usize,
    pub returned_count: usize,
    pub undefined: Vec<UndefinedMetric>,
}

/// Number of distinct relevant ids among the first `n` results.
pub fn hit_count(ids: &[DocId], relevant: &HashSet<DocId>, n: usize) -> usize {
    let window: HashSet<&DocId> = ids.iter().take(n).collect();
    relevant.iter().filter(|id| window.contains(id)).count()
}

/// Precision/recall calculator for a fixed list of cutoffs.
#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    cutoffs: Vec<usize>,
}

impl MetricsCalculator {
    pub fn new(cutoffs: Vec<usize>) -> Result<Self> {
        if cutoffs.is_empty() {
            return Err(EvalError::InvalidConfig(
                "At least one cutoff is required".to_string(),
            ));
        }
        if cutoffs.contains(&0) {
            return Err(EvalError::InvalidConfig(
                "Cutoff 0 is not allowed".to_string(),
            ));
        }
        Ok(Self { cutoffs })
    }

    pub fn cutoffs(&self) -> &[usize] {
        &self.cutoffs
    }

    /// Compute metrics at every configured cutoff, in configured order.
    pub fn evaluate(
        &self,
        results: &RetrievalResultSet,
        relevant: &HashSet<DocId>,
    ) -> Vec<CutoffMetrics> {
        self.cutoffs
            .iter()
            .map(|&n| Self::evaluate_at(results.ids(), relevant, n))
            .collect()
    }

    /// Compute metrics for a single cutoff `n`.
    pub fn evaluate_at(ids: &[DocId], relevant: &HashSet<DocId>, n: usize) -> CutoffMetrics {
        let judged_count = relevant.len();
        let returned_count = ids.len();
        let mut undefined = Vec::new();

        if returned_count < n {
            undefined.push(UndefinedMetric::InsufficientResults {
                returned: returned_count,
                cutoff: n,
            });
        }
        if judged_count == 0 {
            undefined.push(UndefinedMetric::NoJudgments);
        }

        let hits = (returned_count >= n && n > 0).then(|| hit_count(ids, relevant, n));
        let precision = hits.map(|h| h as f64 / n as f64);
        let recall = hits
            .filter(|_| judged_count > 0)
            .map(|h| h as f64 / judged_count as f64);

        CutoffMetrics {
            cutoff: n,
            precision,
            recall,
            hit_count: hits,
            judged_count,
            returned_count,
            undefined,
        }
    }
}
