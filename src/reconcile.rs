//! Result record sets and their reconciliation against the gold standard.
//!
//! Result files are produced separately from the gold standard and tend to
//! drift: older ones use a `results` key instead of `queries`, and records
//! may lack the structured query or the judgments the grader reads.
//! [`reconcile`] fills those gaps from the gold standard without ever
//! overwriting what a record already holds.

use crate::error::{EvalError, Result};
use crate::gold::{DocId, GoldStandard, Query, SUBMITTER_FIELDS, present};
use crate::persistence;
use crate::retrieval::Strategy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

/// One per-query record of a result file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub original_query: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub keyword_query: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub kibana_query: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub answer_type: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub exact_answers: Option<Value>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub matches: Option<Value>,

    /// Rankings (`keyword_top40_docids`, ...) and any other fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn fill(slot: &mut Option<Value>, canonical: Option<Value>) -> usize {
    match (slot.is_none(), canonical) {
        (true, Some(value)) => {
            *slot = Some(value);
            1
        }
        _ => 0,
    }
}

impl ResultRecord {
    pub fn new(number: u32) -> Self {
        Self {
            number: Some(number),
            ..Default::default()
        }
    }

    /// Copy every canonical field the record lacks and `query` has.
    /// Returns the number of fields filled.
    pub fn fill_from(&mut self, query: &Query) -> Result<usize> {
        let matches = serde_json::to_value(&query.matches)?;

        let filled = fill(&mut self.kibana_query, query.kibana_query.clone())
            + fill(
                &mut self.original_query,
                query.original_query.clone().map(Value::String),
            )
            + fill(
                &mut self.keyword_query,
                query.keyword_query.clone().map(Value::String),
            )
            + fill(&mut self.answer_type, query.answer_type.clone())
            + fill(&mut self.exact_answers, query.exact_answers.clone())
            + fill(&mut self.matches, Some(matches));

        Ok(filled)
    }

    /// The stored ranking for a strategy at the given depth, if present.
    pub fn ranking(&self, strategy: Strategy, depth: usize) -> Option<Result<Vec<DocId>>> {
        let key = strategy.result_key(depth);
        self.extra.get(&key).map(|value| {
            serde_json::from_value(value.clone()).map_err(|e| {
                EvalError::MalformedResults(format!(
                    "query {}: `{}` is not a list of document ids: {}",
                    self.number.map_or_else(|| "?".to_string(), |n| n.to_string()),
                    key,
                    e
                ))
            })
        })
    }

    /// Store a ranking for a strategy at the given depth.
    pub fn set_ranking(&mut self, strategy: Strategy, depth: usize, ids: &[DocId]) {
        let list = ids
            .iter()
            .map(|id| Value::String(id.as_str().to_string()))
            .collect();
        self.extra.insert(strategy.result_key(depth), Value::Array(list));
    }
}

/// A result record set: submitter metadata plus per-query records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    /// Top-level fields other than the record list.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<ResultRecord>>,

    /// Legacy name of the record list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ResultRecord>>,
}

impl ResultFile {
    /// Create a result file holding `records` under the canonical key.
    pub fn with_records(records: Vec<ResultRecord>) -> Self {
        Self {
            metadata: Map::new(),
            queries: Some(records),
            results: None,
        }
    }

    /// Parse a result file from JSON text. A leading byte-order mark is ignored.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(persistence::strip_bom(text))
            .map_err(|e| EvalError::MalformedResults(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = persistence::read_text(path)?;
        Self::from_json_str(&text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        persistence::save_json(self, path)
    }

    /// The per-query records, preferring the canonical key.
    pub fn records(&self) -> Option<&[ResultRecord]> {
        self.queries.as_deref().or(self.results.as_deref())
    }
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Records processed.
    pub records: usize,
    /// Per-record fields copied from the gold standard.
    pub fields_filled: usize,
    /// Top-level metadata fields copied from the gold standard.
    pub metadata_filled: usize,
    /// Whether the file used the legacy `results` key.
    pub renamed_results_key: bool,
    /// Whether a `results` list was dropped because `queries` was present.
    pub discarded_results: bool,
}

/// Fill the gaps of a partial result file from the gold standard.
///
/// Fails with [`EvalError::UnknownQueryNumber`] if any record refers to a
/// query the gold standard does not declare; nothing is returned in that case.
pub fn reconcile(partial: ResultFile, gold: &GoldStandard) -> Result<(ResultFile, ReconcileSummary)> {
    let ResultFile {
        mut metadata,
        queries,
        results,
    } = partial;

    let mut summary = ReconcileSummary::default();

    let mut records = match (queries, results) {
        (Some(queries), results) => {
            if results.is_some() {
                warn!("Result file has both `queries` and `results`; keeping `queries`");
                summary.discarded_results = true;
            }
            queries
        }
        (None, Some(results)) => {
            summary.renamed_results_key = true;
            results
        }
        (None, None) => {
            return Err(EvalError::MalformedResults(
                "neither `queries` nor `results` is present at the top level".to_string(),
            ));
        }
    };

    for (pos, record) in records.iter_mut().enumerate() {
        let number = record.number.ok_or_else(|| {
            EvalError::MalformedResults(format!("record at position {} has no `number`", pos + 1))
        })?;

        let query = gold
            .get(number)
            .ok_or_else(|| EvalError::unknown_query(number, "referenced by result file"))?;

        summary.fields_filled += record.fill_from(query)?;
    }
    summary.records = records.len();

    for key in SUBMITTER_FIELDS {
        if let Some(value) = gold.metadata().get(key) {
            if !metadata.contains_key(key) {
                metadata.insert(key.to_string(), value.clone());
                summary.metadata_filled += 1;
            }
        }
    }

    info!(
        records = summary.records,
        fields_filled = summary.fields_filled,
        metadata_filled = summary.metadata_filled,
        "Reconciled result file"
    );

    Ok((
        ResultFile {
            metadata,
            queries: Some(records),
            results: None,
        },
        summary,
    ))
}
