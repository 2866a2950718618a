//! Gold-standard queries and their relevance judgments.
//!
//! A gold standard file looks like:
//! ```json
//! {
//!   "student_surname": "...",
//!   "queries": [
//!     {
//!       "number": 3,
//!       "original_query": "Which rivers flow through Vienna?",
//!       "keyword_query": "rivers Vienna",
//!       "kibana_query": { "query": { "match": { "title": "Danube" } } },
//!       "matches": [ { "docid": 1234, "title": "Danube" } ]
//!     }
//!   ]
//! }
//! ```

use crate::error::{EvalError, Result};
use crate::persistence;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Top-level descriptive fields identifying who authored a query set.
pub const SUBMITTER_FIELDS: [&str; 4] = [
    "student_surname",
    "student_givenname",
    "student_reg_number",
    "topic_keywords",
];

/// Deserialize a field so that an explicit `null` stays distinguishable
/// from an absent key: absent is `None`, `null` is `Some(Value::Null)`.
/// Pair with `#[serde(default)]`.
pub(crate) fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Document identifier.
///
/// Judgment files store ids as integers while the search backend returns
/// them as strings, so both forms are normalized to the same text here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for DocId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<u64> for DocId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

impl<'de> Deserialize<'de> for DocId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawDocId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawDocId::deserialize(deserializer)? {
            RawDocId::Text(s) => DocId::new(s),
            RawDocId::Unsigned(n) => DocId(n.to_string()),
            RawDocId::Signed(n) => DocId(n.to_string()),
        })
    }
}

/// One relevance judgment: a relevant document plus supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub docid: DocId,
    /// Every other field of the judgment (title, snippet, answer text...).
    #[serde(flatten)]
    pub evidence: Map<String, Value>,
}

impl Match {
    pub fn new(docid: impl Into<DocId>) -> Self {
        Self {
            docid: docid.into(),
            evidence: Map::new(),
        }
    }
}

/// A gold-standard query.
///
/// `None` means the field is absent from the source file. The JSON-valued
/// fields keep an explicit `null` as `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub number: u32,
    pub original_query: Option<String>,
    /// Free-text formulation.
    pub keyword_query: Option<String>,
    /// Structured formulation, normally `{"query": {...}}`.
    pub kibana_query: Option<Value>,
    pub answer_type: Option<Value>,
    pub exact_answers: Option<Value>,
    pub matches: Vec<Match>,
}

impl Query {
    /// Create a query with only a number and its judgments.
    pub fn new(number: u32, matches: Vec<Match>) -> Self {
        Self {
            number,
            original_query: None,
            keyword_query: None,
            kibana_query: None,
            answer_type: None,
            exact_answers: None,
            matches,
        }
    }

    /// The distinct judged-relevant document ids.
    pub fn relevant_ids(&self) -> HashSet<DocId> {
        self.matches.iter().map(|m| m.docid.clone()).collect()
    }

    /// The keyword formulation, if it is non-blank.
    pub fn keyword_formulation(&self) -> Option<&str> {
        self.keyword_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// The query clause of the structured formulation, if it is a non-empty object.
    ///
    /// An empty clause (`{}`) is rejected by Elasticsearch, so it counts as absent.
    pub fn structured_formulation(&self) -> Option<&Value> {
        self.kibana_query
            .as_ref()
            .and_then(|k| k.get("query"))
            .filter(|q| q.as_object().is_some_and(|o| !o.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct RawQuery {
    number: Option<u32>,
    original_query: Option<String>,
    keyword_query: Option<String>,
    #[serde(default, deserialize_with = "present")]
    kibana_query: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    answer_type: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    exact_answers: Option<Value>,
    matches: Option<Vec<Match>>,
}

/// The full set of gold-standard queries, indexed by number.
#[derive(Debug, Clone)]
pub struct GoldStandard {
    queries: Vec<Query>,
    by_number: HashMap<u32, usize>,
    metadata: Map<String, Value>,
}

impl GoldStandard {
    /// Build a gold standard from already-parsed queries.
    ///
    /// Fails if two queries share a number.
    pub fn from_queries(queries: Vec<Query>) -> Result<Self> {
        let mut by_number = HashMap::with_capacity(queries.len());
        for (idx, query) in queries.iter().enumerate() {
            if by_number.insert(query.number, idx).is_some() {
                return Err(EvalError::MalformedGoldStandard(format!(
                    "query number {} appears more than once",
                    query.number
                )));
            }
        }

        Ok(Self {
            queries,
            by_number,
            metadata: Map::new(),
        })
    }

    /// Parse a gold standard from JSON text. A leading byte-order mark is ignored.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(persistence::strip_bom(text))?;

        let Value::Object(mut root) = value else {
            return Err(EvalError::MalformedGoldStandard(
                "top level is not a JSON object".to_string(),
            ));
        };

        let raw_queries = match root.remove("queries") {
            Some(Value::Array(list)) => list,
            Some(_) => {
                return Err(EvalError::MalformedGoldStandard(
                    "`queries` is not a list".to_string(),
                ));
            }
            None => {
                return Err(EvalError::MalformedGoldStandard(
                    "missing top-level `queries` collection".to_string(),
                ));
            }
        };

        let mut queries = Vec::with_capacity(raw_queries.len());
        for (pos, raw) in raw_queries.into_iter().enumerate() {
            let raw: RawQuery = serde_json::from_value(raw).map_err(|e| {
                EvalError::MalformedGoldStandard(format!("query at position {}: {}", pos + 1, e))
            })?;

            let number = raw.number.ok_or_else(|| {
                EvalError::MalformedGoldStandard(format!(
                    "query at position {} has no `number`",
                    pos + 1
                ))
            })?;

            let matches = raw.matches.unwrap_or_else(|| {
                warn!(query = number, "Gold-standard query has no `matches` field");
                Vec::new()
            });

            queries.push(Query {
                number,
                original_query: raw.original_query,
                keyword_query: raw.keyword_query,
                kibana_query: raw.kibana_query,
                answer_type: raw.answer_type,
                exact_answers: raw.exact_answers,
                matches,
            });
        }

        let mut gold = Self::from_queries(queries)?;
        gold.metadata = SUBMITTER_FIELDS
            .iter()
            .filter_map(|&key| root.get(key).map(|v| (key.to_string(), v.clone())))
            .collect();

        Ok(gold)
    }

    /// Load a gold standard from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = persistence::read_text(path)?;
        Self::from_json_str(&text)
    }

    /// Look up a query by number.
    pub fn query(&self, number: u32) -> Result<&Query> {
        self.get(number)
            .ok_or_else(|| EvalError::unknown_query(number, "gold standard lookup"))
    }

    pub fn get(&self, number: u32) -> Option<&Query> {
        self.by_number.get(&number).map(|&idx| &self.queries[idx])
    }

    pub fn contains(&self, number: u32) -> bool {
        self.by_number.contains_key(&number)
    }

    /// Queries in file order.
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Query numbers in file order.
    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.queries.iter().map(|q| q.number)
    }

    /// Submitter metadata fields present in the source file.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Numbers of queries with no relevance judgments.
    pub fn unjudged_queries(&self) -> Vec<u32> {
        self.queries
            .iter()
            .filter(|q| q.matches.is_empty())
            .map(|q| q.number)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
