//! Retrieval strategies and the search backend seam.
//!
//! The harness never talks to a search engine directly: it asks a
//! [`Retriever`] for the ranked document ids of a query under a given
//! [`Strategy`]. [`ElasticClient`] queries a live Elasticsearch index,
//! [`StoredRankings`] replays rankings saved in a result file.

mod elastic;
mod stored;

pub use elastic::{ClusterInfo, ClusterVersion, ElasticClient};
pub use stored::StoredRankings;

use crate::error::{EvalError, Result};
use crate::gold::{DocId, Query};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// A way of formulating a query against the search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strategy {
    /// Free-text keyword query (`keyword_query`).
    #[serde(rename = "keyword")]
    Keyword,
    /// Structured Kibana/Elasticsearch query (`kibana_query`).
    #[serde(rename = "kibana")]
    Structured,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Keyword, Strategy::Structured];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Keyword => "keyword",
            Strategy::Structured => "kibana",
        }
    }

    /// Key under which a result file stores this strategy's ranking, e.g.
    /// `keyword_top40_docids`.
    pub fn result_key(self, depth: usize) -> String {
        format!("{}_top{}_docids", self.name(), depth)
    }

    /// Whether the query has a formulation this strategy can submit.
    pub fn can_submit(self, query: &Query) -> bool {
        match self {
            Strategy::Keyword => query.keyword_formulation().is_some(),
            Strategy::Structured => query.structured_formulation().is_some(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Strategy {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(Strategy::Keyword),
            "kibana" | "structured" => Ok(Strategy::Structured),
            other => Err(EvalError::InvalidConfig(format!(
                "unknown strategy '{}' (expected 'keyword' or 'kibana')",
                other
            ))),
        }
    }
}

/// Ranked document ids returned for one (query, strategy) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResultSet {
    query_number: u32,
    strategy: Strategy,
    ids: Vec<DocId>,
}

impl RetrievalResultSet {
    /// Create a result set, keeping at most `depth` ids in backend order.
    pub fn new(query_number: u32, strategy: Strategy, mut ids: Vec<DocId>, depth: usize) -> Self {
        ids.truncate(depth);
        Self {
            query_number,
            strategy,
            ids,
        }
    }

    pub fn empty(query_number: u32, strategy: Strategy) -> Self {
        Self::new(query_number, strategy, Vec::new(), 0)
    }

    pub fn query_number(&self) -> u32 {
        self.query_number
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn ids(&self) -> &[DocId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Source of ranked document ids.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `depth` document ids for `query` under `strategy`,
    /// ordered by descending relevance.
    async fn search(&self, query: &Query, strategy: Strategy, depth: usize) -> Result<Vec<DocId>>;
}

/// Fetch the result set for a (query, strategy) pair.
///
/// A query without a usable formulation for the strategy is not submitted
/// and yields an empty result set.
pub async fn fetch_result_set(
    retriever: &dyn Retriever,
    query: &Query,
    strategy: Strategy,
    depth: usize,
) -> Result<RetrievalResultSet> {
    if !strategy.can_submit(query) {
        info!(
            query = query.number,
            strategy = %strategy,
            "No usable formulation, query not submitted"
        );
        return Ok(RetrievalResultSet::empty(query.number, strategy));
    }

    let ids = retriever.search(query, strategy, depth).await?;
    Ok(RetrievalResultSet::new(query.number, strategy, ids, depth))
}
