//! Rankings replayed from a saved result file.

use super::{Retriever, Strategy};
use crate::error::{EvalError, Result};
use crate::gold::{DocId, GoldStandard, Query};
use crate::reconcile::ResultFile;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Retriever answering from the `<strategy>_top<depth>_docids` lists of a
/// result file instead of a live backend.
#[derive(Debug, Clone)]
pub struct StoredRankings {
    depth: usize,
    rankings: HashMap<(u32, Strategy), Vec<DocId>>,
}

impl StoredRankings {
    /// Read the rankings stored at `depth` for every record of `file`.
    ///
    /// Every record must name a distinct query of `gold`: an unknown number
    /// fails with [`EvalError::UnknownQueryNumber`], a repeated one with
    /// [`EvalError::MalformedResults`].
    pub fn from_result_file(file: &ResultFile, gold: &GoldStandard, depth: usize) -> Result<Self> {
        let records = file.records().ok_or_else(|| {
            EvalError::MalformedResults(
                "neither `queries` nor `results` is present at the top level".to_string(),
            )
        })?;

        let mut rankings = HashMap::new();
        let mut seen = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            let number = record.number.ok_or_else(|| {
                EvalError::MalformedResults(format!(
                    "record at position {} has no `number`",
                    pos + 1
                ))
            })?;

            if !gold.contains(number) {
                return Err(EvalError::unknown_query(number, "referenced by result file"));
            }
            if let Some(first) = seen.insert(number, pos + 1) {
                return Err(EvalError::MalformedResults(format!(
                    "query {} appears at positions {} and {}",
                    number,
                    first,
                    pos + 1
                )));
            }

            for strategy in Strategy::ALL {
                if let Some(ranking) = record.ranking(strategy, depth) {
                    rankings.insert((number, strategy), ranking?);
                }
            }
        }

        debug!(records = records.len(), rankings = rankings.len(), "Loaded stored rankings");
        Ok(Self { depth, rankings })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.rankings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }
}

#[async_trait]
impl Retriever for StoredRankings {
    async fn search(&self, query: &Query, strategy: Strategy, depth: usize) -> Result<Vec<DocId>> {
        let ranking = self.rankings.get(&(query.number, strategy)).ok_or_else(|| {
            EvalError::RetrievalBackend(format!(
                "no stored `{}` ranking for query {}",
                strategy.result_key(self.depth),
                query.number
            ))
        })?;

        Ok(ranking.iter().take(depth).cloned().collect())
    }
}
