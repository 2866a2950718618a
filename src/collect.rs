//! Collect rankings for every gold-standard query into a result file.

use crate::error::Result;
use crate::gold::GoldStandard;
use crate::reconcile::{ResultFile, ResultRecord};
use crate::retrieval::{Retriever, Strategy, fetch_result_set};
use serde_json::Value;
use tracing::info;

/// Run both strategies for every query and record the top `depth` ids.
///
/// Queries without a usable formulation get an empty list. Retrieval
/// errors abort the collection.
pub async fn collect_results(
    gold: &GoldStandard,
    retriever: &dyn Retriever,
    depth: usize,
) -> Result<ResultFile> {
    let mut records = Vec::with_capacity(gold.len());

    for query in gold.queries() {
        let mut record = ResultRecord::new(query.number);
        record.original_query = query.original_query.clone().map(Value::String);
        record.keyword_query = Some(Value::String(
            query.keyword_query.clone().unwrap_or_default(),
        ));

        let mut counts = Vec::with_capacity(Strategy::ALL.len());
        for strategy in Strategy::ALL {
            let results = fetch_result_set(retriever, query, strategy, depth).await?;
            record.set_ranking(strategy, depth, results.ids());
            counts.push(results.len());
        }

        info!(
            query = query.number,
            keyword = counts[0],
            kibana = counts[1],
            "Collected rankings"
        );
        records.push(record);
    }

    let mut file = ResultFile::with_records(records);
    file.metadata = gold.metadata().clone();
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::gold::{DocId, Match, Query};
    use crate::reconcile::reconcile;
    use crate::retrieval::StoredRankings;
    use crate::retrieval::testing::FakeRetriever;
    use serde_json::json;

    fn gold() -> GoldStandard {
        let mut first = Query::new(1, vec![Match::new("a")]);
        first.original_query = Some("first".to_string());
        first.keyword_query = Some("first".to_string());
        first.kibana_query = Some(json!({ "query": { "match": { "title": "first" } } }));

        let mut second = Query::new(2, vec![Match::new("b")]);
        second.keyword_query = Some("second".to_string());
        second.kibana_query = Some(json!({ "query": {} }));

        GoldStandard::from_queries(vec![first, second]).unwrap()
    }

    #[tokio::test]
    async fn test_collects_both_strategies() {
        let gold = gold();
        let retriever = FakeRetriever::new()
            .with_ranking(1, Strategy::Keyword, &["a", "x"])
            .with_ranking(1, Strategy::Structured, &["a"])
            .with_ranking(2, Strategy::Keyword, &["b"]);

        let file = collect_results(&gold, &retriever, 40).await.unwrap();
        let records = file.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].extra["keyword_top40_docids"], json!(["a", "x"]));
        assert_eq!(records[0].extra["kibana_top40_docids"], json!(["a"]));
        assert_eq!(records[1].extra["kibana_top40_docids"], json!([]));
        assert_eq!(records[0].original_query, Some(json!("first")));

        // the empty structured query for #2 was never submitted
        let calls = retriever.calls.lock().unwrap();
        assert!(!calls.contains(&(2, Strategy::Structured, 40)));
    }

    #[tokio::test]
    async fn test_collected_file_replays_after_reconcile() {
        let gold = gold();
        let retriever = FakeRetriever::new().with_ranking(1, Strategy::Keyword, &["a", "x"]);

        let file = collect_results(&gold, &retriever, 40).await.unwrap();
        let (fixed, _) = reconcile(file, &gold).unwrap();
        assert!(fixed.records().unwrap()[0].kibana_query.is_some());

        let stored = StoredRankings::from_result_file(&fixed, &gold, 40).unwrap();
        let ids = stored
            .search(gold.query(1).unwrap(), Strategy::Keyword, 40)
            .await
            .unwrap();
        assert_eq!(ids, vec![DocId::from("a"), DocId::from("x")]);
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let gold = gold();
        let retriever = FakeRetriever::new().failing_for(1, Strategy::Keyword);
        let err = collect_results(&gold, &retriever, 40).await.unwrap_err();
        assert!(matches!(err, EvalError::RetrievalBackend(_)));
    }
}
