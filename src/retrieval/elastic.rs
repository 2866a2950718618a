//! Elasticsearch search client.

use super::{Retriever, Strategy};
use crate::config::SearchConfig;
use crate::error::{EvalError, Result};
use crate::gold::{DocId, Query};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

/// Response from `_search`.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: DocId,
}

/// Elasticsearch error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: Value,
}

impl ApiError {
    fn reason(&self) -> String {
        match &self.error {
            Value::String(s) => s.clone(),
            other => other
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }
    }
}

/// Response from the cluster root endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub version: ClusterVersion,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterVersion {
    #[serde(default)]
    pub number: String,
}

/// Client for one Elasticsearch index.
#[derive(Clone)]
pub struct ElasticClient {
    client: Client,
    config: SearchConfig,
}

impl ElasticClient {
    /// Create a client without contacting the cluster.
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a client and check that the cluster answers.
    pub async fn connect(config: SearchConfig) -> Result<Self> {
        let client = Self::new(config)?;
        let info = client.ping().await?;
        info!(
            url = %client.config.url,
            index = %client.config.index,
            cluster = %info.cluster_name,
            version = %info.version.number,
            "Connected to Elasticsearch"
        );
        Ok(client)
    }

    /// Release the connection pool.
    pub fn close(self) {
        debug!(url = %self.config.url, "Closing Elasticsearch client");
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn search_endpoint(&self) -> String {
        format!("{}/{}/_search", self.base_url(), self.config.index)
    }

    /// Query the cluster root endpoint.
    pub async fn ping(&self) -> Result<ClusterInfo> {
        let response = self
            .client
            .get(self.base_url())
            .send()
            .await
            .map_err(|e| {
                EvalError::RetrievalBackend(format!("cannot reach {}: {}", self.base_url(), e))
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(EvalError::RetrievalBackend(format!(
                "ping failed ({}): {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            EvalError::RetrievalBackend(format!("unexpected ping response: {}", e))
        })
    }

    /// Build the request body for a free-text query.
    pub fn keyword_body(&self, text: &str, size: usize) -> Value {
        json!({
            "size": size,
            "query": {
                "multi_match": {
                    "query": text,
                    "fields": self.config.keyword_fields,
                    "type": "best_fields"
                }
            }
        })
    }

    /// Build the request body for a structured query clause.
    pub fn structured_body(clause: &Value, size: usize) -> Value {
        json!({
            "size": size,
            "query": clause
        })
    }

    /// Run a search request and return the hit ids in ranking order.
    async fn execute(&self, body: &Value) -> Result<Vec<DocId>> {
        debug!(endpoint = %self.search_endpoint(), body = %body, "Submitting search");

        let response = self
            .client
            .post(self.search_endpoint())
            .json(body)
            .send()
            .await
            .map_err(|e| EvalError::RetrievalBackend(format!("search request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(EvalError::RetrievalBackend(format!(
                    "search error ({}): {}",
                    status,
                    api_error.reason()
                )));
            }
            return Err(EvalError::RetrievalBackend(format!(
                "search failed ({}): {}",
                status, body
            )));
        }

        parse_hit_ids(&body)
    }
}

fn parse_hit_ids(body: &str) -> Result<Vec<DocId>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| EvalError::RetrievalBackend(format!("unexpected search response: {}", e)))?;
    Ok(response.hits.hits.into_iter().map(|h| h.id).collect())
}

#[async_trait]
impl Retriever for ElasticClient {
    async fn search(&self, query: &Query, strategy: Strategy, depth: usize) -> Result<Vec<DocId>> {
        let body = match strategy {
            Strategy::Keyword => {
                let text = query.keyword_formulation().ok_or_else(|| {
                    EvalError::RetrievalBackend(format!(
                        "query {} has no keyword_query to submit",
                        query.number
                    ))
                })?;
                self.keyword_body(text, depth)
            }
            Strategy::Structured => {
                let clause = query.structured_formulation().ok_or_else(|| {
                    EvalError::RetrievalBackend(format!(
                        "query {} has no kibana_query to submit",
                        query.number
                    ))
                })?;
                Self::structured_body(clause, depth)
            }
        };

        self.execute(&body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> ElasticClient {
        ElasticClient::new(SearchConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_construction() {
        assert_eq!(
            client("http://localhost:9200/").search_endpoint(),
            "http://localhost:9200/student_index/_search"
        );
        assert_eq!(
            client("http://localhost:9200").search_endpoint(),
            "http://localhost:9200/student_index/_search"
        );
    }

    #[test]
    fn test_keyword_body() {
        let body = client("http://localhost:9200").keyword_body("rivers vienna", 40);
        assert_eq!(body["size"], 40);
        assert_eq!(body["query"]["multi_match"]["query"], "rivers vienna");
        assert_eq!(body["query"]["multi_match"]["type"], "best_fields");
        assert_eq!(
            body["query"]["multi_match"]["fields"],
            json!(["title", "parsedParagraphs"])
        );
    }

    #[test]
    fn test_structured_body_wraps_clause() {
        let clause = json!({ "bool": { "must": [ { "match": { "title": "Danube" } } ] } });
        let body = ElasticClient::structured_body(&clause, 10);
        assert_eq!(body["size"], 10);
        assert_eq!(body["query"], clause);
    }

    #[test]
    fn test_parse_hit_ids_keeps_order() {
        let body = json!({
            "hits": { "total": { "value": 3 }, "hits": [
                { "_id": "42", "_score": 3.1 },
                { "_id": "7", "_score": 2.0 },
                { "_id": 19, "_score": 1.5 }
            ] }
        })
        .to_string();

        let ids = parse_hit_ids(&body).unwrap();
        let ids: Vec<&str> = ids.iter().map(DocId::as_str).collect();
        assert_eq!(ids, vec!["42", "7", "19"]);
    }

    #[test]
    fn test_parse_hit_ids_rejects_garbage() {
        assert!(matches!(
            parse_hit_ids("{\"took\": 3}"),
            Err(EvalError::RetrievalBackend(_))
        ));
    }

    #[test]
    fn test_api_error_reason() {
        let err: ApiError = serde_json::from_value(json!({
            "error": { "type": "index_not_found_exception", "reason": "no such index [x]" },
            "status": 404
        }))
        .unwrap();
        assert_eq!(err.reason(), "no such index [x]");
    }
}
