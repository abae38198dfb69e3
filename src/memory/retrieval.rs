//! 外部检索服务长期记忆（retrieval plugin 协议）
//!
//! - 检索：POST {base}/query，body 为 [{"query", "top_k"}]，取每组结果的前 top_k 条 text
//! - 写入：POST {base}/upsert，body 为 [{"text", "metadata"}]，返回首个 document id
//! 两者都带 Bearer 鉴权；非 2xx 视为 Memory 错误。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::memory::LongTermMemory;

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    results: Vec<QueryResult>,
}

#[derive(Deserialize)]
struct QueryResult {
    #[serde(default)]
    results: Vec<DocumentChunk>,
}

#[derive(Deserialize)]
struct DocumentChunk {
    text: String,
}

#[derive(Serialize)]
struct UpsertDocument<'a> {
    text: &'a str,
    metadata: UpsertMetadata,
}

#[derive(Serialize)]
struct UpsertMetadata {
    source: &'static str,
    created_at: String,
}

#[derive(Deserialize)]
struct UpsertResponse {
    document_ids: Vec<String>,
}

/// 检索服务客户端
pub struct RetrievalApiMemory {
    client: Client,
    base_url: String,
    bearer_token: String,
}

impl RetrievalApiMemory {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
        }
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AgentError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::Memory(format!("Request {} failed: {}", path, e)))?;
        if !resp.status().is_success() {
            return Err(AgentError::Memory(format!(
                "{} returned HTTP {}",
                path,
                resp.status()
            )));
        }
        resp.json::<R>()
            .await
            .map_err(|e| AgentError::Memory(format!("Decode {} response: {}", path, e)))
    }
}

#[async_trait]
impl LongTermMemory for RetrievalApiMemory {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, AgentError> {
        let body = [QueryRequest { query, top_k }];
        let resp: QueryResponse = self.post("query", &body).await?;
        Ok(resp
            .results
            .into_iter()
            .flat_map(|r| r.results.into_iter().take(top_k))
            .map(|chunk| chunk.text)
            .collect())
    }

    async fn save(&self, text: &str) -> Result<String, AgentError> {
        let body = [UpsertDocument {
            text,
            metadata: UpsertMetadata {
                source: "chat",
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }];
        let resp: UpsertResponse = self.post("upsert", &body).await?;
        resp.document_ids
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Memory("upsert returned no document id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_decodes_and_flattens() {
        let raw = r#"{"results":[{"query":"q","results":[
            {"id":"1","text":"alpha","score":0.9,"metadata":{}},
            {"id":"2","text":"beta","score":0.5,"metadata":{}}
        ]}]}"#;
        let resp: QueryResponse = serde_json::from_str(raw).unwrap();
        let texts: Vec<String> = resp
            .results
            .into_iter()
            .flat_map(|r| r.results.into_iter().take(1))
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["alpha"]);
    }

    #[test]
    fn test_upsert_body_shape() {
        let body = [UpsertDocument {
            text: "Task: t. Result: r",
            metadata: UpsertMetadata {
                source: "chat",
                created_at: "2024-01-01T00:00:00Z".to_string(),
            },
        }];
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json[0]["text"], "Task: t. Result: r");
        assert_eq!(json[0]["metadata"]["source"], "chat");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let memory = RetrievalApiMemory::new("http://localhost:8000/", "token", 5);
        assert_eq!(memory.base_url, "http://localhost:8000");
    }
}
