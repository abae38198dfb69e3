//! Search 工具：SerpAPI Google 搜索
//!
//! GET https://serpapi.com/search.json?engine=google&q=...&location=...&api_key=...
//! 结果按 answer_box → sports_results → knowledge_graph → organic_results[0] 的顺序取第一个可用字段；
//! 都没有时返回固定提示文本。响应中的 error 字段视为工具失败。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::tools::{Tool, ToolProvenance};

const SERP_API_URL: &str = "https://serpapi.com/search.json";
pub const NO_RESULT: &str = "No good search result found";

/// SerpAPI 搜索工具
pub struct SearchTool {
    client: Client,
    api_key: String,
    location: String,
    endpoint: String,
}

impl SearchTool {
    pub fn new(api_key: impl Into<String>, location: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            location: location.into(),
            endpoint: SERP_API_URL.to_string(),
        }
    }

    /// 替换接口地址（自建代理或测试桩）
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn query(&self, q: &str) -> Result<Value, String> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", "google"),
                ("q", q),
                ("location", self.location.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| format!("Decode response: {}", e))?;
        if let Some(err) = body.get("error").and_then(|v| v.as_str()) {
            return Err(format!("Got error from serpAPI: {}", err));
        }
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }
        Ok(body)
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    let s = v?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// 从 SerpAPI 响应中挑出最佳答案
pub fn best_answer(res: &Value) -> String {
    let answer_box = res.get("answer_box");
    if let Some(s) = non_empty_str(answer_box.and_then(|b| b.get("answer"))) {
        return s;
    }
    if let Some(s) = non_empty_str(answer_box.and_then(|b| b.get("snippet"))) {
        return s;
    }
    if let Some(s) = non_empty_str(
        answer_box
            .and_then(|b| b.get("snippet_highlighted_words"))
            .and_then(|w| w.get(0)),
    ) {
        return s;
    }
    if let Some(spot) = res
        .get("sports_results")
        .and_then(|s| s.get("game_spotlight"))
        .filter(|v| !v.is_null())
    {
        return match spot.as_str() {
            Some(s) => s.to_string(),
            None => spot.to_string(),
        };
    }
    if let Some(s) = non_empty_str(res.get("knowledge_graph").and_then(|k| k.get("description"))) {
        return s;
    }
    if let Some(s) = non_empty_str(
        res.get("organic_results")
            .and_then(|o| o.get(0))
            .and_then(|r| r.get("snippet")),
    ) {
        return s;
    }
    NO_RESULT.to_string()
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "Search"
    }

    fn description(&self) -> &str {
        "a search engine. useful for when you need to answer questions about current events. input should be a search query."
    }

    fn provenance(&self) -> ToolProvenance {
        ToolProvenance::Remote
    }

    async fn invoke(&self, argument: &str) -> Result<String, String> {
        let q = argument.trim();
        if q.is_empty() {
            return Err("Missing search query".to_string());
        }
        if self.api_key.is_empty() {
            return Err("SerpAPI key is not configured".to_string());
        }
        tracing::info!(query = %q, "search tool query");
        let res = self.query(q).await?;
        Ok(best_answer(&res))
    }
}
