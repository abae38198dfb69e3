//! GetWebpage 工具：抓取单个网页并返回可读文本
//!
//! HTML 经 html2text 转为纯文本，逐行 trim 并去除空行；超过 max_result_chars 时截断并追加 ...[truncated]。

use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;

use crate::tools::{Tool, ToolProvenance};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub struct GetWebpageTool {
    client: Client,
    max_result_chars: usize,
}

/// 判断内容是否像 HTML
fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.to_ascii_lowercase().starts_with("<html")
        || (s.contains('<') && (s.contains("</") || s.contains("<body")))
}

/// 逐行 trim，丢弃空行
fn collapse_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() > max {
        text.chars().take(max).collect::<String>() + "\n...[truncated]"
    } else {
        text
    }
}

/// 把响应体转为清理后的文本
pub fn page_text(body: &str, max_chars: usize) -> String {
    let body = body.trim_start_matches('\u{FEFF}');
    let text = if looks_like_html(body) {
        match from_read(body.as_bytes(), 120) {
            Ok(t) => t,
            Err(_) => body.to_string(),
        }
    } else {
        body.to_string()
    };
    truncate_chars(collapse_lines(&text), max_chars)
}

impl GetWebpageTool {
    pub fn new(timeout_secs: u64, max_result_chars: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            max_result_chars,
        }
    }
}

#[async_trait]
impl Tool for GetWebpageTool {
    fn name(&self) -> &str {
        "GetWebpage"
    }

    fn description(&self) -> &str {
        "A tool for fetching the contents of a single webpage. It fetches the web page content and returns the text. Input should be a URL."
    }

    fn provenance(&self) -> ToolProvenance {
        ToolProvenance::Remote
    }

    async fn invoke(&self, argument: &str) -> Result<String, String> {
        let url = argument.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("Invalid URL: {}", url));
        }
        tracing::info!(url = %url, "fetching webpage");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Error while fetching web page: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("Error while fetching web page: HTTP {}", resp.status()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Error while reading web page: {}", e))?;
        Ok(page_text(&body, self.max_result_chars))
    }
}
