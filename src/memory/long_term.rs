//! 长期记忆：跨任务检索与写入
//!
//! 支持 retrieve(query, top_k) 与 save(text)；InMemoryLongTerm 按关键词重叠检索，
//! RetrievalApiMemory（见 retrieval.rs）对接外部向量检索服务。检索为空不是错误。

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::core::AgentError;

/// 长期记忆 trait
#[async_trait]
pub trait LongTermMemory: Send + Sync {
    /// 按查询检索最相关的 top_k 条文本片段
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, AgentError>;

    /// 存入一段文本，返回其 id
    async fn save(&self, text: &str) -> Result<String, AgentError>;
}

/// 空实现：未启用长期记忆时使用
#[derive(Clone, Default)]
pub struct NoopLongTerm;

#[async_trait]
impl LongTermMemory for NoopLongTerm {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<String>, AgentError> {
        Ok(Vec::new())
    }

    async fn save(&self, _text: &str) -> Result<String, AgentError> {
        Ok(String::new())
    }
}

struct Entry {
    text: String,
    tokens: HashSet<String>,
}

/// 简单内存实现：按关键词重叠检索（无真实向量）
#[derive(Clone)]
pub struct InMemoryLongTerm {
    store: Arc<RwLock<Vec<Entry>>>,
    max_entries: usize,
}

/// 将文本切分为小写词集合，用于简单相似度（词重叠数）
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() > 1)
        .collect()
}

impl InMemoryLongTerm {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(Vec::new())),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全部已存文本（按写入顺序）
    pub fn texts(&self) -> Vec<String> {
        self.store
            .read()
            .map(|s| s.iter().map(|e| e.text.clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryLongTerm {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl LongTermMemory for InMemoryLongTerm {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, AgentError> {
        let query_tokens = tokenize_lower(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }
        let store = self
            .store
            .read()
            .map_err(|_| AgentError::Memory("long-term store poisoned".to_string()))?;
        let mut scored: Vec<(usize, &str)> = store
            .iter()
            .map(|e| (query_tokens.intersection(&e.tokens).count(), e.text.as_str()))
            .filter(|(s, _)| *s > 0)
            .collect();
        // 稳定排序：同分时较早写入的在前
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, t)| t.to_string())
            .collect())
    }

    async fn save(&self, text: &str) -> Result<String, AgentError> {
        let text = text.trim();
        let id = uuid::Uuid::new_v4().to_string();
        if text.is_empty() {
            return Ok(id);
        }
        let mut store = self
            .store
            .write()
            .map_err(|_| AgentError::Memory("long-term store poisoned".to_string()))?;
        store.push(Entry {
            text: text.to_string(),
            tokens: tokenize_lower(text),
        });
        let n = store.len();
        if n > self.max_entries {
            store.drain(0..n - self.max_entries);
        }
        tracing::debug!(id = %id, entries = store.len(), "long-term memory saved");
        Ok(id)
    }
}
