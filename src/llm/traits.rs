//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Scripted）实现 LlmClient：complete 为一次无状态的补全调用。
//! RetryingLlmClient 在传输层做指数退避重试，重试耗尽后以 LlmError::Exhausted 交给上层（对核心而言是致命错误）。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// LLM 调用错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited (retry after {retry_after_ms} ms)")]
    RateLimited { retry_after_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    /// 请求本身不合法（构造失败、参数错误），重试无意义
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl LlmError {
    /// 是否值得在传输层重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ApiError(_) | LlmError::RateLimited { .. } | LlmError::Network(_)
        )
    }
}

/// 单次调用的生成参数；None 表示使用客户端默认值
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
        }
    }
}

/// LLM 客户端 trait：有序消息 -> 文本
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 使用默认参数完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.complete_with(messages, &CompletionOptions::default())
            .await
    }

    /// 使用指定参数完成
    async fn complete_with(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 传输层重试配置：第 n 次重试前等待 initial_delay_ms * multiplier^(n-1)，不超过 max_delay_ms
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 8,
            initial_delay_ms: 1000,
            backoff_multiplier: 4.0,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryConfig {
    /// 不等待、不重试（测试用）
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 0,
            backoff_multiplier: 1.0,
            max_delay_ms: 0,
        }
    }

    pub fn delay_for(&self, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        if let Some(ms) = retry_after_ms {
            return Duration::from_millis(ms.min(self.max_delay_ms));
        }
        let multiplier = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// 带重试的 LLM 客户端装饰器
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete_with(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.inner.complete_with(messages, options).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt <= self.config.max_retries => {
                    let retry_after = match &e {
                        LlmError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
                        _ => None,
                    };
                    let delay = self.config.delay_for(attempt, retry_after);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "LLM call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(LlmError::Exhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}
