//! 结构化抽取：把自由文本转成目标形状的 JSON，解析失败时先让 LLM 修复再重试
//!
//! 第 1 次用抽取模板请求；之后每次重试前等待 initial_delay_ms * multiplier^(n-1)，
//! 用修复模板喂入上一次的坏输出，再解析修复结果。重试次数用尽为 ExtractionFailed。
//! 只有解析失败会重试；LLM 调用本身失败直接返回。

pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::core::AgentError;
use crate::llm::{CompletionOptions, LlmClient};
use crate::memory::Message;
use crate::observability::{EngineEvent, EventSink};

/// 抽取能力
#[async_trait]
pub trait Extractor: Send + Sync {
    /// 将 raw 转为 `shape` 描述的类型 T
    async fn extract<T>(&self, raw: &str, shape: &str) -> Result<T, AgentError>
    where
        T: DeserializeOwned + Send + 'static;
}

/// 重试与补全参数
#[derive(Debug, Clone)]
pub struct ExtractionPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub extract_options: CompletionOptions,
    pub repair_options: CompletionOptions,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 4.0,
            extract_options: CompletionOptions::new(2500, 0.15),
            repair_options: CompletionOptions {
                max_tokens: Some(2500),
                temperature: None,
            },
        }
    }
}

impl ExtractionPolicy {
    /// 第 retry 次重试（从 1 开始）前的等待时间
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .powi(retry.saturating_sub(1) as i32);
        Duration::from_millis((self.initial_delay_ms as f64 * factor) as u64)
    }
}

/// 行首的 ``` 位置；字符串值内部的 ``` 不算代码块
fn fence_start(text: &str) -> Option<usize> {
    text.match_indices("```")
        .map(|(i, _)| i)
        .find(|&i| i == 0 || text[..i].ends_with('\n'))
}

/// 从 LLM 输出中取出 JSON 片段：优先行首 ``` 代码块，否则取首个 `{`/`[` 到末个 `}`/`]`
pub fn json_fragment(output: &str) -> &str {
    let trimmed = output.trim();
    if let Some(start) = fence_start(trimmed) {
        let rest = &trimmed[start + 3..];
        // 跳过语言标记（如 json）
        let rest = match rest.find('\n') {
            Some(nl) if !rest[..nl].contains(['{', '[']) => &rest[nl + 1..],
            _ => rest,
        };
        return fence_start(rest)
            .map(|end| rest[..end].trim())
            .unwrap_or(rest.trim());
    }
    let start = [trimmed.find('{'), trimmed.find('[')].into_iter().flatten().min();
    let end = [trimmed.rfind('}'), trimmed.rfind(']')].into_iter().flatten().max();
    match (start, end) {
        (Some(s), Some(e)) if s <= e => &trimmed[s..=e],
        _ => trimmed,
    }
}

/// 整段输出本身合法时直接使用，否则再取片段
fn parse_as<T: DeserializeOwned>(output: &str) -> Result<T, String> {
    serde_json::from_str(output.trim())
        .or_else(|_| serde_json::from_str(json_fragment(output)))
        .map_err(|e| e.to_string())
}

/// 基于 LLM 的抽取器
#[derive(Clone)]
pub struct LlmExtractor {
    llm: Arc<dyn LlmClient>,
    policy: ExtractionPolicy,
    events: EventSink,
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_policy(llm, ExtractionPolicy::default())
    }

    pub fn with_policy(llm: Arc<dyn LlmClient>, policy: ExtractionPolicy) -> Self {
        Self {
            llm,
            policy,
            events: EventSink::none(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn policy(&self) -> &ExtractionPolicy {
        &self.policy
    }

    async fn ask(
        &self,
        purpose: &str,
        prompt: String,
        options: &CompletionOptions,
    ) -> Result<String, AgentError> {
        self.events.emit(EngineEvent::OracleCallStart {
            purpose: purpose.to_string(),
        });
        let result = self.llm.complete_with(&[Message::user(prompt)], options).await;
        self.events.emit(EngineEvent::OracleCallEnd {
            purpose: purpose.to_string(),
            ok: result.is_ok(),
        });
        Ok(result?)
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract<T>(&self, raw: &str, shape: &str) -> Result<T, AgentError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut output = self
            .ask(
                "extract",
                prompt::extract_prompt(raw, shape),
                &self.policy.extract_options,
            )
            .await?;
        let mut reason = match parse_as::<T>(&output) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        for retry in 1..=self.policy.max_retries {
            let delay = self.policy.delay_for(retry);
            tracing::warn!(
                attempt = retry,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "extraction output did not parse, asking for a repair"
            );
            self.events.emit(EngineEvent::ExtractionRepair {
                attempt: retry,
                reason: reason.clone(),
            });
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            output = self
                .ask(
                    "repair",
                    prompt::fixer_prompt(&output, shape),
                    &self.policy.repair_options,
                )
                .await?;
            match parse_as::<T>(&output) {
                Ok(value) => return Ok(value),
                Err(e) => reason = e,
            }
        }

        Err(AgentError::ExtractionFailed {
            attempts: self.policy.max_retries + 1,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::objective::{PrioritizedTask, PRIORITIZED_TASKS_SHAPE};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        name: String,
    }

    fn instant_policy() -> ExtractionPolicy {
        ExtractionPolicy {
            initial_delay_ms: 0,
            ..ExtractionPolicy::default()
        }
    }

    fn extractor(llm: Arc<ScriptedLlmClient>) -> LlmExtractor {
        LlmExtractor::with_policy(llm, instant_policy())
    }

    #[test]
    fn test_json_fragment() {
        assert_eq!(json_fragment("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(json_fragment("```\n[1,2]\n```"), "[1,2]");
        assert_eq!(json_fragment("Sure! [{\"a\":1}] hope it helps"), "[{\"a\":1}]");
        assert_eq!(json_fragment("no json here"), "no json here");
        assert_eq!(
            json_fragment("Here you go:\n```json\n{\"a\":1}\n```\nDone."),
            "{\"a\":1}"
        );
    }

    #[test]
    fn test_inline_backticks_are_not_a_fence() {
        let text = r#"[{"task": "run ```cargo test```", "priority": 1}]"#;
        assert_eq!(json_fragment(text), text);
    }

    #[tokio::test]
    async fn test_backticks_inside_string_value_need_no_repair() {
        let raw = r#"[{"task": "document the ```cargo test``` command", "priority": 3}]"#;
        let llm = Arc::new(ScriptedLlmClient::new([raw]));
        let tasks: Vec<PrioritizedTask> = extractor(llm.clone())
            .extract("tasks", PRIORITIZED_TASKS_SHAPE)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task, "document the ```cargo test``` command");
        assert_eq!(tasks[0].priority, 3.0);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_string_with_brackets_needs_no_repair() {
        let llm = Arc::new(ScriptedLlmClient::new([r#""see [1]""#]));
        let value: String = extractor(llm.clone()).extract("ref", "string").await.unwrap();
        assert_eq!(value, "see [1]");
        assert_eq!(llm.call_count(), 1);
    }

    #[test]
    fn test_delay_schedule() {
        let policy = ExtractionPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(16000));
    }

    #[tokio::test]
    async fn test_valid_output_needs_no_repair() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"name": "Colin"}"#]));
        let person: Person = extractor(llm.clone())
            .extract("Hey my name is Colin.", r#"{"name": "string"}"#)
            .await
            .unwrap();
        assert_eq!(person.name, "Colin");
        assert_eq!(llm.call_count(), 1);

        let req = &llm.requests()[0];
        assert_eq!(req.options.max_tokens, Some(2500));
        assert_eq!(req.options.temperature, Some(0.15));
        assert!(req.text().contains("Hey my name is Colin."));
    }

    #[tokio::test]
    async fn test_one_repair_then_success() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"name": "Colin",,}"#,
            r#"{"name": "Colin"}"#,
        ]));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let person: Person = extractor(llm.clone())
            .with_events(EventSink::new(tx))
            .extract("Colin", r#"{"name": "string"}"#)
            .await
            .unwrap();
        assert_eq!(person, Person { name: "Colin".into() });
        assert_eq!(llm.call_count(), 2);
        // 修复请求携带上一次的坏输出
        assert!(llm.requests()[1].text().contains(r#"{"name": "Colin",,}"#));

        let mut repairs = 0;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, EngineEvent::ExtractionRepair { .. }) {
                repairs += 1;
            }
        }
        assert_eq!(repairs, 1);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_repaired() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"nom": "Colin"}"#, r#"{"name": "Colin"}"#]));
        let person: Person = extractor(llm.clone()).extract("Colin", "{}").await.unwrap();
        assert_eq!(person.name, "Colin");
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries() {
        let llm = Arc::new(ScriptedLlmClient::new(["nope", "still no", "nah", "never"]));
        let err = extractor(llm.clone())
            .extract::<Person>("Colin", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ExtractionFailed { attempts: 4, .. }));
        assert_eq!(llm.call_count(), 4);
    }

    #[tokio::test]
    async fn test_oracle_failure_is_not_retried() {
        let llm = Arc::new(ScriptedLlmClient::default());
        llm.push_error(LlmError::ApiError("boom".into()));
        let err = extractor(llm.clone())
            .extract::<Person>("Colin", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::LlmError(_)));
        assert_eq!(llm.call_count(), 1);
    }
}
