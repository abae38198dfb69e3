//! 应用配置：从 config/default.toml、显式文件与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DRONE__*` 覆盖（双下划线表示嵌套，如 `DRONE__LLM__MODEL=gpt-4o`）。
//! 每个字段都有默认值，缺少配置文件不是错误。

use std::path::PathBuf;

use serde::Deserialize;

use crate::extraction::ExtractionPolicy;
use crate::llm::{CompletionOptions, RetryConfig};
use crate::objective::ObjectiveSettings;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub react: ReactSection,
    pub extraction: ExtractionSection,
    pub objective: ObjectiveSection,
    pub tools: ToolsSection,
    pub memory: MemorySection,
}

/// [llm] 段：OpenAI 兼容接口
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时读 OPENAI_API_KEY
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retry: LlmRetrySection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.7,
            max_tokens: 1000,
            retry: LlmRetrySection::default(),
        }
    }
}

impl LlmSection {
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions::new(self.max_tokens, self.temperature)
    }
}

/// [llm.retry] 段：传输层重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmRetrySection {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for LlmRetrySection {
    fn default() -> Self {
        let d = RetryConfig::default();
        Self {
            max_retries: d.max_retries,
            initial_delay_ms: d.initial_delay_ms,
            backoff_multiplier: d.backoff_multiplier,
            max_delay_ms: d.max_delay_ms,
        }
    }
}

impl From<&LlmRetrySection> for RetryConfig {
    fn from(s: &LlmRetrySection) -> Self {
        RetryConfig {
            max_retries: s.max_retries,
            initial_delay_ms: s.initial_delay_ms,
            backoff_multiplier: s.backoff_multiplier,
            max_delay_ms: s.max_delay_ms,
        }
    }
}

/// [react] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReactSection {
    pub max_iterations: usize,
    pub context_max_tokens: usize,
}

impl Default for ReactSection {
    fn default() -> Self {
        Self {
            max_iterations: crate::react::DEFAULT_MAX_ITERATIONS,
            context_max_tokens: crate::react::DEFAULT_CONTEXT_MAX_TOKENS,
        }
    }
}

/// [extraction] 段：修复重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 4.0,
            max_tokens: 2500,
            temperature: 0.15,
        }
    }
}

impl From<&ExtractionSection> for ExtractionPolicy {
    fn from(s: &ExtractionSection) -> Self {
        ExtractionPolicy {
            max_retries: s.max_retries,
            initial_delay_ms: s.initial_delay_ms,
            backoff_multiplier: s.backoff_multiplier,
            extract_options: CompletionOptions::new(s.max_tokens, s.temperature),
            repair_options: CompletionOptions {
                max_tokens: Some(s.max_tokens),
                temperature: None,
            },
        }
    }
}

/// [objective] 段：任务队列
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectiveSection {
    pub initial_priority: f64,
    pub context_top_k: usize,
    pub max_new_tasks: usize,
    pub max_prioritized_tasks: usize,
}

impl Default for ObjectiveSection {
    fn default() -> Self {
        let d = ObjectiveSettings::default();
        Self {
            initial_priority: d.initial_priority,
            context_top_k: d.context_top_k,
            max_new_tasks: d.max_new_tasks,
            max_prioritized_tasks: d.max_prioritized_tasks,
        }
    }
}

impl From<&ObjectiveSection> for ObjectiveSettings {
    fn from(s: &ObjectiveSection) -> Self {
        ObjectiveSettings {
            initial_priority: s.initial_priority,
            context_top_k: s.context_top_k,
            max_new_tasks: s.max_new_tasks,
            max_prioritized_tasks: s.max_prioritized_tasks,
        }
    }
}

/// [tools] 段：HTTP 工具的超时、结果长度与搜索参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub timeout_secs: u64,
    pub max_result_chars: usize,
    /// 未设置时读 SERP_API_KEY
    pub serp_api_key: Option<String>,
    pub search_location: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_result_chars: 8000,
            serp_api_key: None,
            search_location: "United States".to_string(),
        }
    }
}

/// [memory] 段：外部检索服务；未配置时使用进程内关键词记忆
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MemorySection {
    /// 未设置时读 RETRIEVAL_API_URL
    pub retrieval_api_url: Option<String>,
    /// 未设置时读 RETRIEVAL_API_KEY
    pub retrieval_api_key: Option<String>,
}

/// 加载配置：config/default.toml（若存在）→ 显式文件 → `DRONE__*` 环境变量
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DRONE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 读取环境变量，空字符串视为未设置
pub(crate) fn env_fallback(value: &Option<String>, var: &str) -> Option<String> {
    value
        .clone()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
}
