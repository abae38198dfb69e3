//! Agent 错误类型
//!
//! 除结构化抽取的修复重试外，不做任何本地恢复：所有错误直接向调用方传播。

use thiserror::Error;

use crate::llm::LlmError;

/// Agent 运行过程中可能出现的错误（LLM、解析、工具、抽取、步数上限等）
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM 调用失败（传输层重试已耗尽）
    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    /// 输出中找不到合法的 `Action:` / `Component:` 行；携带原始文本
    #[error("Could not parse {kind} text: {text}")]
    ParseFailure { kind: &'static str, text: String },

    #[error("Could not find tool: {0}")]
    UnknownTool(String),

    #[error("Could not find component: {0}")]
    UnknownComponent(String),

    /// 工具自身失败，消息原样保留
    #[error("Tool {tool} failed: {message}")]
    ToolExecutionFailed { tool: String, message: String },

    /// 组件渲染失败，消息原样保留
    #[error("Component {component} failed to render: {message}")]
    ComponentRenderFailed { component: String, message: String },

    #[error("Extraction failed after {attempts} attempts: {reason}")]
    ExtractionFailed { attempts: u32, reason: String },

    #[error("Max iterations reached: {0}")]
    MaxIterationsExceeded(usize),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AgentError {
    pub fn parse_failure(kind: &'static str, text: impl Into<String>) -> Self {
        Self::ParseFailure {
            kind,
            text: text.into(),
        }
    }
}
