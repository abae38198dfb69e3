//! 工具分发器
//!
//! 持有 ToolRegistry，dispatch(name, argument) 按名解析并调用工具：
//! 未注册的名字为 UnknownTool，工具自身失败原样包装为 ToolExecutionFailed，不做任何重试；
//! 每次调用输出结构化审计日志（JSON）。超时属于各工具自身（如 HTTP 客户端超时）。

use std::sync::Arc;
use std::time::Instant;

use crate::core::AgentError;
use crate::observability::events::preview;
use crate::tools::{Tool, ToolRegistry};

/// 工具分发器
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.registry.get(name)
    }

    /// 解析并调用工具，返回 Observation 文本
    pub async fn dispatch(&self, tool_name: &str, argument: &str) -> Result<String, AgentError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| AgentError::UnknownTool(tool_name.to_string()))?;

        let start = Instant::now();
        let result = tool.invoke(argument).await;

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "provenance": tool.provenance().to_string(),
            "ok": result.is_ok(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "argument_preview": preview(argument),
        });
        tracing::info!(audit = %audit, "tool");

        result.map_err(|message| AgentError::ToolExecutionFailed {
            tool: tool_name.to_string(),
            message,
        })
    }
}
