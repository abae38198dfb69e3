//! 引擎过程事件：循环迭代、LLM 调用、工具调用、任务周期、抽取修复
//!
//! 引擎持有可选的 EventSink；接收端被丢弃时发送失败直接忽略。

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// 单个过程事件（可序列化为带 type 标签的 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// 第 iteration 次 Act 开始（从 1 开始）
    IterationStart { iteration: usize, max_iterations: usize },
    IterationEnd { iteration: usize },
    /// 发起 LLM 调用；purpose 如 plan / execute / generate / prioritize / extract / repair
    OracleCallStart { purpose: String },
    OracleCallEnd { purpose: String, ok: bool },
    ToolCall { tool: String, argument: String },
    Observation { tool: String, preview: String },
    /// 循环结束并得到最终回复
    Finished { answer: String },
    TaskStarted { task: String },
    TaskCompleted { task: String, result_preview: String },
    /// 本轮去重后追加的新任务数与队列长度
    TasksGenerated { added: usize, pending: usize },
    QueueReprioritized { pending: usize },
    ExtractionRepair { attempt: u32, reason: String },
}

/// 可选事件通道
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<EngineEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<EngineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// 事件中的文本预览长度
pub const PREVIEW_CHARS: usize = 200;

pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let ev = EngineEvent::ToolCall {
            tool: "Search".to_string(),
            argument: "weather".to_string(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["tool"], "Search");
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = EventSink::new(tx);
        drop(rx);
        sink.emit(EngineEvent::IterationEnd { iteration: 1 });
        EventSink::none().emit(EngineEvent::IterationEnd { iteration: 1 });
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short"), "short");
        assert!(preview(&"y".repeat(500)).ends_with("..."));
    }
}
