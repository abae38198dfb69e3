//! 任务队列记录

use serde::{Deserialize, Deserializer, Serialize};

/// 待办任务：描述与优先级
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedTask {
    pub task: String,
    #[serde(default, deserialize_with = "priority_from_any")]
    pub priority: f64,
}

impl PrioritizedTask {
    pub fn new(task: impl Into<String>, priority: f64) -> Self {
        Self {
            task: task.into(),
            priority,
        }
    }
}

/// 模型有时把优先级写成字符串（"8"），两种都接受
fn priority_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// 已完成任务（只追加，不修改）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub task: String,
    pub result: String,
}

/// 抽取新任务 / 重排队列时给模型的目标形状
pub const PRIORITIZED_TASKS_SHAPE: &str = r#"[
    {
        "task": "string",
        "priority": "number"
    },
    {
        "task": "string",
        "priority": "number"
    },
    ...
]"#;
