//! 短期记忆：对话历史
//!
//! 以 Interaction（input + response）为单位追加记录，只在 reset 时清空；
//! build_prompt 从历史拼出有 token 上限的上下文（超出时从最旧的交互开始省略，存储本身不受影响）。

use serde::{Deserialize, Serialize};

use crate::memory::TokenEstimator;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 一轮交互；Observation 以空 input 记录
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub input: String,
    pub response: String,
}

impl Interaction {
    fn render(&self) -> String {
        if self.input.is_empty() {
            self.response.clone()
        } else {
            format!("{}\n{}", self.input, self.response)
        }
    }
}

/// 对话记忆：追加有序，build_prompt 受 max_context_tokens 约束
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    interactions: Vec<Interaction>,
    max_context_tokens: usize,
}

impl ConversationMemory {
    pub fn new(max_context_tokens: usize) -> Self {
        Self {
            interactions: Vec::new(),
            max_context_tokens,
        }
    }

    pub fn add_interaction(&mut self, input: impl Into<String>, response: impl Into<String>) {
        self.interactions.push(Interaction {
            input: input.into(),
            response: response.into(),
        });
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// 拼出「历史 + 新的种子行」；种子行总是保留，历史从最新往前尽量装入预算
    pub fn build_prompt(&self, seed: &str) -> String {
        let mut budget = self
            .max_context_tokens
            .saturating_sub(TokenEstimator::estimate(seed));
        let mut kept: Vec<String> = Vec::new();
        for interaction in self.interactions.iter().rev() {
            let rendered = interaction.render();
            let cost = TokenEstimator::estimate(&rendered);
            if cost > budget {
                break;
            }
            budget -= cost;
            kept.push(rendered);
        }
        kept.reverse();
        kept.push(seed.to_string());
        kept.join("\n")
    }

    pub fn reset(&mut self) {
        self.interactions.clear();
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}
