//! 面向用户的 Agent 外壳
//!
//! 包装任意 Executor：add_message 成功时记录 (输入, 回复) 并返回 Some，
//! 失败时只记录错误日志并返回 None，调用方看不到错误细节。

use crate::core::Executor;
use crate::memory::Interaction;

pub const HISTORY_CLEARED: &str = "History cleared";

pub struct Agent<E: Executor> {
    engine: E,
    history: Vec<Interaction>,
}

impl<E: Executor> Agent<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            history: Vec::new(),
        }
    }

    pub async fn add_message(&mut self, input: &str) -> Option<String> {
        match self.engine.call(input).await {
            Ok(output) => {
                let response = output.to_string();
                self.history.push(Interaction {
                    input: input.to_string(),
                    response: response.clone(),
                });
                Some(response)
            }
            Err(e) => {
                tracing::error!(error = %e, input = %input, "agent call failed");
                None
            }
        }
    }

    /// 重置引擎与对话历史
    pub fn reset(&mut self) -> &'static str {
        self.engine.reset();
        self.history.clear();
        HISTORY_CLEARED
    }

    pub fn history(&self) -> &[Interaction] {
        &self.history
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}
