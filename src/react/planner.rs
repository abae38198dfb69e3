//! Planner：持有 LLM 与已填充的 system prompt
//!
//! 每次规划发送两条消息：system（指令模板）+ assistant（对话记忆渲染出的上下文与种子行）。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// 以 context 作为 assistant 消息请求下一步补全
    pub async fn plan(&self, context: &str) -> Result<String, AgentError> {
        let messages = [
            Message::system(self.system_prompt.as_str()),
            Message::assistant(context),
        ];
        tracing::debug!(context = %context, "PLAN -- plan message");
        let completion = self.llm.complete(&messages).await?;
        tracing::debug!(completion = %completion, "PLAN -- completion");
        Ok(completion)
    }
}
