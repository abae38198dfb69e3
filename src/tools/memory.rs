//! RetrieveMemory / SaveMemory：把长期记忆暴露为工具

use std::sync::Arc;

use async_trait::async_trait;

use crate::memory::LongTermMemory;
use crate::tools::{Tool, ToolProvenance};

/// 检索条数
const RETRIEVE_TOP_K: usize = 3;

pub struct RetrieveMemoryTool {
    memory: Arc<dyn LongTermMemory>,
}

impl RetrieveMemoryTool {
    pub fn new(memory: Arc<dyn LongTermMemory>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for RetrieveMemoryTool {
    fn name(&self) -> &str {
        "RetrieveMemory"
    }

    fn description(&self) -> &str {
        "This tool allows you to retrieve user responses and other information that you saved earlier."
    }

    fn provenance(&self) -> ToolProvenance {
        ToolProvenance::Memory
    }

    async fn invoke(&self, argument: &str) -> Result<String, String> {
        let hits = self
            .memory
            .retrieve(argument.trim(), RETRIEVE_TOP_K)
            .await
            .map_err(|e| format!("Error retrieving memories: {}", e))?;
        Ok(hits.join(" "))
    }
}

pub struct SaveMemoryTool {
    memory: Arc<dyn LongTermMemory>,
}

impl SaveMemoryTool {
    pub fn new(memory: Arc<dyn LongTermMemory>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for SaveMemoryTool {
    fn name(&self) -> &str {
        "SaveMemory"
    }

    fn description(&self) -> &str {
        "Save a piece of text to long-term memory so it can be retrieved later. Input should be the text to save."
    }

    fn provenance(&self) -> ToolProvenance {
        ToolProvenance::Memory
    }

    async fn invoke(&self, argument: &str) -> Result<String, String> {
        let text = argument.trim();
        if text.is_empty() {
            return Err("Nothing to save".to_string());
        }
        self.memory
            .save(text)
            .await
            .map_err(|e| format!("Error saving document: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLongTerm;

    #[tokio::test]
    async fn test_save_then_retrieve() {
        let memory = Arc::new(InMemoryLongTerm::default());
        let save = SaveMemoryTool::new(memory.clone());
        let retrieve = RetrieveMemoryTool::new(memory.clone());

        let id = save.invoke("The user's favourite colour is green").await.unwrap();
        assert!(!id.is_empty());
        let out = retrieve.invoke("favourite colour").await.unwrap();
        assert!(out.contains("green"));
        assert!(save.invoke("   ").await.is_err());
    }
}
