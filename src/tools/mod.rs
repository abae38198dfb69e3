//! 工具层：Tool trait、注册表、分发器与内置工具

pub mod calculator;
pub mod dispatcher;
pub mod finish;
pub mod memory;
pub mod registry;
pub mod search;
pub mod webpage;

use std::sync::Arc;

pub use calculator::CalculatorTool;
pub use dispatcher::ToolDispatcher;
pub use finish::{FinishTool, FINISH_TOOL_NAME};
pub use memory::{RetrieveMemoryTool, SaveMemoryTool};
pub use registry::{Tool, ToolProvenance, ToolRegistry};
pub use search::SearchTool;
pub use webpage::GetWebpageTool;

use crate::config::ToolsSection;
use crate::memory::LongTermMemory;

/// 默认工具集（不含 Finish，由引擎在构造时置于首位）
pub fn default_registry(tools: &ToolsSection, memory: Arc<dyn LongTermMemory>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(SearchTool::new(
        tools.serp_api_key.clone().unwrap_or_default(),
        tools.search_location.clone(),
        tools.timeout_secs,
    ));
    registry.register(GetWebpageTool::new(tools.timeout_secs, tools.max_result_chars));
    registry.register(CalculatorTool);
    registry.register(RetrieveMemoryTool::new(memory.clone()));
    registry.register(SaveMemoryTool::new(memory));
    registry
}
