//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / provenance / invoke），由 ToolRegistry 按名注册与查找。
//! 注册顺序即 prompt 中工具列表的顺序；名称区分大小写、唯一，重复注册时后者覆盖前者但保留原位置。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// 工具来源标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolProvenance {
    /// 进程内实现（Finish、Calculator）
    Builtin,
    /// 访问外部 HTTP 服务（Search、GetWebpage）
    Remote,
    /// 长期记忆读写
    Memory,
}

impl fmt::Display for ToolProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolProvenance::Builtin => "builtin",
            ToolProvenance::Remote => "remote",
            ToolProvenance::Memory => "memory",
        };
        f.write_str(s)
    }
}

/// 工具 trait：名称、描述（原样嵌入 prompt）、来源、异步调用（参数为纯文本）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（即 `Action: Name[...]` 中的 Name）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    fn provenance(&self) -> ToolProvenance {
        ToolProvenance::Builtin
    }

    /// 调用工具；失败信息原样向上传播
    async fn invoke(&self, argument: &str) -> Result<String, String>;
}

/// 工具注册表：保持注册顺序，按名称查找
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    /// 按注册顺序的全部工具
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// 返回 (name, description) 列表，用于生成 prompt 中的工具段落
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.tools
            .iter()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
