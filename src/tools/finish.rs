//! Finish：终止动作，原样返回参数作为最终答案

use async_trait::async_trait;

use crate::tools::Tool;

/// 终止动作名
pub const FINISH_TOOL_NAME: &str = "Finish";

const REPLY_DESCRIPTION: &str =
    "Return a response to the user. This should be the last action you take. Finish[Your reply]";
const COMPONENT_DESCRIPTION: &str = "Return a response to the user. You should also include a component with this action on the next line. Finish[Your reply]";

pub struct FinishTool {
    description: &'static str,
}

impl FinishTool {
    pub fn new() -> Self {
        Self {
            description: REPLY_DESCRIPTION,
        }
    }

    /// Component 引擎使用：提示模型在下一行给出组件
    pub fn with_component() -> Self {
        Self {
            description: COMPONENT_DESCRIPTION,
        }
    }
}

impl Default for FinishTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FinishTool {
    fn name(&self) -> &str {
        FINISH_TOOL_NAME
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn invoke(&self, argument: &str) -> Result<String, String> {
        Ok(argument.to_string())
    }
}
