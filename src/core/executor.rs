//! 引擎能力接口：call / reset
//!
//! ReAct 引擎、Component 引擎、任务队列引擎互不继承，各自实现 Executor。

use async_trait::async_trait;

use crate::core::AgentError;

/// 可被 Agent 驱动的引擎：单次 call 顺序执行到结束或出错；reset 清空引擎私有状态
#[async_trait]
pub trait Executor: Send {
    /// call 的返回值（纯文本回复、带组件的回复等）
    type Output: std::fmt::Display + Send;

    async fn call(&mut self, input: &str) -> Result<Self::Output, AgentError>;

    fn reset(&mut self);
}
