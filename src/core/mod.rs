//! 核心：错误类型、引擎能力接口、组件构建器

pub mod builder;
pub mod error;
pub mod executor;

pub use builder::{create_agent_builder, AgentBuilder, AgentComponents};
pub use error::AgentError;
pub use executor::Executor;
