//! Drone - 基于 ReAct 的自主 Agent 框架
//!
//! 模块划分：
//! - **agent**: 面向用户的 Agent 外壳（失败不透出细节）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、Executor 能力接口、组件构建器
//! - **extraction**: 结构化抽取与修复重试
//! - **llm**: LLM 客户端抽象、传输层重试与实现（OpenAI 兼容 / Scripted）
//! - **memory**: 对话记忆与长期记忆
//! - **objective**: 目标驱动的任务队列引擎
//! - **observability**: tracing 初始化与引擎事件
//! - **react**: 动作解析、Planner、ReAct 主循环、Component 引擎
//! - **tools**: 工具注册、分发与内置工具（Search、GetWebpage、Calculator、记忆读写）

pub mod agent;
pub mod config;
pub mod core;
pub mod extraction;
pub mod llm;
pub mod memory;
pub mod objective;
pub mod observability;
pub mod react;
pub mod tools;

pub use agent::Agent;
pub use core::{AgentBuilder, AgentError, Executor};
pub use extraction::{Extractor, LlmExtractor};
pub use objective::TaskQueueEngine;
pub use react::{ComponentEngine, ReactEngine};
