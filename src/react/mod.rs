//! 认知层：动作解析、提示词模板、Planner、ReAct 主循环、Component 引擎

pub mod component;
pub mod loop_;
pub mod parser;
pub mod planner;
pub mod prompt;

pub use component::{CardComponent, Component, ComponentEngine, ComponentRegistry, ComponentResponse};
pub use loop_::{ReactEngine, ReactOutcome, DEFAULT_CONTEXT_MAX_TOKENS, DEFAULT_MAX_ITERATIONS};
pub use parser::{parse_action, parse_component, parse_directive, Directive};
pub use planner::Planner;
pub use prompt::Example;
