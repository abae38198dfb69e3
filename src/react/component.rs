//! Component 引擎：ReAct 循环结束时额外给出一个前端组件
//!
//! 终止补全中须同时包含 `Action: Finish[reply]` 与 `Component: Name[arg]` 两行；
//! 组件由 ComponentRegistry 按名解析，render 得到 JSON，整体返回 `{message, component}`。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::core::{AgentError, Executor};
use crate::llm::LlmClient;
use crate::observability::EventSink;
use crate::react::loop_::{with_finish_first, ReactEngine};
use crate::react::parser::parse_component;
use crate::react::prompt::{self, Example, COMPONENT_TEMPLATE};
use crate::tools::{FinishTool, ToolRegistry};

/// 响应组件
#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn render(&self, argument: &str) -> Result<Value, String>;
}

/// 组件注册表（保持注册顺序）
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    components: Vec<Arc<dyn Component>>,
    index: HashMap<String, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, component: impl Component + 'static) {
        let component: Arc<dyn Component> = Arc::new(component);
        let name = component.name().to_string();
        match self.index.get(&name) {
            Some(&i) => self.components[i] = component,
            None => {
                self.index.insert(name, self.components.len());
                self.components.push(component);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.index.get(name).map(|&i| self.components[i].clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.components
            .iter()
            .map(|c| (c.name().to_string(), c.description().to_string()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// 卡片组件：`Card[title, content, imageSrc, imageAlt]`
pub struct CardComponent;

#[async_trait]
impl Component for CardComponent {
    fn name(&self) -> &str {
        "Card"
    }

    fn description(&self) -> &str {
        "A card component, designed to display information in a card format on the frontend. Card[title, content, imageSrc, imageAlt]"
    }

    async fn render(&self, argument: &str) -> Result<Value, String> {
        let mut parts = argument.split(',').map(str::trim);
        let mut next = || parts.next().map(|s| Value::String(s.to_string())).unwrap_or(Value::Null);
        Ok(json!({
            "title": next(),
            "content": next(),
            "imageSrc": next(),
            "imageAlt": next(),
        }))
    }
}

/// Component 引擎的回复
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentResponse {
    pub message: String,
    pub component: Value,
}

impl fmt::Display for ComponentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

pub struct ComponentEngine {
    inner: ReactEngine,
    components: ComponentRegistry,
    component_names: Vec<String>,
}

impl ComponentEngine {
    pub fn new(llm: Arc<dyn LlmClient>, tools: &ToolRegistry, components: ComponentRegistry) -> Self {
        Self::with_examples(llm, tools, components, &prompt::default_examples())
    }

    pub fn with_examples(
        llm: Arc<dyn LlmClient>,
        tools: &ToolRegistry,
        components: ComponentRegistry,
        examples: &[Example],
    ) -> Self {
        let registry = with_finish_first(FinishTool::with_component(), tools);
        let tool_names = registry.tool_names().join(", ");
        let system_prompt = prompt::fill(
            COMPONENT_TEMPLATE,
            &[
                ("tools", &prompt::render_entries(&registry.tool_descriptions())),
                ("components", &prompt::render_entries(&components.descriptions())),
                ("toolNames", &tool_names),
                ("examples", &prompt::render_examples(examples)),
            ],
        );
        let component_names = components.names();
        Self {
            inner: ReactEngine::from_parts(llm, registry, system_prompt),
            components,
            component_names,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.inner = self.inner.with_max_iterations(max_iterations);
        self
    }

    pub fn with_context_max_tokens(mut self, max_tokens: usize) -> Self {
        self.inner = self.inner.with_context_max_tokens(max_tokens);
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.inner = self.inner.with_events(events);
        self
    }

    pub fn system_prompt(&self) -> &str {
        self.inner.system_prompt()
    }

    pub fn engine(&self) -> &ReactEngine {
        &self.inner
    }

    async fn render_component(&self, completion: &str) -> Result<Value, AgentError> {
        let directive = parse_component(completion, &self.component_names)
            .ok_or_else(|| AgentError::parse_failure("component", completion))?;
        let component = self
            .components
            .get(&directive.name)
            .ok_or_else(|| AgentError::UnknownComponent(directive.name.clone()))?;
        tracing::debug!(component = %directive.name, argument = %directive.argument, "COMPONENT -- rendering");
        component
            .render(&directive.argument)
            .await
            .map_err(|message| AgentError::ComponentRenderFailed {
                component: directive.name.clone(),
                message,
            })
    }
}

#[async_trait]
impl Executor for ComponentEngine {
    type Output = ComponentResponse;

    async fn call(&mut self, input: &str) -> Result<ComponentResponse, AgentError> {
        let outcome = self.inner.run(input).await?;
        let component = self.render_component(&outcome.completion).await?;
        Ok(ComponentResponse {
            message: outcome.answer,
            component,
        })
    }

    fn reset(&mut self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    fn components() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register(CardComponent);
        registry
    }

    #[tokio::test]
    async fn test_card_splits_on_commas() {
        let value = CardComponent
            .render("Weather, Sunny all day, https://img/sun.png, a sun")
            .await
            .unwrap();
        assert_eq!(value["title"], "Weather");
        assert_eq!(value["content"], "Sunny all day");
        assert_eq!(value["imageSrc"], "https://img/sun.png");
        assert_eq!(value["imageAlt"], "a sun");

        let partial = CardComponent.render("Only title").await.unwrap();
        assert_eq!(partial["title"], "Only title");
        assert!(partial["imageAlt"].is_null());
    }

    #[test]
    fn test_system_prompt_lists_components_and_tool_names() {
        let llm = Arc::new(ScriptedLlmClient::default());
        let engine = ComponentEngine::new(llm, &ToolRegistry::new(), components());
        let prompt = engine.system_prompt();
        assert!(prompt.contains("- Card[A card component"));
        assert!(prompt.contains("should be one of [Finish]"));
        assert!(prompt.contains("include a component with this action"));
    }

    #[tokio::test]
    async fn test_finish_with_component() {
        let llm = Arc::new(ScriptedLlmClient::new([
            "Thought: I can reply\nAction: Finish[Here is the forecast]\nComponent: Card[Forecast, Sunny, , ]",
        ]));
        let mut engine = ComponentEngine::new(llm, &ToolRegistry::new(), components());
        let resp = engine.call("weather?").await.unwrap();
        assert_eq!(resp.message, "Here is the forecast");
        assert_eq!(resp.component["title"], "Forecast");

        let shown: Value = serde_json::from_str(&resp.to_string()).unwrap();
        assert_eq!(shown["message"], "Here is the forecast");
    }

    #[tokio::test]
    async fn test_missing_component_line_is_parse_failure() {
        let llm = Arc::new(ScriptedLlmClient::new(["Action: Finish[no component]"]));
        let mut engine = ComponentEngine::new(llm, &ToolRegistry::new(), components());
        let err = engine.call("hi").await.unwrap_err();
        assert!(matches!(err, AgentError::ParseFailure { kind: "component", .. }));
    }

    struct Chart;

    #[async_trait]
    impl Component for Chart {
        fn name(&self) -> &str {
            "Chart"
        }

        fn description(&self) -> &str {
            "A chart. Chart[series]"
        }

        async fn render(&self, _argument: &str) -> Result<Value, String> {
            Err("no data points".to_string())
        }
    }

    #[tokio::test]
    async fn test_render_failure_names_the_component() {
        let llm = Arc::new(ScriptedLlmClient::new([
            "Action: Finish[see chart]\nComponent: Chart[]",
        ]));
        let mut registry = ComponentRegistry::new();
        registry.register(Chart);
        let mut engine = ComponentEngine::new(llm, &ToolRegistry::new(), registry);
        match engine.call("plot it").await.unwrap_err() {
            AgentError::ComponentRenderFailed { component, message } => {
                assert_eq!(component, "Chart");
                assert_eq!(message, "no data points");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
