//! ReAct 主循环
//!
//! START → PLANNING → (FINISHED | ACTING) → PLANNING → … → FINISHED | 超过步数上限。
//! 第一次规划以 `Input: <input>` 为种子；此后每次 Act 得到的观察以 `Observation: <obs>` 作为下一次规划的种子。
//! 解析失败、未知工具、工具失败、LLM 失败均直接向上返回，循环本身不做重试。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{AgentError, Executor};
use crate::llm::LlmClient;
use crate::memory::ConversationMemory;
use crate::observability::events::preview;
use crate::observability::{EngineEvent, EventSink};
use crate::react::parser::{parse_action, Directive, ACTION_LABEL};
use crate::react::prompt::{self, Example, REACT_TEMPLATE};
use crate::react::Planner;
use crate::tools::{FinishTool, Tool, ToolDispatcher, ToolRegistry, FINISH_TOOL_NAME};

/// 默认最大 Act 次数
pub const DEFAULT_MAX_ITERATIONS: usize = 8;
/// 默认上下文 token 上限
pub const DEFAULT_CONTEXT_MAX_TOKENS: usize = 3500;

/// 一次 ReAct 调用的终止结果：Finish 的参数与产生它的那次补全原文
#[derive(Debug, Clone)]
pub struct ReactOutcome {
    pub answer: String,
    pub completion: String,
}

/// ReAct 引擎：私有对话记忆 + 固定工具集
pub struct ReactEngine {
    planner: Planner,
    dispatcher: ToolDispatcher,
    tool_names: Vec<String>,
    memory: ConversationMemory,
    max_iterations: usize,
    events: EventSink,
}

/// 将 Finish 置于首位，其余工具保持原顺序
pub(crate) fn with_finish_first(finish: FinishTool, tools: &ToolRegistry) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(finish);
    for tool in tools.tools() {
        if tool.name() != FINISH_TOOL_NAME {
            registry.register_arc(tool.clone());
        }
    }
    registry
}

impl ReactEngine {
    /// 使用默认模板与示例
    pub fn new(llm: Arc<dyn LlmClient>, tools: &ToolRegistry) -> Self {
        Self::with_examples(llm, tools, &prompt::default_examples())
    }

    pub fn with_examples(llm: Arc<dyn LlmClient>, tools: &ToolRegistry, examples: &[Example]) -> Self {
        let registry = with_finish_first(FinishTool::new(), tools);
        let system_prompt = prompt::fill(
            REACT_TEMPLATE,
            &[
                ("tools", &prompt::render_entries(&registry.tool_descriptions())),
                ("examples", &prompt::render_examples(examples)),
            ],
        );
        Self::from_parts(llm, registry, system_prompt)
    }

    /// 供 Component 引擎复用：调用方给出完整工具集（含 Finish）与已填充的 system prompt
    pub(crate) fn from_parts(llm: Arc<dyn LlmClient>, registry: ToolRegistry, system_prompt: String) -> Self {
        let tool_names = registry.tool_names();
        Self {
            planner: Planner::new(llm, system_prompt),
            dispatcher: ToolDispatcher::new(registry),
            tool_names,
            memory: ConversationMemory::new(DEFAULT_CONTEXT_MAX_TOKENS),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            events: EventSink::none(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_context_max_tokens(mut self, max_tokens: usize) -> Self {
        self.memory = ConversationMemory::new(max_tokens);
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn system_prompt(&self) -> &str {
        self.planner.system_prompt()
    }

    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// PLAN：渲染上下文、调用 LLM、记录 (seed, completion)、解析 Action
    async fn plan(&mut self, seed: &str) -> Result<(Directive, String), AgentError> {
        let context = self.memory.build_prompt(seed);
        self.events.emit(EngineEvent::OracleCallStart {
            purpose: "plan".to_string(),
        });
        let result = self.planner.plan(&context).await;
        self.events.emit(EngineEvent::OracleCallEnd {
            purpose: "plan".to_string(),
            ok: result.is_ok(),
        });
        let completion = result?;
        self.memory.add_interaction(seed, completion.as_str());

        let directive = parse_action(&completion, &self.tool_names)
            .ok_or_else(|| AgentError::parse_failure("action", completion.as_str()))?;
        tracing::debug!(
            action = %directive.name,
            argument = %directive.argument,
            "PLAN -- parsed {}",
            ACTION_LABEL
        );
        Ok((directive, completion))
    }

    /// ACT：分发工具，观察以空输入记入对话记忆
    async fn act(&mut self, directive: &Directive) -> Result<String, AgentError> {
        tracing::debug!(tool = %directive.name, argument = %directive.argument, "ACT -- invoking tool");
        self.events.emit(EngineEvent::ToolCall {
            tool: directive.name.clone(),
            argument: directive.argument.clone(),
        });
        let observation = self
            .dispatcher
            .dispatch(&directive.name, &directive.argument)
            .await?;
        tracing::debug!(observation = %observation, "ACT -- observation");
        self.events.emit(EngineEvent::Observation {
            tool: directive.name.clone(),
            preview: preview(&observation),
        });
        self.memory.add_interaction("", observation.as_str());
        Ok(observation)
    }

    fn finished(&self, answer: String, completion: String) -> ReactOutcome {
        tracing::debug!(answer = %answer, "React -- finished");
        self.events.emit(EngineEvent::Finished {
            answer: answer.clone(),
        });
        ReactOutcome { answer, completion }
    }

    /// 运行一次完整循环，返回 Finish 结果
    pub async fn run(&mut self, input: &str) -> Result<ReactOutcome, AgentError> {
        tracing::debug!(input = %input, "Reacting to input");
        let (mut directive, mut completion) = self.plan(&format!("Input: {}", input)).await?;
        if directive.name == FINISH_TOOL_NAME {
            return Ok(self.finished(directive.argument, completion));
        }

        for iteration in 1..=self.max_iterations {
            tracing::debug!(iteration, "React -- iteration");
            self.events.emit(EngineEvent::IterationStart {
                iteration,
                max_iterations: self.max_iterations,
            });
            let observation = self.act(&directive).await?;
            (directive, completion) = self.plan(&format!("Observation: {}", observation)).await?;
            self.events.emit(EngineEvent::IterationEnd { iteration });
            if directive.name == FINISH_TOOL_NAME {
                return Ok(self.finished(directive.argument, completion));
            }
        }

        Err(AgentError::MaxIterationsExceeded(self.max_iterations))
    }

    /// 清空对话记忆；工具保留
    pub fn clear(&mut self) {
        self.memory.reset();
    }
}

#[async_trait]
impl Executor for ReactEngine {
    type Output = String;

    async fn call(&mut self, input: &str) -> Result<String, AgentError> {
        Ok(self.run(input).await?.answer)
    }

    fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSearch {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingSearch {
        fn name(&self) -> &str {
            "Search"
        }

        fn description(&self) -> &str {
            "a search engine"
        }

        async fn invoke(&self, argument: &str) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("result for {}", argument))
        }
    }

    fn engine(replies: Vec<&str>) -> (ReactEngine, Arc<ScriptedLlmClient>, Arc<AtomicUsize>) {
        let llm = Arc::new(ScriptedLlmClient::new(replies));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut tools = ToolRegistry::new();
        tools.register(CountingSearch {
            calls: calls.clone(),
        });
        (ReactEngine::new(llm.clone(), &tools), llm, calls)
    }

    #[test]
    fn test_finish_is_listed_first() {
        let (engine, _, _) = engine(vec![]);
        assert_eq!(engine.tool_names(), &["Finish", "Search"]);
        assert!(engine
            .system_prompt()
            .contains("Tools:\n- Finish[Return a response to the user."));
        assert!(!engine.system_prompt().contains("{{"));
    }

    #[tokio::test]
    async fn test_immediate_finish_uses_no_tools() {
        let (mut engine, llm, calls) = engine(vec!["Thought: easy\nAction: Finish[hello]"]);
        assert_eq!(engine.call("hi").await.unwrap(), "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(llm.call_count(), 1);
        assert_eq!(llm.requests()[0].messages[1].content, "Input: hi");
    }

    #[tokio::test]
    async fn test_observation_seeds_next_plan() {
        let (mut engine, llm, calls) = engine(vec![
            "Thought: look it up\nAction: Search[rust]",
            "Thought: done\nAction: Finish[found it]",
        ]);
        assert_eq!(engine.call("what is rust").await.unwrap(), "found it");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = &llm.requests()[1].messages[1].content;
        assert!(second.starts_with("Input: what is rust\nThought: look it up"));
        assert!(second.ends_with("result for rust\nObservation: result for rust"));

        let stored = engine.memory().interactions();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1].input, "");
        assert_eq!(stored[1].response, "result for rust");
    }

    #[tokio::test]
    async fn test_parse_failure_carries_completion() {
        let (mut engine, _, _) = engine(vec!["I refuse to follow the format"]);
        let err = engine.call("hi").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::ParseFailure { kind: "action", ref text } if text == "I refuse to follow the format"
        ));
        // 失败前的补全已记入记忆
        assert_eq!(engine.memory().len(), 1);
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        let replies = vec!["Action: Search[again]"; 4];
        let (engine, _, calls) = engine(replies);
        let mut engine = engine.with_max_iterations(3);
        let err = engine.call("loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxIterationsExceeded(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_reset_clears_memory_only() {
        let (mut engine, _, _) = engine(vec!["Action: Finish[a]", "Action: Finish[b]"]);
        engine.call("one").await.unwrap();
        engine.reset();
        engine.reset();
        assert!(engine.memory().is_empty());
        assert_eq!(engine.tool_names().len(), 2);
        assert_eq!(engine.call("two").await.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let (engine, _, _) = engine(vec!["Action: Search[x]", "Action: Finish[y]"]);
        let mut engine = engine.with_events(EventSink::new(tx));
        engine.call("q").await.unwrap();

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert!(events.contains(&EngineEvent::IterationStart {
            iteration: 1,
            max_iterations: DEFAULT_MAX_ITERATIONS
        }));
        assert!(events.contains(&EngineEvent::Finished {
            answer: "y".to_string()
        }));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, EngineEvent::OracleCallStart { .. }))
                .count(),
            2
        );
    }
}
