//! 目标驱动的任务队列引擎
//!
//! 每个周期：执行当前任务 → 结果写入长期记忆 → 生成新任务 → 去重合并 → 重排队列 → 取队首为下一个任务。
//! 队列为空时结束；引擎内部不限制周期数，需要上限时由调用方逐次驱动 run_cycle。
//! 任一 LLM 调用失败都会中止整个运行，不做周期级重试。

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{AgentError, Executor};
use crate::extraction::{Extractor, LlmExtractor};
use crate::llm::LlmClient;
use crate::memory::{LongTermMemory, Message};
use crate::observability::events::preview;
use crate::observability::{EngineEvent, EventSink};
use crate::objective::prompt;
use crate::objective::{CompletedTask, PrioritizedTask, PRIORITIZED_TASKS_SHAPE};

/// 周期参数
#[derive(Debug, Clone)]
pub struct ObjectiveSettings {
    /// 首个任务的优先级
    pub initial_priority: f64,
    /// 执行任务时检索的历史条数
    pub context_top_k: usize,
    pub max_new_tasks: usize,
    pub max_prioritized_tasks: usize,
}

impl Default for ObjectiveSettings {
    fn default() -> Self {
        Self {
            initial_priority: 100.0,
            context_top_k: 3,
            max_new_tasks: 5,
            max_prioritized_tasks: 20,
        }
    }
}

/// 把新任务追加到队列，跳过描述与已有任务（含本批已追加的）完全相同的；返回追加数量
pub fn merge_new_tasks(pending: &mut VecDeque<PrioritizedTask>, new_tasks: Vec<PrioritizedTask>) -> usize {
    let mut seen: HashSet<String> = pending.iter().map(|t| t.task.clone()).collect();
    let mut added = 0;
    for task in new_tasks {
        if seen.insert(task.task.clone()) {
            pending.push_back(task);
            added += 1;
        }
    }
    added
}

pub struct TaskQueueEngine<X: Extractor = LlmExtractor> {
    llm: Arc<dyn LlmClient>,
    extractor: X,
    memory: Arc<dyn LongTermMemory>,
    objective: String,
    settings: ObjectiveSettings,
    current_task: Option<PrioritizedTask>,
    pending: VecDeque<PrioritizedTask>,
    completed: Vec<CompletedTask>,
    events: EventSink,
}

impl<X: Extractor> TaskQueueEngine<X> {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        extractor: X,
        memory: Arc<dyn LongTermMemory>,
        objective: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            extractor,
            memory,
            objective: objective.into(),
            settings: ObjectiveSettings::default(),
            current_task: None,
            pending: VecDeque::new(),
            completed: Vec::new(),
            events: EventSink::none(),
        }
    }

    pub fn with_settings(mut self, settings: ObjectiveSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn current_task(&self) -> Option<&PrioritizedTask> {
        self.current_task.as_ref()
    }

    pub fn pending_tasks(&self) -> impl Iterator<Item = &PrioritizedTask> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn completed_tasks(&self) -> &[CompletedTask] {
        &self.completed
    }

    /// 设置首个任务；已有的队列保持不变
    pub fn seed(&mut self, first_task: &str) {
        self.current_task = Some(PrioritizedTask::new(first_task, self.settings.initial_priority));
    }

    async fn ask(&self, purpose: &str, system: String, user: String) -> Result<String, AgentError> {
        self.events.emit(EngineEvent::OracleCallStart {
            purpose: purpose.to_string(),
        });
        let result = self
            .llm
            .complete(&[Message::system(system), Message::user(user)])
            .await;
        self.events.emit(EngineEvent::OracleCallEnd {
            purpose: purpose.to_string(),
            ok: result.is_ok(),
        });
        Ok(result?)
    }

    /// 执行：检索相关历史作为上下文，请求 LLM 完成任务，结果记入台账
    async fn execute(&mut self, task: &PrioritizedTask) -> Result<String, AgentError> {
        let hits = self
            .memory
            .retrieve(&task.task, self.settings.context_top_k)
            .await?;
        let context = if hits.is_empty() {
            tracing::debug!("no context found");
            prompt::NO_CONTEXT.to_string()
        } else {
            hits.join(" ")
        };
        let result = self
            .ask(
                "execute",
                prompt::execution_system(&self.objective, &context),
                prompt::execution_user(&task.task),
            )
            .await?;
        self.completed.push(CompletedTask {
            task: task.task.clone(),
            result: result.clone(),
        });
        Ok(result)
    }

    async fn generate(&self, task: &str, result: &str) -> Result<Vec<PrioritizedTask>, AgentError> {
        let pending: Vec<String> = self.pending.iter().map(|t| t.task.clone()).collect();
        let raw = self
            .ask(
                "generate",
                prompt::creation_system(&self.objective, &pending),
                prompt::creation_user(result, task, self.settings.max_new_tasks),
            )
            .await?;
        let mut tasks: Vec<PrioritizedTask> = self
            .extractor
            .extract(&raw, PRIORITIZED_TASKS_SHAPE)
            .await?;
        tasks.truncate(self.settings.max_new_tasks);
        Ok(tasks)
    }

    /// 重排：模型给出的顺序即新队列，超出上限的部分丢弃
    async fn prioritize(&mut self) -> Result<(), AgentError> {
        let tasks: Vec<PrioritizedTask> = self.pending.iter().cloned().collect();
        let raw = self
            .ask(
                "prioritize",
                prompt::prioritization_system(&self.objective, self.settings.max_prioritized_tasks),
                prompt::prioritization_user(&tasks),
            )
            .await?;
        let mut ordered: Vec<PrioritizedTask> = self
            .extractor
            .extract(&raw, PRIORITIZED_TASKS_SHAPE)
            .await?;
        if ordered.len() > self.settings.max_prioritized_tasks {
            tracing::debug!(
                dropped = ordered.len() - self.settings.max_prioritized_tasks,
                "prioritized list over limit"
            );
            ordered.truncate(self.settings.max_prioritized_tasks);
        }
        self.pending = ordered.into();
        Ok(())
    }

    /// 运行一个完整周期；返回周期结束后是否还有当前任务。没有当前任务时不做任何事。
    pub async fn run_cycle(&mut self) -> Result<bool, AgentError> {
        let Some(task) = self.current_task.clone() else {
            return Ok(false);
        };
        tracing::info!(
            task = %task.task,
            priority = task.priority,
            pending = self.pending.len(),
            completed = self.completed.len(),
            "considering current task"
        );
        self.events.emit(EngineEvent::TaskStarted {
            task: task.task.clone(),
        });

        let result = self.execute(&task).await?;
        tracing::info!(result = %preview(&result), "task completed");
        self.events.emit(EngineEvent::TaskCompleted {
            task: task.task.clone(),
            result_preview: preview(&result),
        });

        let id = self
            .memory
            .save(&format!("Task: {}. Result: {}", task.task, result))
            .await?;
        tracing::debug!(id = %id, "saved task to memory");

        let new_tasks = self.generate(&task.task, &result).await?;
        let generated = new_tasks.len();
        let added = merge_new_tasks(&mut self.pending, new_tasks);
        tracing::info!(generated, added, pending = self.pending.len(), "new tasks generated");
        self.events.emit(EngineEvent::TasksGenerated {
            added,
            pending: self.pending.len(),
        });

        self.prioritize().await?;
        self.events.emit(EngineEvent::QueueReprioritized {
            pending: self.pending.len(),
        });

        self.current_task = self.pending.pop_front();
        match &self.current_task {
            Some(next) => tracing::info!(task = %next.task, priority = next.priority, "next task"),
            None => tracing::info!("task queue is empty"),
        }
        Ok(self.current_task.is_some())
    }

    /// 清空当前任务与待办队列；已完成台账保留
    pub fn clear(&mut self) {
        self.current_task = None;
        self.pending.clear();
    }
}

#[async_trait]
impl<X: Extractor> Executor for TaskQueueEngine<X> {
    type Output = String;

    /// 以 input 为首个任务运行到队列为空，返回最后一个完成任务的结果
    async fn call(&mut self, input: &str) -> Result<String, AgentError> {
        self.seed(input);
        while self.run_cycle().await? {}
        Ok(self
            .completed
            .last()
            .map(|t| t.result.clone())
            .unwrap_or_default())
    }

    fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractionPolicy;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::memory::InMemoryLongTerm;

    fn engine(llm: Arc<ScriptedLlmClient>, memory: Arc<InMemoryLongTerm>) -> TaskQueueEngine {
        let extractor = LlmExtractor::with_policy(
            llm.clone(),
            ExtractionPolicy {
                initial_delay_ms: 0,
                ..ExtractionPolicy::default()
            },
        );
        TaskQueueEngine::new(llm, extractor, memory, "Plan a party")
    }

    #[test]
    fn test_merge_skips_exact_duplicates() {
        let mut pending: VecDeque<PrioritizedTask> =
            vec![PrioritizedTask::new("buy cake", 5.0)].into();
        let added = merge_new_tasks(
            &mut pending,
            vec![
                PrioritizedTask::new("buy cake", 9.0),
                PrioritizedTask::new("Buy cake", 1.0),
                PrioritizedTask::new("send invites", 4.0),
                PrioritizedTask::new("send invites", 2.0),
            ],
        );
        assert_eq!(added, 2);
        let names: Vec<&str> = pending.iter().map(|t| t.task.as_str()).collect();
        assert_eq!(names, vec!["buy cake", "Buy cake", "send invites"]);
        assert_eq!(pending[0].priority, 5.0);
    }

    // 每个周期 5 次 LLM 调用：执行、生成、生成结果抽取、重排、重排结果抽取
    #[tokio::test]
    async fn test_cycle_advances_to_highest_reprioritized_task() {
        let llm = Arc::new(ScriptedLlmClient::new([
            "Found a venue.",
            "1. book venue\n2. order food",
            r#"[{"task": "book venue", "priority": 8}, {"task": "order food", "priority": 6}]"#,
            "order food first, then book venue",
            r#"[{"task": "order food", "priority": 9}, {"task": "book venue", "priority": 8}]"#,
        ]));
        let memory = Arc::new(InMemoryLongTerm::default());
        let mut engine = engine(llm.clone(), memory.clone());
        engine.seed("find a venue");

        assert!(engine.run_cycle().await.unwrap());
        assert_eq!(llm.call_count(), 5);
        assert_eq!(engine.current_task().unwrap().task, "order food");
        assert_eq!(engine.pending_len(), 1);
        assert_eq!(
            engine.completed_tasks(),
            &[CompletedTask {
                task: "find a venue".into(),
                result: "Found a venue.".into()
            }]
        );
        assert_eq!(memory.texts(), vec!["Task: find a venue. Result: Found a venue."]);

        let requests = llm.requests();
        let execute = requests[0].text();
        assert!(execute.contains("Plan a party"));
        assert!(execute.contains(prompt::NO_CONTEXT));
        assert!(execute.contains("Current Task: find a venue."));
        assert!(requests[1].text().contains("Found a venue."));
        assert!(requests[2].text().contains("1. book venue"));
        assert!(requests[3].text().contains("\"book venue\""));
    }

    #[tokio::test]
    async fn test_context_comes_from_memory() {
        let llm = Arc::new(ScriptedLlmClient::new(["ok", "none", "[]", "none", "[]"]));
        let memory = Arc::new(InMemoryLongTerm::default());
        memory.save("Task: find a venue. Result: the old barn").await.unwrap();
        let mut engine = engine(llm.clone(), memory);
        engine.seed("confirm the venue");
        assert!(!engine.run_cycle().await.unwrap());
        assert!(llm.requests()[0].text().contains("the old barn"));
    }

    #[tokio::test]
    async fn test_context_snippets_are_space_joined() {
        let llm = Arc::new(ScriptedLlmClient::new(["ok", "none", "[]", "none", "[]"]));
        let memory = Arc::new(InMemoryLongTerm::default());
        memory.save("venue: old barn").await.unwrap();
        memory.save("venue: town hall").await.unwrap();
        let mut engine = engine(llm.clone(), memory);
        engine.seed("confirm venue");
        engine.run_cycle().await.unwrap();
        assert!(llm.requests()[0]
            .text()
            .contains("venue: old barn venue: town hall"));
    }

    #[tokio::test]
    async fn test_generated_and_prioritized_lists_are_capped() {
        let six: Vec<String> = (0..6)
            .map(|i| format!(r#"{{"task": "t{}", "priority": {}}}"#, i, i))
            .collect();
        let six = format!("[{}]", six.join(","));
        let llm = Arc::new(ScriptedLlmClient::new([
            "done".to_string(),
            "six tasks".to_string(),
            six.clone(),
            "reordered".to_string(),
            six,
        ]));
        let mut engine = engine(llm.clone(), Arc::new(InMemoryLongTerm::default())).with_settings(
            ObjectiveSettings {
                max_prioritized_tasks: 3,
                ..ObjectiveSettings::default()
            },
        );
        engine.seed("start");
        engine.run_cycle().await.unwrap();

        // 重排请求只包含前 5 个新任务
        let prioritize = llm.requests()[3].text();
        assert!(prioritize.contains("\"t4\""));
        assert!(!prioritize.contains("\"t5\""));
        assert_eq!(engine.current_task().unwrap().task, "t0");
        assert_eq!(engine.pending_len(), 2);
    }

    #[tokio::test]
    async fn test_oracle_failure_aborts_run() {
        let llm = Arc::new(ScriptedLlmClient::new(["result"]));
        llm.push_error(LlmError::Network("down".into()));
        let mut engine = engine(llm.clone(), Arc::new(InMemoryLongTerm::default()));
        let err = engine.call("start").await.unwrap_err();
        assert!(matches!(err, AgentError::LlmError(_)));
        assert_eq!(engine.completed_tasks().len(), 1);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_reset_keeps_ledger() {
        let next = r#"[{"task": "next", "priority": 1}]"#;
        let llm = Arc::new(ScriptedLlmClient::new(["r1", "next", next, "next", next]));
        let mut engine = engine(llm, Arc::new(InMemoryLongTerm::default()));
        engine.seed("first");
        assert!(engine.run_cycle().await.unwrap());
        engine.reset();
        assert!(engine.current_task().is_none());
        assert_eq!(engine.pending_len(), 0);
        assert_eq!(engine.completed_tasks().len(), 1);
        assert!(!engine.run_cycle().await.unwrap());
    }
}
