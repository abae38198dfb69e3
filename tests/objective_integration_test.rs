//! 任务队列与结构化抽取集成测试

use std::sync::Arc;

use drone::core::{AgentError, Executor};
use drone::extraction::{ExtractionPolicy, Extractor, LlmExtractor};
use drone::llm::ScriptedLlmClient;
use drone::memory::InMemoryLongTerm;
use drone::objective::{PrioritizedTask, TaskQueueEngine, PRIORITIZED_TASKS_SHAPE};
use drone::observability::{EngineEvent, EventSink};

fn instant_extractor(llm: Arc<ScriptedLlmClient>) -> LlmExtractor {
    LlmExtractor::with_policy(
        llm,
        ExtractionPolicy {
            initial_delay_ms: 0,
            ..ExtractionPolicy::default()
        },
    )
}

#[tokio::test]
async fn test_single_cycle_when_reprioritization_empties_queue() {
    let llm = Arc::new(ScriptedLlmClient::new([
        "The garage has room for 500 balloons.",
        "Next: buy balloons, buy jello",
        r#"[{"task": "buy balloons", "priority": 90}, {"task": "buy jello", "priority": 80}]"#,
        "Nothing else is needed.",
        "[]",
    ]));
    let memory = Arc::new(InMemoryLongTerm::default());
    let mut engine = TaskQueueEngine::new(
        llm.clone(),
        instant_extractor(llm.clone()),
        memory.clone(),
        "X",
    );

    let result = engine.call("find starting point").await.unwrap();
    assert_eq!(result, "The garage has room for 500 balloons.");
    assert_eq!(engine.completed_tasks().len(), 1);
    assert_eq!(engine.completed_tasks()[0].task, "find starting point");
    assert!(engine.current_task().is_none());
    assert_eq!(engine.pending_len(), 0);
    assert_eq!(llm.remaining(), 0);
    assert_eq!(
        memory.texts(),
        vec!["Task: find starting point. Result: The garage has room for 500 balloons."]
    );
}

#[tokio::test]
async fn test_two_cycles_with_dedup_and_events() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let llm = Arc::new(ScriptedLlmClient::new([
        // 周期 1
        "r1",
        "gen",
        r#"[{"task": "a", "priority": 5}, {"task": "b", "priority": 4}]"#,
        "prio",
        r#"[{"task": "a", "priority": 5}, {"task": "b", "priority": 4}]"#,
        // 周期 2：重复生成 b，重排后为空
        "r2",
        "gen",
        r#"[{"task": "b", "priority": 9}, {"task": "c", "priority": 1}]"#,
        "prio",
        "[]",
    ]));
    let mut engine = TaskQueueEngine::new(
        llm.clone(),
        instant_extractor(llm.clone()),
        Arc::new(InMemoryLongTerm::default()),
        "Objective",
    )
    .with_events(EventSink::new(tx));

    assert_eq!(engine.call("start").await.unwrap(), "r2");
    let ledger: Vec<&str> = engine
        .completed_tasks()
        .iter()
        .map(|t| t.task.as_str())
        .collect();
    assert_eq!(ledger, vec!["start", "a"]);

    // 周期 2 的重排请求中 b 只出现一次
    let prioritize = llm.requests()[8].text();
    assert_eq!(prioritize.matches("\"b\"").count(), 1);
    assert!(prioritize.contains("\"c\""));

    let mut added = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if let EngineEvent::TasksGenerated { added: n, .. } = ev {
            added.push(n);
        }
    }
    assert_eq!(added, vec![2, 1]);
}

#[tokio::test]
async fn test_extraction_repaired_once() {
    let llm = Arc::new(ScriptedLlmClient::new([
        r#"[{"task": "a", "priority": 1},]"#,
        r#"[{"task": "a", "priority": 1}]"#,
    ]));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let extractor = instant_extractor(llm.clone()).with_events(EventSink::new(tx));

    let tasks: Vec<PrioritizedTask> = extractor
        .extract("1. a", PRIORITIZED_TASKS_SHAPE)
        .await
        .unwrap();
    assert_eq!(tasks, vec![PrioritizedTask::new("a", 1.0)]);

    let mut repairs = 0;
    while let Ok(ev) = rx.try_recv() {
        if matches!(ev, EngineEvent::ExtractionRepair { .. }) {
            repairs += 1;
        }
    }
    assert_eq!(repairs, 1);
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn test_extraction_failure_aborts_objective() {
    let llm = Arc::new(ScriptedLlmClient::new([
        "result",
        "gen",
        "not json",
        "still not json",
        "nope",
        "never",
    ]));
    let mut engine = TaskQueueEngine::new(
        llm.clone(),
        instant_extractor(llm.clone()),
        Arc::new(InMemoryLongTerm::default()),
        "Objective",
    );
    let err = engine.call("start").await.unwrap_err();
    assert!(matches!(err, AgentError::ExtractionFailed { attempts: 4, .. }));
    assert_eq!(engine.completed_tasks().len(), 1);
}
