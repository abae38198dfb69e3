//! 任务队列各阶段的提示词

use crate::objective::PrioritizedTask;

/// 检索不到相关历史时的上下文
pub const NO_CONTEXT: &str = "No relevant previous tasks found.";

pub fn execution_system(objective: &str, context: &str) -> String {
    format!(
        "You are an AI who performs one task based on the following objective: {}.\n\
         If you cannot complete the task, that's ok. Instead just imagine a plausible outcome for the task and return that.\n\
         Take into account these previously completed tasks:\n{}",
        objective, context
    )
}

pub fn execution_user(task: &str) -> String {
    format!("Current Task: {}.", task)
}

pub fn creation_system(objective: &str, pending: &[String]) -> String {
    let pending = serde_json::to_string_pretty(pending).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are a task creation AI that uses the result of an execution agent to create new tasks with the following objective: {}.\n\
         These are incomplete tasks:\n{}.",
        objective, pending
    )
}

pub fn creation_user(result: &str, task: &str, max_new_tasks: usize) -> String {
    format!(
        "The last completed task has the result: {}.\n\
         This result was based on this task description: {}.\n\
         Generate new tasks based on the result. Limit your output to {} tasks.",
        result, task, max_new_tasks
    )
}

pub fn prioritization_system(objective: &str, max_tasks: usize) -> String {
    format!(
        "Objective: {}.\n\
         Prioritize the tasks based on their priority values and likelihood of helping in achieving the objective.\n\
         Sort the tasks in descending order of priority. Limit your output to {} tasks.",
        objective, max_tasks
    )
}

pub fn prioritization_user(tasks: &[PrioritizedTask]) -> String {
    let tasks = serde_json::to_string_pretty(tasks).unwrap_or_else(|_| "[]".to_string());
    format!("Prioritize tasks: {}", tasks)
}
