//! 目标驱动的任务队列：执行、记忆、生成、去重、重排

pub mod engine;
pub mod prompt;
pub mod types;

pub use engine::{merge_new_tasks, ObjectiveSettings, TaskQueueEngine};
pub use types::{CompletedTask, PrioritizedTask, PRIORITIZED_TASKS_SHAPE};
