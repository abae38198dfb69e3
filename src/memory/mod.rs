//! 记忆层：短期（对话交互）、长期（检索 / 写入）、token 估算

pub mod conversation;
pub mod long_term;
pub mod retrieval;
pub mod token_budget;

pub use conversation::{ConversationMemory, Interaction, Message, Role};
pub use long_term::{InMemoryLongTerm, LongTermMemory, NoopLongTerm};
pub use retrieval::RetrievalApiMemory;
pub use token_budget::TokenEstimator;
