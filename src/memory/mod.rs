//! 记忆层：对话历史（含 pending 占位）与档案持久化

pub mod conversation;
pub mod persistence;

pub use conversation::{ConversationEntry, ConversationHistory, Speaker};
pub use persistence::{FileProfileStore, MemoryProfileStore, ProfileStore};
