//! 对话历史
//!
//! 插入顺序即显示顺序，从不重排。至多存在一条 pending 占位消息，且总是最新一条；
//! 请求结束时占位被移除，并在同一位置替换为终态消息。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ControllerError;

/// 消息发送方
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// 单条对话消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub text: String,
    pub is_pending: bool,
    pub at: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            is_pending: false,
            at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            is_pending: false,
            at: Utc::now(),
        }
    }

    /// 请求进行中的占位消息
    pub fn pending() -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: "Yanıt hazırlanıyor...".to_string(),
            is_pending: true,
            at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConversationHistory {
    entries: Vec<ConversationEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条消息；已有 pending 时拒绝，保证 pending 始终是最后一条
    pub fn push(&mut self, entry: ConversationEntry) -> Result<usize, ControllerError> {
        if self.pending_index().is_some() {
            return Err(ControllerError::validation(
                "message",
                "önceki mesajın yanıtı henüz gelmedi",
            ));
        }
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    /// 原子地追加 user 消息与其后的 pending 占位
    pub fn begin_exchange(&mut self, text: impl Into<String>) -> Result<usize, ControllerError> {
        self.push(ConversationEntry::user(text))?;
        self.push(ConversationEntry::pending())
    }

    pub fn pending_index(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.is_pending)
    }

    pub fn remove_pending(&mut self) -> Option<usize> {
        let idx = self.pending_index()?;
        self.entries.remove(idx);
        Some(idx)
    }

    /// 移除 pending 并把终态消息放在它原来的位置；没有 pending 时丢弃该消息，返回 None
    pub fn resolve_pending(&mut self, entry: ConversationEntry) -> Option<usize> {
        let idx = self.remove_pending()?;
        self.entries.insert(idx, entry);
        Some(idx)
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_exchange_appends_user_then_pending() {
        let mut history = ConversationHistory::new();
        let idx = history.begin_exchange("Merhaba").unwrap();
        assert_eq!(idx, 1);
        let entries = history.entries();
        assert_eq!(entries[0].speaker, Speaker::User);
        assert!(!entries[0].is_pending);
        assert!(entries[1].is_pending);
    }

    #[test]
    fn test_second_exchange_rejected_while_pending() {
        let mut history = ConversationHistory::new();
        history.begin_exchange("bir").unwrap();
        let err = history.begin_exchange("iki").unwrap_err();
        assert!(matches!(err, ControllerError::Validation { .. }));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_resolve_replaces_in_place() {
        let mut history = ConversationHistory::new();
        history.push(ConversationEntry::user("önceki")).unwrap();
        history.push(ConversationEntry::assistant("cevap")).unwrap();
        let pending_at = history.begin_exchange("yeni").unwrap();
        let idx = history.resolve_pending(ConversationEntry::assistant("tamam"));
        assert_eq!(idx, Some(pending_at));
        assert_eq!(history.len(), 4);
        assert!(history.pending_index().is_none());
        assert_eq!(history.entries()[3].text, "tamam");
    }

    #[test]
    fn test_remove_pending_without_pending_is_noop() {
        let mut history = ConversationHistory::new();
        history.push(ConversationEntry::user("x")).unwrap();
        assert_eq!(history.remove_pending(), None);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_resolve_without_pending_drops_entry() {
        let mut history = ConversationHistory::new();
        history.push(ConversationEntry::user("x")).unwrap();
        assert_eq!(history.resolve_pending(ConversationEntry::assistant("geç yanıt")), None);
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].speaker, Speaker::User);
    }
}
