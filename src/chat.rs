//! 对话循环
//!
//! send_message：追加 user 消息与 pending 占位 -> 调用 chat 端点 -> 无论成败都把占位替换为终态消息。
//! 回复中附带的题目 / 学习计划 / 建议会额外渲染到各自的位置。

use std::sync::Arc;

use serde_json::Value;

use crate::core::{ControllerError, SessionStore};
use crate::memory::ConversationEntry;
use crate::operations::requests::{ChatContext, ChatRequest};
use crate::remote::{Endpoint, Invoker};
use crate::render::{format, user_message, RenderModel};
use crate::ui::{Presentation, Severity, Slot};

pub struct ChatLoop {
    invoker: Invoker,
    session: Arc<SessionStore>,
    presentation: Arc<dyn Presentation>,
}

impl ChatLoop {
    pub fn new(invoker: Invoker, session: Arc<SessionStore>, presentation: Arc<dyn Presentation>) -> Self {
        Self {
            invoker,
            session,
            presentation,
        }
    }

    /// 发送一条消息；远程失败不会作为 Err 返回，而是成为一条错误文本的 assistant 消息
    ///
    /// 请求期间若会话被重置，回复被丢弃，新会话的历史不受影响。
    pub async fn send_message(&self, text: &str) -> Result<ConversationEntry, ControllerError> {
        let text = text.trim();
        if text.is_empty() {
            let err = ControllerError::validation("message", "mesaj boş olamaz");
            self.presentation.notify(&user_message(&err), Severity::Warning);
            return Err(err);
        }
        let owner = match self.session.begin_exchange(text).await {
            Ok(session_id) => session_id,
            Err(e) => {
                self.presentation.notify(&user_message(&e), Severity::Warning);
                return Err(e);
            }
        };
        self.publish_history().await;

        let request = ChatRequest {
            message: text.to_string(),
            context: ChatContext {
                profile: self.session.profile().await,
            },
        };
        let outcome = match serde_json::to_value(&request) {
            Ok(payload) => self.invoker.call(&Endpoint::Chat, payload).await,
            Err(e) => Err(ControllerError::validation("message", e.to_string())),
        };

        let reply = match &outcome {
            Ok(body) => ConversationEntry::assistant(
                format::chat_text(body).unwrap_or_else(|| "Yanıt alınamadı.".to_string()),
            ),
            Err(e) => {
                tracing::warn!("chat request failed: {}", e);
                ConversationEntry::assistant(format!("⚠️ {}", user_message(e)))
            }
        };
        if self.session.resolve_pending(&owner, reply.clone()).await.is_none() {
            return Ok(reply);
        }
        self.publish_history().await;

        if let Ok(body) = &outcome {
            self.render_structured(body);
        }
        Ok(reply)
    }

    async fn publish_history(&self) {
        let history = self.session.history().await;
        self.presentation.conversation(&history);
    }

    fn render_structured(&self, body: &Value) {
        if body.get("questions").is_some_and(|q| !q.is_null()) {
            self.presentation.render(&Slot::ChatQuestions, &format::questions(body));
        }
        if body.get("study_plan").is_some_and(|p| !p.is_null()) {
            self.presentation.render(&Slot::ChatStudyPlan, &format::study_plan(body));
        }
        let suggestions: Vec<String> = body
            .get("suggestions")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(format::scalar_text).collect())
            .unwrap_or_default();
        if !suggestions.is_empty() {
            self.presentation.render(
                &Slot::ChatSuggestions,
                &RenderModel::List {
                    title: "Öneriler".to_string(),
                    items: suggestions,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryProfileStore, Speaker};
    use crate::remote::{MockRemote, RemoteFailure};
    use crate::ui::RecordingSurface;
    use serde_json::json;

    fn setup() -> (Arc<MockRemote>, Arc<RecordingSurface>, Arc<SessionStore>, ChatLoop) {
        let mock = Arc::new(MockRemote::new());
        let surface = Arc::new(RecordingSurface::new());
        let session = Arc::new(SessionStore::restore(Arc::new(MemoryProfileStore::new())));
        let chat = ChatLoop::new(Invoker::new(mock.clone()), session.clone(), surface.clone());
        (mock, surface, session, chat)
    }

    #[tokio::test]
    async fn test_empty_message_rejected_without_call() {
        let (mock, _surface, session, chat) = setup();
        let err = chat.send_message("   ").await.unwrap_err();
        assert!(matches!(err, ControllerError::Validation { ref field, .. } if field == "message"));
        assert_eq!(mock.call_count(), 0);
        assert!(session.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_pending_replaced_in_place() {
        let (mock, surface, session, chat) = setup();
        mock.respond("chat", json!({"response": "Merhaba! Nasıl yardımcı olabilirim?"}));
        chat.send_message("Merhaba").await.unwrap();

        let snapshots = surface.conversations();
        let during = &snapshots[0];
        assert_eq!(during.len(), 2);
        assert_eq!(during[0].speaker, Speaker::User);
        assert!(during[1].is_pending);

        let history = session.history().await;
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| !e.is_pending));
        assert_eq!(history[1].speaker, Speaker::Assistant);
        assert_eq!(history[1].text, "Merhaba! Nasıl yardımcı olabilirim?");
        assert_eq!(mock.calls()[0].1["message"], "Merhaba");
        assert_eq!(mock.calls()[0].1["context"]["profile"]["target_exam"], "TYT");
    }

    #[tokio::test]
    async fn test_failure_still_clears_pending() {
        let (mock, _surface, session, chat) = setup();
        mock.fail("chat", RemoteFailure::Transport("connection refused".into()));
        let reply = chat.send_message("Merhaba").await.unwrap();
        assert!(reply.text.starts_with("⚠️"));
        let history = session.history().await;
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| !e.is_pending));
    }

    #[tokio::test]
    async fn test_structured_payloads_forwarded() {
        let (mock, surface, _session, chat) = setup();
        mock.respond(
            "chat",
            json!({
                "response": "İşte sorular",
                "questions": [{"question": "2+2?", "options": ["3", "4"], "correct_answer": "4"}],
                "suggestions": ["Daha fazla soru isteyebilirsin"]
            }),
        );
        chat.send_message("Soru üret").await.unwrap();
        assert!(matches!(surface.last_in(&Slot::ChatQuestions), Some(RenderModel::Questions { .. })));
        assert!(surface.last_in(&Slot::ChatStudyPlan).is_none());
        match surface.last_in(&Slot::ChatSuggestions) {
            Some(RenderModel::List { items, .. }) => assert_eq!(items, vec!["Daha fazla soru isteyebilirsin"]),
            other => panic!("Expected suggestions list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_message_while_pending_is_rejected() {
        let (_mock, _surface, session, chat) = setup();
        session.begin_exchange("ilk").await.unwrap();
        let err = chat.send_message("ikinci").await.unwrap_err();
        assert!(matches!(err, ControllerError::Validation { .. }));
        assert_eq!(session.history().await.len(), 2);
    }
}
