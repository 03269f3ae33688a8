//! 会话状态存储
//!
//! 持有唯一的 SessionState，所有读写都在一次加锁内完成，绝不跨越远程调用持锁。
//! 档案修改会立即整体写入 ProfileStore；restore / reset 显式管理生命周期。

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::core::state::{
    Artifact, CurriculumTree, Profile, ProfilePatch, ResultSection, SessionState,
};
use crate::core::ControllerError;
use crate::memory::{ConversationEntry, ProfileStore};

pub struct SessionStore {
    state: RwLock<SessionState>,
    profiles: Arc<dyn ProfileStore>,
}

impl SessionStore {
    /// 创建会话：有持久化档案则恢复，否则使用默认档案
    pub fn restore(profiles: Arc<dyn ProfileStore>) -> Self {
        let profile = match profiles.read_profile() {
            Ok(Some(profile)) => {
                tracing::info!("Restored profile (target exam {})", profile.target_exam);
                profile
            }
            Ok(None) => Profile::default(),
            Err(e) => {
                tracing::warn!("Profile load failed ({}), using defaults", e);
                Profile::default()
            }
        };
        Self {
            state: RwLock::new(SessionState::new(profile)),
            profiles,
        }
    }

    pub async fn session_id(&self) -> String {
        self.state.read().await.session_id.clone()
    }

    pub async fn profile(&self) -> Profile {
        self.state.read().await.profile.clone()
    }

    /// 合并 patch 并立即持久化完整档案；写入失败时内存中的档案保持不变
    pub async fn set_profile(&self, patch: &ProfilePatch) -> anyhow::Result<Profile> {
        let mut state = self.state.write().await;
        let next = state.profile.merged(patch);
        self.profiles.write_profile(&next)?;
        state.profile = next.clone();
        tracing::debug!(target_exam = %next.target_exam, daily_hours = next.daily_hours.get(), "profile updated");
        Ok(next)
    }

    pub async fn history(&self) -> Vec<ConversationEntry> {
        self.state.read().await.history.entries().to_vec()
    }

    pub async fn append_conversation(&self, entry: ConversationEntry) -> Result<usize, ControllerError> {
        self.state.write().await.history.push(entry)
    }

    /// 追加 user 消息与 pending 占位（同一次加锁内完成），返回发起该轮对话的会话 id
    pub async fn begin_exchange(&self, text: &str) -> Result<String, ControllerError> {
        let mut state = self.state.write().await;
        state.history.begin_exchange(text)?;
        Ok(state.session_id.clone())
    }

    pub async fn remove_pending(&self) -> Option<usize> {
        self.state.write().await.history.remove_pending()
    }

    /// 用终态消息替换 pending；会话在此期间被重置过（id 变化）或已无 pending 时丢弃，返回 None
    pub async fn resolve_pending(&self, session_id: &str, entry: ConversationEntry) -> Option<usize> {
        let mut state = self.state.write().await;
        if state.session_id != session_id {
            tracing::info!(stale = session_id, current = %state.session_id, "dropping reply from a reset session");
            return None;
        }
        state.history.resolve_pending(entry)
    }

    pub async fn current_artifact(&self) -> Option<Artifact> {
        self.state.read().await.current_artifact.clone()
    }

    /// 整体替换，不做合并；较晚完成的调用总会覆盖
    pub async fn set_current_artifact(&self, artifact: Artifact) {
        tracing::info!(step = %artifact.step, chars = artifact.value.chars().count(), "current artifact replaced");
        self.state.write().await.current_artifact = Some(artifact);
    }

    pub async fn curriculum(&self) -> Option<CurriculumTree> {
        self.state.read().await.curriculum.clone()
    }

    /// 仅在缓存为空时写入，返回是否写入
    pub async fn set_curriculum(&self, tree: CurriculumTree) -> bool {
        let mut state = self.state.write().await;
        if state.curriculum.is_some() {
            return false;
        }
        state.curriculum = Some(tree);
        true
    }

    pub async fn sections(&self) -> Vec<ResultSection> {
        self.state.read().await.sections.clone()
    }

    pub async fn put_section(&self, step: &str, title: &str, body: String) {
        self.state.write().await.put_section(ResultSection {
            step: step.to_string(),
            title: title.to_string(),
            body,
            produced_at: Utc::now(),
        });
    }

    /// 切换科目展开状态，返回切换后的值
    pub async fn toggle_subject(&self, subject: &str) -> bool {
        let mut state = self.state.write().await;
        if state.expanded_subjects.remove(subject) {
            false
        } else {
            state.expanded_subjects.insert(subject.to_string());
            true
        }
    }

    pub async fn is_expanded(&self, subject: &str) -> bool {
        self.state.read().await.expanded_subjects.contains(subject)
    }

    /// 显式重置：清空对话、课程缓存、artifact 与派生结果；持久化档案保留
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let profile = state.profile.clone();
        *state = SessionState::new(profile);
        tracing::info!(session_id = %state.session_id, "session reset");
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }
}
