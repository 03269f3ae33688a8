//! 控制器构建器：统一组装会话、远程服务、操作注册表、流水线与各协作组件
//!
//! 命令行入口与集成测试共用同一套组装逻辑，只替换远程服务、档案存储与展示层。

use std::sync::Arc;

use crate::chat::ChatLoop;
use crate::config::AppConfig;
use crate::core::{Controller, SessionStore};
use crate::curriculum::{CurriculumBrowser, CurriculumSource, RemoteCurriculum};
use crate::memory::{FileProfileStore, ProfileStore};
use crate::operations::{builtin_registry, Dispatcher};
use crate::pipeline::{PipelineEngine, StepCatalog};
use crate::remote::{HttpRemote, Invoker, RemoteService};
use crate::ui::Presentation;

pub struct ControllerBuilder {
    config: AppConfig,
    remote: Option<Arc<dyn RemoteService>>,
    profiles: Option<Arc<dyn ProfileStore>>,
    curriculum: Option<Arc<dyn CurriculumSource>>,
}

impl ControllerBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            remote: None,
            profiles: None,
            curriculum: None,
        }
    }

    /// 替换远程服务（默认按配置创建 HttpRemote）
    pub fn with_remote(mut self, remote: Arc<dyn RemoteService>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// 替换档案存储（默认是 state_dir 下的 profile.json）
    pub fn with_profile_store(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_curriculum_source(mut self, source: Arc<dyn CurriculumSource>) -> Self {
        self.curriculum = Some(source);
        self
    }

    /// 未注入远程服务时按配置创建 HttpRemote；HTTP 客户端初始化失败时返回错误
    pub fn invoker(&self) -> anyhow::Result<Invoker> {
        let remote: Arc<dyn RemoteService> = match &self.remote {
            Some(remote) => remote.clone(),
            None => Arc::new(HttpRemote::new(
                &self.config.remote.api_base_url,
                &self.config.remote.task_base_url,
                self.config.remote.timeout_secs,
            )?),
        };
        Ok(Invoker::new(remote))
    }

    pub fn build(self, presentation: Arc<dyn Presentation>) -> anyhow::Result<Controller> {
        let invoker = self.invoker()?;
        let profiles = self
            .profiles
            .unwrap_or_else(|| Arc::new(FileProfileStore::new(self.config.app.profile_path())));
        let session = Arc::new(SessionStore::restore(profiles));
        let curriculum_source = self
            .curriculum
            .unwrap_or_else(|| Arc::new(RemoteCurriculum::new(invoker.clone())));

        let dispatcher = Dispatcher::new(
            Arc::new(builtin_registry(&self.config.defaults)),
            invoker.clone(),
            session.clone(),
            presentation.clone(),
        );
        let pipeline = PipelineEngine::new(
            Arc::new(StepCatalog::standard()),
            invoker.clone(),
            session.clone(),
            presentation.clone(),
            self.config.remote.task_base_url.clone(),
        );
        let chat = ChatLoop::new(invoker, session.clone(), presentation.clone());
        let curriculum = CurriculumBrowser::new(curriculum_source, session.clone(), presentation.clone());

        Ok(Controller::new(dispatcher, pipeline, chat, curriculum, session, presentation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryProfileStore;
    use crate::remote::MockRemote;
    use crate::ui::RecordingSurface;

    #[tokio::test]
    async fn test_build_with_injected_collaborators() {
        let controller = ControllerBuilder::new(AppConfig::default())
            .with_remote(Arc::new(MockRemote::new()))
            .with_profile_store(Arc::new(MemoryProfileStore::new()))
            .build(Arc::new(RecordingSurface::new()))
            .unwrap();
        assert_eq!(controller.dispatcher().registry().operations().len(), 6);
        assert!(controller.session().current_artifact().await.is_none());
    }

    #[test]
    fn test_default_remote_is_http_client_from_config() {
        let builder = ControllerBuilder::new(AppConfig::default());
        assert!(builder.invoker().is_ok());
    }
}
