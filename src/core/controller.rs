//! 主控循环
//!
//! 界面通过 mpsc 通道发送 UiEvent；单个任务用 select! 同时等待新事件与进行中的处理 future
//! （FuturesUnordered），因此多个远程调用可以交错完成，但状态修改总在同一任务中串行发生。

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chat::ChatLoop;
use crate::core::state::{Profile, ProfilePatch};
use crate::core::{ControllerError, SessionStore};
use crate::curriculum::CurriculumBrowser;
use crate::operations::{Dispatcher, FormInputs};
use crate::pipeline::{PipelineEngine, StepInput, ACQUISITION_CHAIN};
use crate::render::RenderModel;
use crate::ui::{Presentation, Severity, Slot};

/// 界面发往核心的事件
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    Execute { operation: String, inputs: FormInputs },
    /// 运行获取链（下载 -> 转写）
    Acquire { url: String },
    RunStep { step: String, input: StepInput },
    SendMessage(String),
    UpdateProfile(ProfilePatch),
    LoadCurriculum,
    ToggleSubject(String),
    SelectTopic { subject: String, topic: String },
    Describe(String),
    /// 列出可用操作与步骤
    Catalog,
    Reset,
    Quit,
}

type Pending<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

pub struct Controller {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) pipeline: PipelineEngine,
    pub(crate) chat: ChatLoop,
    pub(crate) curriculum: CurriculumBrowser,
    pub(crate) session: Arc<SessionStore>,
    pub(crate) presentation: Arc<dyn Presentation>,
}

fn profile_model(profile: &Profile) -> RenderModel {
    let join = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "-".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    RenderModel::Table {
        title: "Profil".to_string(),
        columns: vec!["Alan".into(), "Değer".into()],
        rows: vec![
            vec!["student_id".into(), profile.student_id.clone().unwrap_or_else(|| "-".into())],
            vec!["target_exam".into(), profile.target_exam.to_string()],
            vec!["daily_hours".into(), profile.daily_hours.to_string()],
            vec!["weak_subjects".into(), join(&profile.weak_subjects)],
            vec!["strong_subjects".into(), join(&profile.strong_subjects)],
        ],
    }
}

impl Controller {
    pub fn new(
        dispatcher: Dispatcher,
        pipeline: PipelineEngine,
        chat: ChatLoop,
        curriculum: CurriculumBrowser,
        session: Arc<SessionStore>,
        presentation: Arc<dyn Presentation>,
    ) -> Self {
        Self {
            dispatcher,
            pipeline,
            chat,
            curriculum,
            session,
            presentation,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn pipeline(&self) -> &PipelineEngine {
        &self.pipeline
    }

    pub fn chat(&self) -> &ChatLoop {
        &self.chat
    }

    pub fn curriculum(&self) -> &CurriculumBrowser {
        &self.curriculum
    }

    /// 处理单个事件；错误已在各组件边界渲染，这里只返回给调用方
    pub async fn handle(&self, event: UiEvent) -> Result<(), ControllerError> {
        match event {
            UiEvent::Execute { operation, inputs } => {
                self.dispatcher.execute(&operation, &inputs).await.map(|_| ())
            }
            UiEvent::Acquire { url } => self
                .pipeline
                .run_chain(ACQUISITION_CHAIN, &StepInput::text(url))
                .await
                .map(|_| ()),
            UiEvent::RunStep { step, input } => self.pipeline.run_step(&step, &input).await.map(|_| ()),
            UiEvent::SendMessage(text) => self.chat.send_message(&text).await.map(|_| ()),
            UiEvent::UpdateProfile(patch) => {
                self.update_profile(&patch).await;
                Ok(())
            }
            UiEvent::LoadCurriculum => self.curriculum.ensure_loaded().await.map(|_| ()),
            UiEvent::ToggleSubject(subject) => self.curriculum.toggle_subject(&subject).await.map(|_| ()),
            UiEvent::SelectTopic { subject, topic } => {
                self.curriculum.select_topic(&subject, &topic);
                Ok(())
            }
            UiEvent::Describe(operation) => self.dispatcher.describe(&operation).map(|_| ()).map_err(|e| {
                self.dispatcher.notify(&crate::render::user_message(&e), Severity::Warning);
                e
            }),
            UiEvent::Catalog => {
                self.presentation.render(&Slot::Catalog, &self.dispatcher.list());
                let steps = RenderModel::List {
                    title: "Adımlar".to_string(),
                    items: self
                        .pipeline
                        .catalog()
                        .steps()
                        .into_iter()
                        .map(|(name, title)| format!("{name}: {title}"))
                        .collect(),
                };
                self.presentation.render(&Slot::Catalog, &steps);
                Ok(())
            }
            UiEvent::Reset => {
                self.session.reset().await;
                self.presentation.conversation(&[]);
                self.presentation.notify("Oturum sıfırlandı", Severity::Info);
                Ok(())
            }
            UiEvent::Quit => Ok(()),
        }
    }

    async fn update_profile(&self, patch: &ProfilePatch) {
        if patch.is_empty() {
            self.presentation
                .render(&Slot::Profile, &profile_model(&self.session.profile().await));
            return;
        }
        match self.session.set_profile(patch).await {
            Ok(profile) => {
                self.presentation.render(&Slot::Profile, &profile_model(&profile));
                self.presentation.notify("Profil kaydedildi", Severity::Success);
            }
            Err(e) => {
                tracing::error!("Profile save failed: {:#}", e);
                self.presentation
                    .notify(&format!("Profil kaydedilemedi: {e}"), Severity::Error);
            }
        }
    }

    /// 事件循环：直到收到 Quit、通道关闭或取消信号
    ///
    /// 处理中的事件在同一任务内并发推进；Quit 时尚未完成的处理被丢弃。
    pub async fn run(&self, mut events: mpsc::Receiver<UiEvent>, cancel: CancellationToken) {
        let mut in_flight: FuturesUnordered<Pending<'_>> = FuturesUnordered::new();
        let session_id = self.session.session_id().await;
        tracing::info!(session_id = %session_id, "controller loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(UiEvent::Quit) => {
                        cancel.cancel();
                        break;
                    }
                    Some(event) => {
                        tracing::debug!(?event, "ui event");
                        in_flight.push(Box::pin(async move {
                            if let Err(e) = self.handle(event).await {
                                tracing::debug!(kind = ?e.kind(), "event finished with error: {}", e);
                            }
                        }));
                    }
                    None => {
                        // 输入端关闭：等待进行中的处理完成后退出
                        while in_flight.next().await.is_some() {}
                        break;
                    }
                },
                Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
            }
        }
        tracing::info!(pending = in_flight.len(), "controller loop stopped");
    }
}
