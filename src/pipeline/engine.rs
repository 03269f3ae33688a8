//! 流水线引擎
//!
//! run_chain：按顺序执行链中每一步，后一步使用前一步已解析的 artifact；任一步失败即停止，
//! 已完成步骤对会话的修改保留（不回滚）。
//! run_step：单独执行一个派生步骤，使用会话中的当前 artifact。

use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;

use crate::core::recovery::RecoveryEngine;
use crate::core::{Artifact, ControllerError, SessionStore};
use crate::pipeline::catalog::StepCatalog;
use crate::pipeline::step::{ResultKind, StepContext, StepInput, StepOutput, TaskChainStep};
use crate::remote::{Endpoint, Invoker};
use crate::render::format::{plain_text, task_result};
use crate::render::RenderModel;
use crate::ui::{Presentation, Severity, Slot};

pub struct PipelineEngine {
    catalog: Arc<StepCatalog>,
    invoker: Invoker,
    session: Arc<SessionStore>,
    presentation: Arc<dyn Presentation>,
    /// 任务服务根地址，用于拼接下载链接
    task_base_url: String,
    recovery: RecoveryEngine,
}

impl PipelineEngine {
    pub fn new(
        catalog: Arc<StepCatalog>,
        invoker: Invoker,
        session: Arc<SessionStore>,
        presentation: Arc<dyn Presentation>,
        task_base_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            invoker,
            session,
            presentation,
            task_base_url: task_base_url.into(),
            recovery: RecoveryEngine::new(),
        }
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    /// 执行具名链；返回每个已完成步骤的渲染模型
    pub async fn run_chain(&self, chain: &str, input: &StepInput) -> Result<Vec<RenderModel>, ControllerError> {
        let steps = match self.catalog.chain(chain) {
            Ok(steps) => steps,
            Err(e) => {
                self.surface_error(chain, &e);
                return Err(e);
            }
        };
        tracing::info!(chain, steps = steps.len(), "pipeline chain started");

        let mut carried: Option<Artifact> = None;
        let mut models = Vec::with_capacity(steps.len());
        for step in steps {
            match self.execute_step(&step, carried.clone(), input).await {
                Ok((model, produced)) => {
                    if produced.is_some() {
                        carried = produced;
                    }
                    models.push(model);
                }
                Err(e) => {
                    tracing::warn!(chain, step = step.name, "pipeline chain halted: {}", e);
                    self.surface_error(step.name, &e);
                    return Err(e);
                }
            }
        }
        self.presentation.notify("İşlem tamamlandı", Severity::Success);
        Ok(models)
    }

    /// 单独执行一个步骤
    pub async fn run_step(&self, name: &str, input: &StepInput) -> Result<RenderModel, ControllerError> {
        let result = match self.catalog.step(name) {
            Ok(step) => self.execute_step(&step, None, input).await.map(|(model, _)| model),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::warn!(step = name, "pipeline step failed: {}", e);
            self.surface_error(name, e);
        }
        result
    }

    fn surface_error(&self, step: &str, err: &ControllerError) {
        let recovery = self.recovery.handle(err);
        self.presentation.render(&Slot::Pipeline(step.to_string()), &recovery.model);
        self.presentation.notify(&recovery.notice, recovery.severity);
    }

    /// 执行一步：前置检查 -> 构造全部子调用载荷 -> 顺序调用 -> 更新状态并渲染
    ///
    /// carried 优先于会话中的当前 artifact，保证链内后一步使用前一步的结果。
    async fn execute_step(
        &self,
        step: &TaskChainStep,
        carried: Option<Artifact>,
        input: &StepInput,
    ) -> Result<(RenderModel, Option<Artifact>), ControllerError> {
        let artifact = match carried {
            Some(a) => Some(a),
            None => self.session.current_artifact().await,
        };
        if step.requires_artifact && artifact.is_none() {
            return Err(ControllerError::prerequisite(step.name, "önce bir içerik işlenmeli"));
        }

        let sections = self.session.sections().await;
        let ctx = StepContext {
            step: step.name,
            artifact: artifact.as_ref(),
            input,
            sections: &sections,
        };
        let mut payloads = Vec::with_capacity(step.calls.len());
        for call in &step.calls {
            payloads.push((call.task, (call.build_payload)(&ctx)?));
        }

        let mut last = Value::Null;
        for (task, payload) in payloads {
            tracing::debug!(step = step.name, task, "pipeline sub-call");
            last = self.invoker.call(&Endpoint::task(task), payload).await?;
        }
        let result = last.get("result").cloned().unwrap_or(last);

        let produced = match step.result_kind {
            ResultKind::Artifact => {
                let value = plain_text(&result);
                if value.trim().is_empty() {
                    return Err(ControllerError::Remote(format!("'{}' boş sonuç döndürdü", step.name)));
                }
                let artifact = Artifact::new(step.name, value);
                self.session.set_current_artifact(artifact.clone()).await;
                Some(artifact)
            }
            ResultKind::Terminal => None,
        };

        let model = match step.output {
            StepOutput::Rendered => {
                let model = self.link_documents(task_result(step.title, &result));
                if produced.is_none() && !matches!(model, RenderModel::Document { .. } | RenderModel::NotFound { .. }) {
                    self.session.put_section(step.name, step.title, plain_text(&result)).await;
                }
                model
            }
            StepOutput::Download => match result.as_str().map(str::trim).filter(|p| !p.is_empty()) {
                Some(path) => RenderModel::Document {
                    title: step.title.to_string(),
                    href: self.download_url(path),
                },
                None => RenderModel::not_found(step.title),
            },
            StepOutput::Link => match result.as_str().map(str::trim).filter(|u| !u.is_empty()) {
                Some(url) => RenderModel::Document {
                    title: step.title.to_string(),
                    href: url.to_string(),
                },
                None => RenderModel::not_found(step.title),
            },
        };

        self.presentation.render(&Slot::Pipeline(step.name.to_string()), &model);
        Ok((model, produced))
    }

    /// 服务端相对路径转为 `{task_base_url}/download?file=<path>`
    fn download_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = format!("{}/download", self.task_base_url.trim_end_matches('/'));
        match Url::parse_with_params(&base, &[("file", path)]) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!("Invalid download base '{}': {}", base, e);
                path.to_string()
            }
        }
    }

    fn link_documents(&self, model: RenderModel) -> RenderModel {
        match model {
            RenderModel::Document { title, href } => RenderModel::Document {
                href: self.download_url(&href),
                title,
            },
            other => other,
        }
    }
}
