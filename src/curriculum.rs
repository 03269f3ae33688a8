//! 课程浏览
//!
//! 课程树只在首次需要时加载一次并缓存在会话中；科目可展开/折叠；
//! 选中主题时把科目与主题预填到出题表单（科目按模糊规则匹配到表单选项）。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::recovery::RecoveryEngine;
use crate::core::{ControllerError, CurriculumTree, SessionStore};
use crate::operations::{FormInputs, SUBJECTS};
use crate::remote::{Endpoint, Invoker};
use crate::render::RenderModel;
use crate::ui::{Presentation, Severity, Slot};

/// 课程树来源
#[async_trait]
pub trait CurriculumSource: Send + Sync {
    async fn fetch_tree(&self) -> Result<CurriculumTree, ControllerError>;
}

/// 通过 `GET /curriculum` 获取
pub struct RemoteCurriculum {
    invoker: Invoker,
}

impl RemoteCurriculum {
    pub fn new(invoker: Invoker) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl CurriculumSource for RemoteCurriculum {
    async fn fetch_tree(&self) -> Result<CurriculumTree, ControllerError> {
        let body = self.invoker.call(&Endpoint::Curriculum, Value::Null).await?;
        Ok(parse_curriculum(&body))
    }
}

fn topic_title(item: &Value) -> Option<String> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => ["title", "name", "topic"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn topic_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(topic_title).collect(),
        Value::Object(obj) => {
            if let Some(Value::Object(grades)) = obj.get("grades") {
                grades.values().flat_map(topic_list).collect()
            } else if let Some(topics) = obj.get("topics") {
                topic_list(topics)
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

/// 科目 -> 主题列表；接受 `{curriculum: {...}}`、`{data: {...}}` 或直接的映射，形状不符时返回空树
pub fn parse_curriculum(body: &Value) -> CurriculumTree {
    let root = body
        .get("curriculum")
        .or_else(|| body.get("data"))
        .unwrap_or(body);
    root.as_object()
        .map(|subjects| {
            subjects
                .iter()
                .map(|(subject, topics)| (subject.clone(), topic_list(topics)))
                .collect()
        })
        .unwrap_or_default()
}

/// 小写、去掉土耳其语变音符号、空白转下划线
fn normalize_subject(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            'ç' | 'Ç' => 'c',
            'ğ' | 'Ğ' => 'g',
            'ı' | 'I' | 'İ' => 'i',
            'ö' | 'Ö' => 'o',
            'ş' | 'Ş' => 's',
            'ü' | 'Ü' => 'u',
            c if c.is_whitespace() || c == '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// 把课程科目名匹配到表单选项：先精确匹配，再看选项是否包含于科目名，最后看科目名是否包含于选项
pub fn match_subject_option(subject: &str, options: &[&'static str]) -> Option<&'static str> {
    let wanted = normalize_subject(subject);
    if wanted.is_empty() {
        return None;
    }
    let normalized: Vec<(String, &'static str)> =
        options.iter().map(|o| (normalize_subject(o), *o)).collect();
    normalized
        .iter()
        .find(|(n, _)| *n == wanted)
        .or_else(|| normalized.iter().find(|(n, _)| wanted.contains(n.as_str())))
        .or_else(|| normalized.iter().find(|(n, _)| n.contains(wanted.as_str())))
        .map(|(_, o)| *o)
}

pub struct CurriculumBrowser {
    source: Arc<dyn CurriculumSource>,
    session: Arc<SessionStore>,
    presentation: Arc<dyn Presentation>,
    recovery: RecoveryEngine,
}

impl CurriculumBrowser {
    pub fn new(
        source: Arc<dyn CurriculumSource>,
        session: Arc<SessionStore>,
        presentation: Arc<dyn Presentation>,
    ) -> Self {
        Self {
            source,
            session,
            presentation,
            recovery: RecoveryEngine::new(),
        }
    }

    fn fail(&self, err: ControllerError) -> ControllerError {
        let recovery = self.recovery.handle(&err);
        self.presentation.render(&Slot::Curriculum, &recovery.model);
        self.presentation.notify(&recovery.notice, recovery.severity);
        err
    }

    async fn load(&self) -> Result<CurriculumTree, ControllerError> {
        if let Some(tree) = self.session.curriculum().await {
            return Ok(tree);
        }
        let tree = self.source.fetch_tree().await?;
        if self.session.set_curriculum(tree.clone()).await {
            tracing::info!(subjects = tree.len(), "curriculum loaded");
        }
        // 并发加载时以先写入者为准
        Ok(self.session.curriculum().await.unwrap_or(tree))
    }

    /// 首次调用时加载并缓存，之后直接使用缓存；渲染科目列表
    pub async fn ensure_loaded(&self) -> Result<CurriculumTree, ControllerError> {
        let tree = self.load().await.map_err(|e| self.fail(e))?;
        let mut items = Vec::with_capacity(tree.len());
        for (subject, topics) in &tree {
            let marker = if self.session.is_expanded(subject).await { "▾" } else { "▸" };
            items.push(format!("{marker} {subject} ({} konu)", topics.len()));
        }
        let model = if items.is_empty() {
            RenderModel::not_found("Müfredat")
        } else {
            RenderModel::List {
                title: "Müfredat".to_string(),
                items,
            }
        };
        self.presentation.render(&Slot::Curriculum, &model);
        Ok(tree)
    }

    /// 切换科目的展开状态，返回切换后的值；展开时渲染主题列表
    pub async fn toggle_subject(&self, subject: &str) -> Result<bool, ControllerError> {
        let tree = self.load().await.map_err(|e| self.fail(e))?;
        let Some(topics) = tree.get(subject) else {
            return Err(self.fail(ControllerError::validation("subject", format!("müfredatta yok: {subject}"))));
        };
        let expanded = self.session.toggle_subject(subject).await;
        if expanded {
            let model = if topics.is_empty() {
                RenderModel::not_found(subject)
            } else {
                RenderModel::List {
                    title: subject.to_string(),
                    items: topics.clone(),
                }
            };
            self.presentation.render(&Slot::Curriculum, &model);
        } else {
            self.ensure_loaded().await?;
        }
        Ok(expanded)
    }

    /// 选中主题：预填出题表单；科目无法匹配时只预填主题
    pub fn select_topic(&self, subject: &str, topic: &str) -> FormInputs {
        let mut inputs = FormInputs::new().with("topic", topic.trim());
        match match_subject_option(subject, SUBJECTS) {
            Some(option) => inputs.set("subject", option),
            None => tracing::debug!(subject, "no form option matches curriculum subject"),
        }
        self.presentation.prefill("generate-questions", &inputs);
        self.presentation
            .notify(&format!("Konu seçildi: {}", topic.trim()), Severity::Info);
        inputs
    }
}
