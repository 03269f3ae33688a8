//! 步骤目录：启动时定义，之后只读

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::core::ControllerError;
use crate::pipeline::step::{
    ResultKind, StepContext, StepOutput, SubCall, TaskChainStep,
};

/// 获取链：下载 -> 转写
pub const ACQUISITION_CHAIN: &str = "acquisition";

/// related-passages 的检索条数
const SIMILAR_TOP_K: u64 = 5;

fn download_payload(ctx: &StepContext) -> Result<Value, ControllerError> {
    let url = ctx.input.required("url")?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ControllerError::validation("url", "http:// veya https:// ile başlamalı"));
    }
    Ok(json!({ "url": url }))
}

fn transcribe_payload(ctx: &StepContext) -> Result<Value, ControllerError> {
    Ok(json!({ "audio_path": ctx.artifact_text()? }))
}

fn similar_payload(ctx: &StepContext) -> Result<Value, ControllerError> {
    Ok(json!({ "query": ctx.input.required("query")?, "top_k": SIMILAR_TOP_K }))
}

/// 当前 artifact 作为 "Transkript" 段落在前，其后是已保存的派生结果段落
fn export_payload(ctx: &StepContext) -> Result<Value, ControllerError> {
    let mut sections = Vec::new();
    if let Some(artifact) = ctx.artifact {
        sections.push(json!({ "title": "Transkript", "content": artifact.value }));
    }
    sections.extend(
        ctx.sections
            .iter()
            .map(|s| json!({ "title": s.title, "content": s.body })),
    );
    if sections.is_empty() {
        return Err(ControllerError::prerequisite(
            ctx.step,
            "dışa aktarılacak içerik yok",
        ));
    }
    Ok(json!({ "sections": sections }))
}

pub struct StepCatalog {
    steps: HashMap<&'static str, Arc<TaskChainStep>>,
    chains: HashMap<&'static str, Vec<&'static str>>,
}

impl StepCatalog {
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
            chains: HashMap::new(),
        }
    }

    pub fn register(&mut self, step: TaskChainStep) {
        if self.steps.insert(step.name, Arc::new(step)).is_some() {
            tracing::warn!("Pipeline step replaced during catalog construction");
        }
    }

    pub fn register_chain(&mut self, name: &'static str, steps: Vec<&'static str>) {
        self.chains.insert(name, steps);
    }

    /// 标准目录：获取链与全部派生分析步骤
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog.register(TaskChainStep {
            name: "retrieve",
            title: "Kaynak İndirme",
            requires_artifact: false,
            calls: vec![SubCall {
                task: "download",
                build_payload: download_payload,
            }],
            result_kind: ResultKind::Artifact,
            output: StepOutput::Rendered,
        });
        catalog.register(TaskChainStep {
            name: "transcribe",
            title: "Transkript",
            requires_artifact: true,
            calls: vec![SubCall {
                task: "transcribe",
                build_payload: transcribe_payload,
            }],
            result_kind: ResultKind::Artifact,
            output: StepOutput::Rendered,
        });

        for (name, title, task) in [
            ("summarize", "Özet", "summarize"),
            ("word-cloud", "Kelime Bulutu", "worldcloud"),
            ("study-plan", "Çalışma Planı", "studyplan"),
            ("mind-map", "Zihin Haritası", "mindmap"),
            ("quiz", "Quiz", "quiz"),
            ("flashcards", "Bilgi Kartları", "flashcards"),
            ("concepts", "Kavramlar", "concepts"),
            ("recommend-resources", "Kaynak Önerileri", "recommend_resources"),
            ("simulate-exam", "Deneme Sınavı", "simulate_exam"),
            ("critical-sentences", "Kritik Cümleler", "critical_sentences"),
            ("group-questions", "Soru Grupları", "group_questions"),
            ("concept-quiz", "Kavram Quizi", "concept_quiz"),
        ] {
            catalog.register(TaskChainStep::derived(name, title, task));
        }
        catalog.register(
            TaskChainStep::derived("share-link", "Paylaşım Bağlantısı", "share_link")
                .with_output(StepOutput::Link),
        );

        catalog.register(TaskChainStep {
            name: "related-passages",
            title: "İlgili Bölümler",
            requires_artifact: true,
            calls: vec![
                SubCall {
                    task: "build_vector_store",
                    build_payload: crate::pipeline::step::text_payload,
                },
                SubCall {
                    task: "search_similar",
                    build_payload: similar_payload,
                },
            ],
            result_kind: ResultKind::Terminal,
            output: StepOutput::Rendered,
        });
        catalog.register(TaskChainStep {
            name: "export",
            title: "PDF Raporu",
            requires_artifact: false,
            calls: vec![SubCall {
                task: "export_pdf",
                build_payload: export_payload,
            }],
            result_kind: ResultKind::Terminal,
            output: StepOutput::Download,
        });

        catalog.register_chain(ACQUISITION_CHAIN, vec!["retrieve", "transcribe"]);
        catalog
    }

    pub fn step(&self, name: &str) -> Result<Arc<TaskChainStep>, ControllerError> {
        self.steps
            .get(name)
            .cloned()
            .ok_or_else(|| ControllerError::UnknownOperation(name.to_string()))
    }

    pub fn chain(&self, name: &str) -> Result<Vec<Arc<TaskChainStep>>, ControllerError> {
        let names = self
            .chains
            .get(name)
            .ok_or_else(|| ControllerError::UnknownOperation(name.to_string()))?;
        names.iter().map(|n| self.step(n)).collect()
    }

    /// 按名称排序的 (name, title)
    pub fn steps(&self) -> Vec<(&'static str, &'static str)> {
        let mut steps: Vec<_> = self.steps.values().map(|s| (s.name, s.title)).collect();
        steps.sort();
        steps
    }
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Artifact, ResultSection};
    use crate::pipeline::step::StepInput;
    use chrono::Utc;

    fn ctx<'a>(
        step: &'a str,
        artifact: Option<&'a Artifact>,
        input: &'a StepInput,
        sections: &'a [ResultSection],
    ) -> StepContext<'a> {
        StepContext {
            step,
            artifact,
            input,
            sections,
        }
    }

    #[test]
    fn test_standard_catalog_contents() {
        let catalog = StepCatalog::standard();
        assert_eq!(catalog.steps().len(), 17);
        let chain = catalog.chain(ACQUISITION_CHAIN).unwrap();
        assert_eq!(chain.iter().map(|s| s.name).collect::<Vec<_>>(), vec!["retrieve", "transcribe"]);
        assert!(!chain[0].requires_artifact);
        assert!(chain[1].requires_artifact);
        assert!(matches!(catalog.step("levitate"), Err(ControllerError::UnknownOperation(_))));
    }

    #[test]
    fn test_related_passages_indexes_before_query() {
        let step = StepCatalog::standard().step("related-passages").unwrap();
        let tasks: Vec<_> = step.calls.iter().map(|c| c.task).collect();
        assert_eq!(tasks, vec!["build_vector_store", "search_similar"]);
    }

    #[test]
    fn test_download_rejects_non_http_url() {
        let input = StepInput::text("ftp://example.com/a.mp3");
        let err = download_payload(&ctx("retrieve", None, &input, &[])).unwrap_err();
        assert!(matches!(err, ControllerError::Validation { ref field, .. } if field == "url"));
        let input = StepInput::text("https://youtu.be/abc");
        assert_eq!(
            download_payload(&ctx("retrieve", None, &input, &[])).unwrap(),
            json!({"url": "https://youtu.be/abc"})
        );
    }

    #[test]
    fn test_export_payload_uses_artifact_and_sections() {
        let input = StepInput::none();
        let err = export_payload(&ctx("export", None, &input, &[])).unwrap_err();
        assert!(matches!(err, ControllerError::PrerequisiteMissing { .. }));

        let artifact = Artifact::new("transcribe", "metin");
        let sections = vec![ResultSection {
            step: "summarize".into(),
            title: "Özet".into(),
            body: "kısa".into(),
            produced_at: Utc::now(),
        }];
        let payload = export_payload(&ctx("export", Some(&artifact), &input, &sections)).unwrap();
        assert_eq!(
            payload,
            json!({"sections": [
                {"title": "Transkript", "content": "metin"},
                {"title": "Özet", "content": "kısa"}
            ]})
        );
    }
}
