//! 内置操作：出题、学习计划、检索、内容分析、单次对话、内容校验

use schemars::schema_for;
use serde_json::{json, Value};

use crate::config::DefaultsSection;
use crate::core::Profile;
use crate::operations::descriptor::{OperationDescriptor, OperationRegistry};
use crate::operations::input::{FieldKind, FieldSpec, Fallback, Inputs};
use crate::operations::requests::{
    AnalysisRequest, ChatContext, ChatRequest, QuestionRequest, SearchRequest, StudyPlanRequest,
    ValidationRequest, QUESTION_TYPE,
};
use crate::remote::Endpoint;
use crate::render::format;

pub const SUBJECTS: &[&str] = &[
    "matematik",
    "fizik",
    "kimya",
    "biyoloji",
    "cografya",
    "tarih",
    "felsefe",
    "edebiyat",
    "turkce",
    "din_kulturu",
    "inkilap_tarihi",
    "ingilizce",
];

pub const DIFFICULTIES: &[&str] = &["easy", "medium", "hard"];

fn to_payload<T: serde::Serialize>(request: T) -> Value {
    serde_json::to_value(request).unwrap_or(Value::Null)
}

fn build_questions(inputs: &Inputs, _profile: &Profile) -> Value {
    to_payload(QuestionRequest {
        subject: inputs.str("subject").to_string(),
        topic: inputs.str("topic").to_string(),
        difficulty: inputs.str("difficulty").to_string(),
        count: inputs.u64("count"),
        exam_type: inputs.exam("exam_type"),
        question_type: QUESTION_TYPE.to_string(),
    })
}

fn build_study_plan(inputs: &Inputs, profile: &Profile) -> Value {
    let target_exam = inputs.exam("target_exam");
    let daily_hours = inputs.u64("daily_hours");
    let mut student_profile = profile.clone();
    student_profile.target_exam = target_exam;
    if let Some(hours) = u32::try_from(daily_hours).ok().and_then(std::num::NonZeroU32::new) {
        student_profile.daily_hours = hours;
    }
    to_payload(StudyPlanRequest {
        student_profile,
        target_exam,
        duration_weeks: inputs.u64("duration_weeks"),
        daily_hours,
    })
}

fn build_search(inputs: &Inputs, _profile: &Profile) -> Value {
    to_payload(SearchRequest {
        query: inputs.str("query").to_string(),
        n_results: inputs.u64("n_results"),
        include_personalization: inputs.bool("include_personalization"),
    })
}

fn build_analysis(inputs: &Inputs, _profile: &Profile) -> Value {
    to_payload(AnalysisRequest {
        content: inputs.str("content").to_string(),
        analysis_type: inputs.str("analysis_type").to_string(),
        include_suggestions: inputs.bool("include_suggestions"),
    })
}

fn build_chat(inputs: &Inputs, profile: &Profile) -> Value {
    to_payload(ChatRequest {
        message: inputs.str("message").to_string(),
        context: ChatContext {
            profile: profile.clone(),
        },
    })
}

fn build_validation(inputs: &Inputs, _profile: &Profile) -> Value {
    to_payload(ValidationRequest {
        content: inputs.str("content").to_string(),
        context: inputs.str("context").to_string(),
    })
}

/// 内置操作描述；表单默认值来自 [defaults] 配置
pub fn builtin_operations(defaults: &DefaultsSection) -> Vec<OperationDescriptor> {
    let positive = |max: u64| FieldKind::Integer { min: 1, max };
    vec![
        OperationDescriptor {
            id: "generate-questions",
            label: "Soru Üret",
            endpoint: Endpoint::GenerateQuestions,
            fields: vec![
                FieldSpec::required("subject", FieldKind::Choice(SUBJECTS)),
                FieldSpec::required("topic", FieldKind::Text),
                FieldSpec::optional(
                    "difficulty",
                    FieldKind::Choice(DIFFICULTIES),
                    Fallback::Value(json!("medium")),
                ),
                FieldSpec::optional(
                    "count",
                    positive(50),
                    Fallback::Value(json!(defaults.question_count)),
                ),
                FieldSpec::optional("exam_type", FieldKind::Exam, Fallback::ProfileTargetExam),
            ],
            build_request: build_questions,
            render_response: format::questions,
            request_schema: || schema_for!(QuestionRequest),
        },
        OperationDescriptor {
            id: "generate-study-plan",
            label: "Çalışma Planı",
            endpoint: Endpoint::GenerateStudyPlan,
            fields: vec![
                FieldSpec::optional("target_exam", FieldKind::Exam, Fallback::ProfileTargetExam),
                FieldSpec::optional(
                    "duration_weeks",
                    positive(104),
                    Fallback::Value(json!(defaults.duration_weeks)),
                ),
                FieldSpec::optional("daily_hours", positive(24), Fallback::ProfileDailyHours),
            ],
            build_request: build_study_plan,
            render_response: format::study_plan,
            request_schema: || schema_for!(StudyPlanRequest),
        },
        OperationDescriptor {
            id: "search",
            label: "Bilgi Tabanında Ara",
            endpoint: Endpoint::Search,
            fields: vec![
                FieldSpec::required("query", FieldKind::Text),
                FieldSpec::optional(
                    "n_results",
                    positive(50),
                    Fallback::Value(json!(defaults.search_results)),
                ),
                FieldSpec::optional(
                    "include_personalization",
                    FieldKind::Flag,
                    Fallback::Value(json!(true)),
                ),
            ],
            build_request: build_search,
            render_response: format::search_results,
            request_schema: || schema_for!(SearchRequest),
        },
        OperationDescriptor {
            id: "analyze-content",
            label: "İçerik Analizi",
            endpoint: Endpoint::AnalyzeContent,
            fields: vec![
                FieldSpec::required("content", FieldKind::Text),
                FieldSpec::optional(
                    "analysis_type",
                    FieldKind::Text,
                    Fallback::Value(json!("comprehensive")),
                ),
                FieldSpec::optional(
                    "include_suggestions",
                    FieldKind::Flag,
                    Fallback::Value(json!(true)),
                ),
            ],
            build_request: build_analysis,
            render_response: format::analysis,
            request_schema: || schema_for!(AnalysisRequest),
        },
        OperationDescriptor {
            id: "chat",
            label: "Tek Seferlik Soru",
            endpoint: Endpoint::Chat,
            fields: vec![FieldSpec::required("message", FieldKind::Text)],
            build_request: build_chat,
            render_response: format::chat_reply,
            request_schema: || schema_for!(ChatRequest),
        },
        OperationDescriptor {
            id: "validate-content",
            label: "İçerik Doğrula",
            endpoint: Endpoint::ValidateContent,
            fields: vec![
                FieldSpec::required("content", FieldKind::Text),
                FieldSpec::optional("context", FieldKind::Text, Fallback::Value(json!(""))),
            ],
            build_request: build_validation,
            render_response: format::validation,
            request_schema: || schema_for!(ValidationRequest),
        },
    ]
}

/// 注册全部内置操作
pub fn builtin_registry(defaults: &DefaultsSection) -> OperationRegistry {
    let mut registry = OperationRegistry::new();
    for descriptor in builtin_operations(defaults) {
        registry.register(descriptor);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ControllerError, ExamType};
    use crate::operations::FormInputs;

    fn registry() -> OperationRegistry {
        builtin_registry(&DefaultsSection::default())
    }

    #[test]
    fn test_generate_questions_request_shape() {
        let inputs = FormInputs::new()
            .with("subject", "matematik")
            .with("topic", "türev")
            .with("difficulty", "medium")
            .with("count", "3")
            .with("exam_type", "YKS");
        let payload = registry()
            .resolve("generate-questions")
            .unwrap()
            .request(&inputs, &Profile::default())
            .unwrap();
        assert_eq!(
            payload,
            json!({
                "subject": "matematik",
                "topic": "türev",
                "difficulty": "medium",
                "count": 3,
                "exam_type": "YKS",
                "question_type": "MULTIPLE_CHOICE"
            })
        );
    }

    #[test]
    fn test_generate_questions_defaults() {
        let profile = Profile {
            target_exam: ExamType::AYT,
            ..Profile::default()
        };
        let inputs = FormInputs::new().with("subject", "Fizik").with("topic", "Optik");
        let payload = registry()
            .resolve("generate-questions")
            .unwrap()
            .request(&inputs, &profile)
            .unwrap();
        assert_eq!(payload["subject"], "fizik");
        assert_eq!(payload["difficulty"], "medium");
        assert_eq!(payload["count"], 3);
        assert_eq!(payload["exam_type"], "AYT");
    }

    #[test]
    fn test_study_plan_merges_form_overrides_into_profile() {
        let profile = Profile {
            weak_subjects: ["kimya".to_string()].into_iter().collect(),
            ..Profile::default()
        };
        let inputs = FormInputs::new()
            .with("target_exam", "AYT")
            .with("daily_hours", "4")
            .with("duration_weeks", "8");
        let payload = registry()
            .resolve("generate-study-plan")
            .unwrap()
            .request(&inputs, &profile)
            .unwrap();
        assert_eq!(payload["target_exam"], "AYT");
        assert_eq!(payload["duration_weeks"], 8);
        assert_eq!(payload["daily_hours"], 4);
        assert_eq!(payload["student_profile"]["target_exam"], "AYT");
        assert_eq!(payload["student_profile"]["daily_hours"], 4);
        assert_eq!(payload["student_profile"]["weak_subjects"], json!(["kimya"]));
    }

    #[test]
    fn test_search_and_analysis_shapes() {
        let registry = registry();
        let search = registry
            .resolve("search")
            .unwrap()
            .request(&FormInputs::new().with("query", "integral"), &Profile::default())
            .unwrap();
        assert_eq!(
            search,
            json!({"query": "integral", "n_results": 5, "include_personalization": true})
        );
        let analysis = registry
            .resolve("analyze-content")
            .unwrap()
            .request(&FormInputs::new().with("content", "Metin"), &Profile::default())
            .unwrap();
        assert_eq!(
            analysis,
            json!({"content": "Metin", "analysis_type": "comprehensive", "include_suggestions": true})
        );
    }

    #[test]
    fn test_unknown_subject_rejected() {
        let err = registry()
            .resolve("generate-questions")
            .unwrap()
            .request(
                &FormInputs::new().with("subject", "astroloji").with("topic", "x"),
                &Profile::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ControllerError::Validation { field, .. } if field == "subject"));
    }

    #[test]
    fn test_registry_rejects_duplicate_and_unknown() {
        let mut registry = registry();
        let again = builtin_operations(&DefaultsSection::default()).remove(0);
        assert!(!registry.register(again));
        assert!(matches!(
            registry.resolve("teleport"),
            Err(ControllerError::UnknownOperation(_))
        ));
        assert_eq!(registry.operations().len(), 6);
    }

    #[test]
    fn test_request_schema_lists_fields() {
        let schema = (registry().resolve("search").unwrap().request_schema)();
        let text = serde_json::to_string(&schema).unwrap();
        assert!(text.contains("n_results"));
    }
}
