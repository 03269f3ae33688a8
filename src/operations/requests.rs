//! 各操作的请求体（与后端约定的固定形状）
//!
//! schemars 自动生成 JSON Schema，供 describe 命令展示。

use schemars::JsonSchema;
use serde::Serialize;

use crate::core::{ExamType, Profile};

/// 出题请求的题型常量
pub const QUESTION_TYPE: &str = "MULTIPLE_CHOICE";

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QuestionRequest {
    pub subject: String,
    pub topic: String,
    /// easy / medium / hard
    pub difficulty: String,
    pub count: u64,
    pub exam_type: ExamType,
    pub question_type: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StudyPlanRequest {
    /// 档案与表单覆盖项（target_exam / daily_hours）合并后的结果
    pub student_profile: Profile,
    pub target_exam: ExamType,
    pub duration_weeks: u64,
    pub daily_hours: u64,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SearchRequest {
    pub query: String,
    pub n_results: u64,
    pub include_personalization: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AnalysisRequest {
    pub content: String,
    pub analysis_type: String,
    pub include_suggestions: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ChatContext {
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ChatRequest {
    pub message: String,
    pub context: ChatContext,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ValidationRequest {
    pub content: String,
    pub context: String,
}
