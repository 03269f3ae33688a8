//! 渲染模型：与展示层无关的结构化结果

use serde::Serialize;

use crate::core::{ControllerError, ErrorKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Card {
    pub heading: String,
    /// 已经过标记转换的正文
    pub body_html: String,
    pub meta: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionCard {
    pub number: usize,
    pub text_html: String,
    pub options: Vec<String>,
    pub answer: Option<String>,
    pub explanation_html: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum RenderModel {
    Text { title: String, html: String },
    Cards { title: String, cards: Vec<Card> },
    Table { title: String, columns: Vec<String>, rows: Vec<Vec<String>> },
    List { title: String, items: Vec<String> },
    Questions { title: String, questions: Vec<QuestionCard> },
    /// 可下载文档引用
    Document { title: String, href: String },
    NotFound { title: String, message: String },
    Error { kind: ErrorKind, message: String },
}

impl RenderModel {
    pub fn not_found(title: impl Into<String>) -> Self {
        RenderModel::NotFound {
            title: title.into(),
            message: "Sonuç bulunamadı".to_string(),
        }
    }

    pub fn error(err: &ControllerError) -> Self {
        RenderModel::Error {
            kind: err.kind(),
            message: user_message(err),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RenderModel::Error { .. })
    }

    pub fn title(&self) -> &str {
        match self {
            RenderModel::Text { title, .. }
            | RenderModel::Cards { title, .. }
            | RenderModel::Table { title, .. }
            | RenderModel::List { title, .. }
            | RenderModel::Questions { title, .. }
            | RenderModel::Document { title, .. }
            | RenderModel::NotFound { title, .. } => title,
            RenderModel::Error { .. } => "Hata",
        }
    }
}

/// 面向用户的错误文案
pub fn user_message(err: &ControllerError) -> String {
    match err {
        ControllerError::Validation { field, reason } => format!("'{field}' alanı geçersiz: {reason}"),
        ControllerError::UnknownOperation(op) => format!("Bilinmeyen işlem: {op}"),
        ControllerError::Network(msg) => format!("Sunucuya ulaşılamadı: {msg}"),
        ControllerError::Remote(msg) => format!("Sunucu hatası: {msg}"),
        ControllerError::PrerequisiteMissing { step, reason } => {
            format!("'{step}' çalıştırılamadı: {reason}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_model_serializes_with_kind() {
        let model = RenderModel::error(&ControllerError::Network("refused".into()));
        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["model"], json!("error"));
        assert_eq!(value["kind"], json!("network"));
    }

    #[test]
    fn test_not_found_serializes_with_model_tag() {
        let value = serde_json::to_value(RenderModel::not_found("Özet")).unwrap();
        assert_eq!(value, json!({"model": "not_found", "title": "Özet", "message": "Sonuç bulunamadı"}));
    }
}
