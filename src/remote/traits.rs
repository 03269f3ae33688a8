//! 远程服务抽象
//!
//! 所有后端（HTTP / Mock）实现 RemoteService：invoke(endpoint, payload) -> 成功载荷或规范化失败。
//! 不包含任何业务逻辑。

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::ControllerError;

/// 远端具名端点
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Chat,
    GenerateQuestions,
    GenerateStudyPlan,
    Search,
    AnalyzeContent,
    ValidateContent,
    Health,
    Curriculum,
    /// 流水线任务：`/task?task_name=<name>`
    Task(String),
}

impl Endpoint {
    pub fn task(name: impl Into<String>) -> Self {
        Endpoint::Task(name.into())
    }

    /// 稳定名称，用于日志、审计与 Mock 脚本
    pub fn name(&self) -> String {
        match self {
            Endpoint::Chat => "chat".into(),
            Endpoint::GenerateQuestions => "generate/questions".into(),
            Endpoint::GenerateStudyPlan => "generate/study-plan".into(),
            Endpoint::Search => "search".into(),
            Endpoint::AnalyzeContent => "analyze/content".into(),
            Endpoint::ValidateContent => "validate/content".into(),
            Endpoint::Health => "health".into(),
            Endpoint::Curriculum => "curriculum".into(),
            Endpoint::Task(name) => format!("task/{name}"),
        }
    }

    /// 只读端点用 GET，其余用 POST + JSON
    pub fn is_read(&self) -> bool {
        matches!(self, Endpoint::Health | Endpoint::Curriculum)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// 规范化的远程失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    /// 无法到达服务
    #[error("transport failure: {0}")]
    Transport(String),

    /// 服务返回非成功状态
    #[error("service failure: {0}")]
    Service(String),
}

impl From<RemoteFailure> for ControllerError {
    fn from(failure: RemoteFailure) -> Self {
        match failure {
            RemoteFailure::Transport(msg) => ControllerError::Network(msg),
            RemoteFailure::Service(msg) => ControllerError::Remote(msg),
        }
    }
}

#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn invoke(&self, endpoint: &Endpoint, payload: Value) -> Result<Value, RemoteFailure>;
}

/// 成功响应中显式的错误标记：非空 `error` 字段，或 `success: false`
pub fn payload_error(payload: &Value) -> Option<String> {
    let error_text = payload.get("error").and_then(|e| match e {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    });
    if error_text.is_some() {
        return error_text;
    }
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        return Some("İşlem başarısız oldu".to_string());
    }
    None
}
