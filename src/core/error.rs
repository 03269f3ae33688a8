//! 控制器错误类型
//!
//! 闭合的五类错误：校验、未知操作、网络、远端、前置条件缺失。
//! 所有错误都在 Dispatcher / Pipeline / Chat 边界被转换为可渲染的错误模型（见 recovery）。

use serde::Serialize;
use thiserror::Error;

/// 编排层可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// 必填输入缺失或格式错误；绝不会发出远程调用
    #[error("Validation failed for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// 传输层不可达（连接失败、超时、响应体无法解析）
    #[error("Network error: {0}")]
    Network(String),

    /// 服务端已响应但标记了失败
    #[error("Remote error: {0}")]
    Remote(String),

    /// 流水线步骤缺少所需的 artifact
    #[error("Prerequisite missing for '{step}': {reason}")]
    PrerequisiteMissing { step: String, reason: String },
}

/// 错误类别（渲染模型与日志使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    UnknownOperation,
    Network,
    Remote,
    PrerequisiteMissing,
}

impl ControllerError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn prerequisite(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PrerequisiteMissing {
            step: step.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::UnknownOperation(_) => ErrorKind::UnknownOperation,
            Self::Network(_) => ErrorKind::Network,
            Self::Remote(_) => ErrorKind::Remote,
            Self::PrerequisiteMissing { .. } => ErrorKind::PrerequisiteMissing,
        }
    }
}
