//! 错误恢复：将 ControllerError 映射为渲染模型与用户提示
//!
//! 所有失败都以同一种方式呈现：结果位置显示错误模型，同时发出一条提示。

use crate::core::ControllerError;
use crate::render::{user_message, RenderModel};
use crate::ui::Severity;

/// 失败后的呈现动作
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recovery {
    pub model: RenderModel,
    pub notice: String,
    pub severity: Severity,
}

#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// 用户可自行修正的错误（输入、前置条件）为 Warning，其余为 Error
    pub fn handle(&self, err: &ControllerError) -> Recovery {
        let severity = match err {
            ControllerError::Validation { .. } | ControllerError::PrerequisiteMissing { .. } => {
                Severity::Warning
            }
            ControllerError::UnknownOperation(_)
            | ControllerError::Network(_)
            | ControllerError::Remote(_) => Severity::Error,
        };
        Recovery {
            model: RenderModel::error(err),
            notice: user_message(err),
            severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    #[test]
    fn test_validation_is_warning() {
        let recovery = RecoveryEngine::new().handle(&ControllerError::validation("topic", "boş"));
        assert_eq!(recovery.severity, Severity::Warning);
        assert!(recovery.notice.contains("topic"));
    }

    #[test]
    fn test_network_is_error_with_model() {
        let recovery = RecoveryEngine::new().handle(&ControllerError::Network("refused".into()));
        assert_eq!(recovery.severity, Severity::Error);
        match recovery.model {
            RenderModel::Error { kind, .. } => assert_eq!(kind, ErrorKind::Network),
            other => panic!("Expected error model, got {other:?}"),
        }
    }

    #[test]
    fn test_prerequisite_is_warning() {
        let recovery = RecoveryEngine::new().handle(&ControllerError::prerequisite("summarize", "önce video işleyin"));
        assert_eq!(recovery.severity, Severity::Warning);
    }
}
