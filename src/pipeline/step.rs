//! 流水线步骤定义
//!
//! 一个步骤 = 一个或多个按顺序执行的远程任务（SubCall）+ 结果类型。
//! Artifact 类步骤覆盖会话中的当前 artifact；Terminal 类步骤只产生可渲染结果。

use serde_json::Value;

use crate::core::{Artifact, ControllerError, ResultSection};

/// 步骤结果对会话状态的影响
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    /// 结果成为新的当前 artifact（最后写入者胜出）
    Artifact,
    Terminal,
}

/// Terminal 结果的呈现方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutput {
    /// 按结果形状格式化，并保存为结果段落
    Rendered,
    /// 结果是服务端文件路径，转为下载链接
    Download,
    /// 结果本身就是可分享的 URL
    Link,
}

/// 用户为某一步提供的额外输入（URL、检索词等）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepInput {
    pub text: Option<String>,
}

impl StepInput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            text: Some(text).filter(|t| !t.trim().is_empty()),
        }
    }

    /// 去除首尾空白后的非空输入，否则返回 ValidationError
    pub fn required(&self, field: &str) -> Result<&str, ControllerError> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ControllerError::validation(field, "zorunlu alan boş"))
    }
}

/// 构造载荷时可见的上下文
pub struct StepContext<'a> {
    pub step: &'a str,
    pub artifact: Option<&'a Artifact>,
    pub input: &'a StepInput,
    pub sections: &'a [ResultSection],
}

impl StepContext<'_> {
    pub fn artifact_text(&self) -> Result<&str, ControllerError> {
        self.artifact
            .map(|a| a.value.as_str())
            .ok_or_else(|| ControllerError::prerequisite(self.step, "önce bir içerik işlenmeli"))
    }
}

pub type PayloadBuilder = fn(&StepContext) -> Result<Value, ControllerError>;

/// 单个远程任务调用
#[derive(Clone, Copy)]
pub struct SubCall {
    /// 任务服务中的 task_name
    pub task: &'static str,
    pub build_payload: PayloadBuilder,
}

pub struct TaskChainStep {
    pub name: &'static str,
    pub title: &'static str,
    pub requires_artifact: bool,
    /// 严格按顺序执行；任一失败则后续不再调用
    pub calls: Vec<SubCall>,
    pub result_kind: ResultKind,
    pub output: StepOutput,
}

impl TaskChainStep {
    /// 只依赖当前 artifact 的派生分析步骤：`{text: artifact}`
    pub fn derived(name: &'static str, title: &'static str, task: &'static str) -> Self {
        Self {
            name,
            title,
            requires_artifact: true,
            calls: vec![SubCall {
                task,
                build_payload: text_payload,
            }],
            result_kind: ResultKind::Terminal,
            output: StepOutput::Rendered,
        }
    }

    pub fn with_output(mut self, output: StepOutput) -> Self {
        self.output = output;
        self
    }
}

/// 派生步骤的通用载荷
pub fn text_payload(ctx: &StepContext) -> Result<Value, ControllerError> {
    Ok(serde_json::json!({ "text": ctx.artifact_text()? }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_input_blank_is_none() {
        assert_eq!(StepInput::text("   ").text, None);
        assert!(StepInput::text("  ").required("query").is_err());
        assert_eq!(StepInput::text(" türev ").required("query").unwrap(), "türev");
    }

    #[test]
    fn test_text_payload_requires_artifact() {
        let input = StepInput::none();
        let ctx = StepContext {
            step: "summarize",
            artifact: None,
            input: &input,
            sections: &[],
        };
        let err = text_payload(&ctx).unwrap_err();
        assert!(matches!(err, ControllerError::PrerequisiteMissing { ref step, .. } if step == "summarize"));

        let artifact = Artifact::new("transcribe", "Merhaba dünya");
        let ctx = StepContext {
            artifact: Some(&artifact),
            ..ctx
        };
        assert_eq!(text_payload(&ctx).unwrap(), serde_json::json!({"text": "Merhaba dünya"}));
    }
}
