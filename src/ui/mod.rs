//! 展示层接口：render(slot, model) 与 notify(message, severity)
//!
//! 核心只通过 Presentation trait 输出结果，从不直接操作界面树。
//! console 为终端实现，recording 记录所有输出供测试断言，event 把命令行解析为 UiEvent。

pub mod console;
pub mod event;
pub mod recording;

use std::fmt;

use crate::memory::ConversationEntry;
use crate::operations::FormInputs;
use crate::render::RenderModel;

pub use console::ConsoleSurface;
pub use event::EventHandler;
pub use recording::RecordingSurface;

/// 结果展示位置；成功与失败使用同一个 slot
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Operation(String),
    Pipeline(String),
    ChatQuestions,
    ChatStudyPlan,
    ChatSuggestions,
    Curriculum,
    Profile,
    /// 可用操作与流水线步骤
    Catalog,
    Status,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Operation(id) => write!(f, "operation:{id}"),
            Slot::Pipeline(step) => write!(f, "pipeline:{step}"),
            Slot::ChatQuestions => f.write_str("chat:questions"),
            Slot::ChatStudyPlan => f.write_str("chat:study-plan"),
            Slot::ChatSuggestions => f.write_str("chat:suggestions"),
            Slot::Curriculum => f.write_str("curriculum"),
            Slot::Profile => f.write_str("profile"),
            Slot::Catalog => f.write_str("catalog"),
            Slot::Status => f.write_str("status"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Presentation: Send + Sync {
    fn render(&self, slot: &Slot, model: &RenderModel);

    /// 短暂的用户提示
    fn notify(&self, message: &str, severity: Severity);

    /// 对话历史变化后的完整列表
    fn conversation(&self, _entries: &[ConversationEntry]) {}

    /// 用选中的课程主题预填某个操作的表单
    fn prefill(&self, _operation: &str, _inputs: &FormInputs) {}
}
