//! 记录型展示层：保存每次 render / notify / conversation 调用，供测试断言

use std::sync::Mutex;

use crate::memory::ConversationEntry;
use crate::operations::FormInputs;
use crate::render::RenderModel;
use crate::ui::{Presentation, Severity, Slot};

#[derive(Default)]
pub struct RecordingSurface {
    renders: Mutex<Vec<(Slot, RenderModel)>>,
    notices: Mutex<Vec<(String, Severity)>>,
    conversations: Mutex<Vec<Vec<ConversationEntry>>>,
    prefills: Mutex<Vec<(String, FormInputs)>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn renders(&self) -> Vec<(Slot, RenderModel)> {
        self.renders.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// 某个 slot 最近一次渲染的模型
    pub fn last_in(&self, slot: &Slot) -> Option<RenderModel> {
        self.renders()
            .into_iter()
            .rev()
            .find(|(s, _)| s == slot)
            .map(|(_, m)| m)
    }

    pub fn notices(&self) -> Vec<(String, Severity)> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn conversations(&self) -> Vec<Vec<ConversationEntry>> {
        self.conversations.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn prefills(&self) -> Vec<(String, FormInputs)> {
        self.prefills.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Presentation for RecordingSurface {
    fn render(&self, slot: &Slot, model: &RenderModel) {
        if let Ok(mut renders) = self.renders.lock() {
            renders.push((slot.clone(), model.clone()));
        }
    }

    fn notify(&self, message: &str, severity: Severity) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push((message.to_string(), severity));
        }
    }

    fn conversation(&self, entries: &[ConversationEntry]) {
        if let Ok(mut conversations) = self.conversations.lock() {
            conversations.push(entries.to_vec());
        }
    }

    fn prefill(&self, operation: &str, inputs: &FormInputs) {
        if let Ok(mut prefills) = self.prefills.lock() {
            prefills.push((operation.to_string(), inputs.clone()));
        }
    }
}
