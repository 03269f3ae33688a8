//! 任务流水线：获取链（下载 -> 转写）与依赖当前 artifact 的派生分析步骤

pub mod catalog;
pub mod engine;
pub mod step;

pub use catalog::{StepCatalog, ACQUISITION_CHAIN};
pub use engine::PipelineEngine;
pub use step::{PayloadBuilder, ResultKind, StepContext, StepInput, StepOutput, SubCall, TaskChainStep};
