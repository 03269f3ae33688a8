//! Promptitron - 考试备考服务的客户端控制器
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、会话状态、主控循环与组装
//! - **memory**: 对话历史与档案持久化
//! - **remote**: 远程服务抽象（HTTP / Mock）与带审计日志的调用器
//! - **operations**: 操作注册表与分发器（出题、学习计划、检索、内容分析……）
//! - **pipeline**: 任务流水线（下载 -> 转写 -> 派生分析 / 导出）
//! - **chat**: 对话循环
//! - **curriculum**: 课程树加载与浏览
//! - **health**: 服务健康轮询
//! - **render**: 响应格式化与轻量文本标记
//! - **ui**: 展示层接口、终端实现与命令解析

pub mod chat;
pub mod config;
pub mod core;
pub mod curriculum;
pub mod health;
pub mod memory;
pub mod observability;
pub mod operations;
pub mod pipeline;
pub mod remote;
pub mod render;
pub mod ui;

pub use crate::core::{Controller, ControllerBuilder, ControllerError, UiEvent};
