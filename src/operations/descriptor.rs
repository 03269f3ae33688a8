//! 操作描述与注册表
//!
//! 每个操作 = 输入提取器列表 + 请求构造函数 + 响应渲染函数，注册一次后不可变；
//! OperationRegistry 按标识查找，Dispatcher 执行。

use std::collections::HashMap;
use std::sync::Arc;

use schemars::schema::RootSchema;
use serde_json::Value;

use crate::core::{ControllerError, Profile};
use crate::operations::input::{extract_all, FieldSpec, InputSource, Inputs};
use crate::remote::Endpoint;
use crate::render::RenderModel;

/// 纯函数：已校验输入 + 档案 -> 请求载荷
pub type RequestBuilder = fn(&Inputs, &Profile) -> Value;
/// 纯函数：原始响应 -> 渲染模型（全函数）
pub type ResponseRenderer = fn(&Value) -> RenderModel;

pub struct OperationDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub endpoint: Endpoint,
    pub fields: Vec<FieldSpec>,
    pub build_request: RequestBuilder,
    pub render_response: ResponseRenderer,
    pub request_schema: fn() -> RootSchema,
}

impl OperationDescriptor {
    /// 提取输入并构造请求；校验失败时不会产生载荷
    pub fn request(&self, source: &dyn InputSource, profile: &Profile) -> Result<Value, ControllerError> {
        let inputs = extract_all(&self.fields, source, profile)?;
        Ok((self.build_request)(&inputs, profile))
    }
}

/// 操作注册表：按标识存储，重复注册保留第一个
#[derive(Default)]
pub struct OperationRegistry {
    operations: HashMap<&'static str, Arc<OperationDescriptor>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回是否注册成功
    pub fn register(&mut self, descriptor: OperationDescriptor) -> bool {
        if self.operations.contains_key(descriptor.id) {
            tracing::warn!("Operation '{}' already registered, ignoring", descriptor.id);
            return false;
        }
        self.operations.insert(descriptor.id, Arc::new(descriptor));
        true
    }

    pub fn get(&self, id: &str) -> Option<Arc<OperationDescriptor>> {
        self.operations.get(id).cloned()
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<OperationDescriptor>, ControllerError> {
        self.get(id)
            .ok_or_else(|| ControllerError::UnknownOperation(id.to_string()))
    }

    /// 按标识排序的 (id, label) 列表
    pub fn operations(&self) -> Vec<(&'static str, &'static str)> {
        let mut ops: Vec<_> = self.operations.values().map(|d| (d.id, d.label)).collect();
        ops.sort();
        ops
    }
}
