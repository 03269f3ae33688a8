//! 操作分发器
//!
//! execute(id, inputs)：解析描述 -> 提取输入 -> 构造请求 -> 远程调用 -> 渲染。
//! 成功与失败都渲染到同一个 Slot::Operation(id)，失败时额外发出提示。

use std::sync::Arc;

use schemars::schema::RootSchema;
use serde_json::Value;

use crate::core::recovery::RecoveryEngine;
use crate::core::{ControllerError, SessionStore};
use crate::operations::descriptor::OperationRegistry;
use crate::operations::input::InputSource;
use crate::remote::Invoker;
use crate::render::RenderModel;
use crate::ui::{Presentation, Severity, Slot};

pub struct Dispatcher {
    registry: Arc<OperationRegistry>,
    invoker: Invoker,
    session: Arc<SessionStore>,
    presentation: Arc<dyn Presentation>,
    recovery: RecoveryEngine,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<OperationRegistry>,
        invoker: Invoker,
        session: Arc<SessionStore>,
        presentation: Arc<dyn Presentation>,
    ) -> Self {
        Self {
            registry,
            invoker,
            session,
            presentation,
            recovery: RecoveryEngine::new(),
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// 仅构造请求载荷，不发起调用
    pub async fn build_request(&self, id: &str, source: &dyn InputSource) -> Result<Value, ControllerError> {
        let descriptor = self.registry.resolve(id)?;
        let profile = self.session.profile().await;
        descriptor.request(source, &profile)
    }

    /// 执行一次操作；返回的模型已渲染到界面
    pub async fn execute(&self, id: &str, source: &dyn InputSource) -> Result<RenderModel, ControllerError> {
        let slot = Slot::Operation(id.to_string());
        match self.run(id, source).await {
            Ok(model) => {
                self.presentation.render(&slot, &model);
                Ok(model)
            }
            Err(e) => {
                tracing::warn!(operation = id, kind = ?e.kind(), "operation failed: {}", e);
                let recovery = self.recovery.handle(&e);
                self.presentation.render(&slot, &recovery.model);
                self.presentation.notify(&recovery.notice, recovery.severity);
                Err(e)
            }
        }
    }

    async fn run(&self, id: &str, source: &dyn InputSource) -> Result<RenderModel, ControllerError> {
        let descriptor = self.registry.resolve(id)?;
        let profile = self.session.profile().await;
        let payload = descriptor.request(source, &profile)?;
        tracing::debug!(operation = id, endpoint = %descriptor.endpoint, "dispatching");
        let body = self.invoker.call(&descriptor.endpoint, payload).await?;
        Ok((descriptor.render_response)(&body))
    }

    /// 操作说明：标签、字段列表与请求 JSON Schema
    pub fn describe(&self, id: &str) -> Result<RenderModel, ControllerError> {
        let descriptor = self.registry.resolve(id)?;
        let rows = descriptor
            .fields
            .iter()
            .map(|f| {
                vec![
                    f.name.to_string(),
                    if f.is_required() { "evet" } else { "hayır" }.to_string(),
                    format!("{:?}", f.kind),
                ]
            })
            .collect();
        let schema: RootSchema = (descriptor.request_schema)();
        tracing::debug!(
            operation = id,
            schema = %serde_json::to_string(&schema).unwrap_or_default(),
            "request schema"
        );
        let model = RenderModel::Table {
            title: format!("{} ({})", descriptor.label, descriptor.endpoint),
            columns: vec!["Alan".into(), "Zorunlu".into(), "Tür".into()],
            rows,
        };
        self.presentation.render(&Slot::Operation(id.to_string()), &model);
        Ok(model)
    }

    /// 已注册操作列表
    pub fn list(&self) -> RenderModel {
        RenderModel::List {
            title: "İşlemler".into(),
            items: self
                .registry
                .operations()
                .into_iter()
                .map(|(id, label)| format!("{id}: {label}"))
                .collect(),
        }
    }

    pub fn notify(&self, message: &str, severity: Severity) {
        self.presentation.notify(message, severity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultsSection;
    use crate::memory::MemoryProfileStore;
    use crate::operations::{builtin_registry, FormInputs};
    use crate::remote::{MockRemote, RemoteFailure};
    use crate::ui::RecordingSurface;
    use serde_json::json;

    fn setup() -> (Arc<MockRemote>, Arc<RecordingSurface>, Dispatcher) {
        let mock = Arc::new(MockRemote::new());
        let surface = Arc::new(RecordingSurface::new());
        let session = Arc::new(SessionStore::restore(Arc::new(MemoryProfileStore::new())));
        let dispatcher = Dispatcher::new(
            Arc::new(builtin_registry(&DefaultsSection::default())),
            Invoker::new(mock.clone()),
            session,
            surface.clone(),
        );
        (mock, surface, dispatcher)
    }

    #[tokio::test]
    async fn test_validation_error_makes_no_remote_call() {
        let (mock, surface, dispatcher) = setup();
        let err = dispatcher
            .execute("generate-questions", &FormInputs::new().with("subject", "matematik"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Validation { ref field, .. } if field == "topic"));
        assert_eq!(mock.call_count(), 0);
        let rendered = surface.last_in(&Slot::Operation("generate-questions".into())).unwrap();
        assert!(rendered.is_error());
        assert_eq!(surface.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_success_renders_into_operation_slot() {
        let (mock, surface, dispatcher) = setup();
        mock.respond(
            "search",
            json!({"results": [{"title": "Türev", "subject": "matematik", "score": 0.9, "content": "Limit tanımı"}]}),
        );
        let model = dispatcher
            .execute("search", &FormInputs::new().with("query", "türev"))
            .await
            .unwrap();
        assert!(matches!(model, RenderModel::Table { .. }));
        assert_eq!(surface.last_in(&Slot::Operation("search".into())), Some(model));
        assert!(surface.notices().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_renders_error_in_same_slot() {
        let (mock, surface, dispatcher) = setup();
        mock.fail("chat", RemoteFailure::Transport("connection refused".into()));
        let err = dispatcher
            .execute("chat", &FormInputs::new().with("message", "Merhaba"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Network(_)));
        let rendered = surface.last_in(&Slot::Operation("chat".into())).unwrap();
        assert!(rendered.is_error());
        assert_eq!(surface.notices()[0].1, Severity::Error);
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let (mock, _surface, dispatcher) = setup();
        let err = dispatcher.execute("teleport", &FormInputs::new()).await.unwrap_err();
        assert_eq!(err, ControllerError::UnknownOperation("teleport".into()));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_build_request_uses_session_profile() {
        let (_mock, _surface, dispatcher) = setup();
        let payload = dispatcher
            .build_request("generate-study-plan", &FormInputs::new())
            .await
            .unwrap();
        assert_eq!(payload["target_exam"], "TYT");
        assert_eq!(payload["daily_hours"], 6);
        assert_eq!(payload["duration_weeks"], 12);
    }

    #[test]
    fn test_describe_lists_fields() {
        let (_mock, _surface, dispatcher) = setup();
        match dispatcher.describe("search").unwrap() {
            RenderModel::Table { rows, .. } => {
                assert_eq!(rows[0][0], "query");
                assert_eq!(rows[0][1], "evet");
            }
            other => panic!("Expected table, got {other:?}"),
        }
    }
}
