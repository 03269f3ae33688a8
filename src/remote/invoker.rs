//! 远程调用器
//!
//! 持有 RemoteService，call(endpoint, payload) 统一做三件事：
//! 输出结构化审计日志（JSON）、把 RemoteFailure 转为 ControllerError、
//! 把成功响应中的显式错误标记转为 ControllerError::Remote。

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::core::ControllerError;
use crate::remote::{payload_error, Endpoint, RemoteService};

#[derive(Clone)]
pub struct Invoker {
    remote: Arc<dyn RemoteService>,
}

impl Invoker {
    pub fn new(remote: Arc<dyn RemoteService>) -> Self {
        Self { remote }
    }

    pub async fn call(&self, endpoint: &Endpoint, payload: Value) -> Result<Value, ControllerError> {
        let start = Instant::now();
        let payload_preview = preview(&payload);
        let result = self.remote.invoke(endpoint, payload).await;

        let outcome = match &result {
            Ok(body) if payload_error(body).is_some() => "flagged",
            Ok(_) => "ok",
            Err(crate::remote::RemoteFailure::Transport(_)) => "unreachable",
            Err(crate::remote::RemoteFailure::Service(_)) => "error",
        };
        let audit = serde_json::json!({
            "event": "remote_audit",
            "endpoint": endpoint.name(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "payload_preview": payload_preview,
        });
        tracing::info!(audit = %audit.to_string(), "remote");

        let body = result?;
        match payload_error(&body) {
            Some(message) => Err(ControllerError::Remote(message)),
            None => Ok(body),
        }
    }
}

fn preview(payload: &Value) -> String {
    let s = payload.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
