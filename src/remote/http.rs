//! HTTP 远程服务
//!
//! 通过 reqwest 调用 API 服务（chat / generate / search / analyze ...）与任务服务（/task?task_name=）。
//! 连接失败、超时、读取响应体失败视为 Transport；非 2xx 视为 Service，消息取自 `detail` / `error` 字段。

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::remote::{payload_error, Endpoint, RemoteFailure, RemoteService};

pub struct HttpRemote {
    client: Client,
    api_base: String,
    task_base: String,
}

impl HttpRemote {
    /// TLS 后端等初始化失败时返回错误
    pub fn new(api_base: &str, task_base: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("promptitron/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            task_base: task_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        match endpoint {
            Endpoint::Task(_) => format!("{}/task", self.task_base),
            other => format!("{}/{}", self.api_base, other.name()),
        }
    }
}

/// 非 2xx 响应体里最有用的一段说明
fn failure_detail(body: &Value) -> String {
    if let Some(detail) = body.get("detail").and_then(Value::as_str) {
        return detail.to_string();
    }
    if let Some(err) = payload_error(body) {
        return err;
    }
    match body {
        Value::String(s) => s.chars().take(200).collect(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn invoke(&self, endpoint: &Endpoint, payload: Value) -> Result<Value, RemoteFailure> {
        let url = self.url(endpoint);
        let request = match endpoint {
            Endpoint::Task(name) => self
                .client
                .post(&url)
                .query(&[("task_name", name.as_str())])
                .json(&payload),
            e if e.is_read() => self.client.get(&url),
            _ => self.client.post(&url).json(&payload),
        };

        let resp = request
            .send()
            .await
            .map_err(|e| RemoteFailure::Transport(format!("Request failed: {}", e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RemoteFailure::Transport(format!("Body read failed: {}", e)))?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        if !status.is_success() {
            return Err(RemoteFailure::Service(format!(
                "HTTP {}: {}",
                status.as_u16(),
                failure_detail(&body)
            )));
        }
        Ok(body)
    }
}
