//! Mock 远程服务（用于测试，无需后端）
//!
//! 按端点名预置响应队列，并记录每次调用的 (端点名, 载荷)，便于断言调用顺序与请求形状。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::remote::{Endpoint, RemoteFailure, RemoteService};

struct Scripted {
    delay: Option<Duration>,
    outcome: Result<Value, RemoteFailure>,
}

/// Mock 服务：未预置的端点返回 Transport 失败
#[derive(Default)]
pub struct MockRemote {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, endpoint: &str, scripted: Scripted) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(endpoint.to_string()).or_default().push_back(scripted);
        }
    }

    pub fn respond(&self, endpoint: &str, payload: Value) -> &Self {
        self.push(endpoint, Scripted { delay: None, outcome: Ok(payload) });
        self
    }

    /// 延迟返回，用于模拟交错完成的调用
    pub fn respond_after(&self, endpoint: &str, payload: Value, delay: Duration) -> &Self {
        self.push(endpoint, Scripted { delay: Some(delay), outcome: Ok(payload) });
        self
    }

    pub fn fail(&self, endpoint: &str, failure: RemoteFailure) -> &Self {
        self.push(endpoint, Scripted { delay: None, outcome: Err(failure) });
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RemoteService for MockRemote {
    async fn invoke(&self, endpoint: &Endpoint, payload: Value) -> Result<Value, RemoteFailure> {
        let name = endpoint.name();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((name.clone(), payload));
        }
        let next = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.get_mut(&name).and_then(VecDeque::pop_front));
        match next {
            Some(scripted) => {
                if let Some(delay) = scripted.delay {
                    tokio::time::sleep(delay).await;
                }
                scripted.outcome
            }
            None => Err(RemoteFailure::Transport(format!("no scripted response for {name}"))),
        }
    }
}
