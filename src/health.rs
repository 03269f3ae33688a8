//! 服务健康探测
//!
//! 轮询器是核心之外的协作任务：按固定间隔探测 `GET /health`，
//! 只在状态变化时提示用户，收到取消信号后退出。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::remote::{Endpoint, Invoker};
use crate::render::RenderModel;
use crate::ui::{Presentation, Severity, Slot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// 探测失败视为不健康
    async fn fetch_status(&self) -> HealthStatus;
}

pub struct RemoteHealthProbe {
    invoker: Invoker,
}

impl RemoteHealthProbe {
    pub fn new(invoker: Invoker) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl HealthProbe for RemoteHealthProbe {
    async fn fetch_status(&self) -> HealthStatus {
        match self.invoker.call(&Endpoint::Health, Value::Null).await {
            Ok(body) => HealthStatus {
                healthy: body.get("status").and_then(Value::as_str) == Some("healthy"),
            },
            Err(e) => {
                tracing::debug!("health probe failed: {}", e);
                HealthStatus { healthy: false }
            }
        }
    }
}

fn status_model(status: HealthStatus) -> RenderModel {
    let html = if status.healthy {
        "🟢 Sunucu çevrimiçi"
    } else {
        "🔴 Sunucuya ulaşılamıyor"
    };
    RenderModel::Text {
        title: "Sunucu Durumu".to_string(),
        html: html.to_string(),
    }
}

/// 状态跟踪：返回是否需要提示（首次观测到不健康，或状态翻转）
#[derive(Debug, Default)]
pub struct StatusTracker {
    last: Option<bool>,
}

impl StatusTracker {
    pub fn observe(&mut self, status: HealthStatus) -> Option<(String, Severity)> {
        let previous = self.last.replace(status.healthy);
        match (previous, status.healthy) {
            (Some(before), now) if before == now => None,
            (None, true) => None,
            (_, true) => Some(("Sunucu bağlantısı yeniden kuruldu".to_string(), Severity::Success)),
            (_, false) => Some(("Sunucuya ulaşılamıyor".to_string(), Severity::Warning)),
        }
    }
}

/// 启动轮询任务；首个探测立即执行
pub fn spawn_poller(
    probe: Arc<dyn HealthProbe>,
    presentation: Arc<dyn Presentation>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut tracker = StatusTracker::default();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("health poller stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let status = probe.fetch_status().await;
                    if let Some((message, severity)) = tracker.observe(status) {
                        tracing::info!(healthy = status.healthy, "service health changed");
                        presentation.render(&Slot::Status, &status_model(status));
                        presentation.notify(&message, severity);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemote;
    use crate::ui::RecordingSurface;
    use serde_json::json;

    #[test]
    fn test_tracker_notifies_on_transitions_only() {
        let mut tracker = StatusTracker::default();
        assert!(tracker.observe(HealthStatus { healthy: true }).is_none());
        assert!(tracker.observe(HealthStatus { healthy: true }).is_none());
        let (_, severity) = tracker.observe(HealthStatus { healthy: false }).unwrap();
        assert_eq!(severity, Severity::Warning);
        assert!(tracker.observe(HealthStatus { healthy: false }).is_none());
        let (_, severity) = tracker.observe(HealthStatus { healthy: true }).unwrap();
        assert_eq!(severity, Severity::Success);
    }

    #[test]
    fn test_first_unhealthy_observation_notifies() {
        let mut tracker = StatusTracker::default();
        assert!(tracker.observe(HealthStatus { healthy: false }).is_some());
    }

    #[tokio::test]
    async fn test_remote_probe_reads_status() {
        let mock = Arc::new(MockRemote::new());
        mock.respond("health", json!({"status": "healthy"}));
        mock.respond("health", json!({"status": "degraded"}));
        let probe = RemoteHealthProbe::new(Invoker::new(mock.clone()));
        assert!(probe.fetch_status().await.healthy);
        assert!(!probe.fetch_status().await.healthy);
        // 未预置响应 -> 传输失败 -> 不健康
        assert!(!probe.fetch_status().await.healthy);
    }

    #[tokio::test]
    async fn test_poller_stops_on_cancel() {
        let mock = Arc::new(MockRemote::new());
        let surface = Arc::new(RecordingSurface::new());
        let cancel = CancellationToken::new();
        let handle = spawn_poller(
            Arc::new(RemoteHealthProbe::new(Invoker::new(mock.clone()))),
            surface.clone(),
            Duration::from_millis(10),
            cancel.clone(),
        );
        tokio::time::sleep(Duration::from_millis(35)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert!(mock.call_count() >= 1);
        // 持续不可达只提示一次
        assert_eq!(surface.notices().len(), 1);
        assert!(matches!(surface.last_in(&Slot::Status), Some(RenderModel::Text { .. })));
    }
}
