//! Promptitron 命令行入口
//!
//! 初始化日志与配置，组装控制器，启动健康轮询，逐行读取 stdin 并转为 UiEvent。

use std::sync::Arc;
use std::time::Duration;

use promptitron::config::load_config;
use promptitron::core::ControllerBuilder;
use promptitron::health::{spawn_poller, RemoteHealthProbe};
use promptitron::observability;
use promptitron::ui::event::HELP;
use promptitron::ui::{ConsoleSurface, EventHandler, Presentation, Severity};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    // 第一个参数可指定额外的配置文件
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });
    tracing::info!(
        api = %cfg.remote.api_base_url,
        tasks = %cfg.remote.task_base_url,
        "{} starting",
        cfg.app.name.as_deref().unwrap_or("promptitron")
    );

    let console = Arc::new(ConsoleSurface::stdout());
    let presentation: Arc<dyn Presentation> = console.clone();
    let builder = ControllerBuilder::new(cfg.clone());
    let invoker = builder.invoker()?;
    let controller = builder.build(presentation.clone())?;

    let cancel = CancellationToken::new();
    let poller = cfg.health.enabled.then(|| {
        spawn_poller(
            Arc::new(RemoteHealthProbe::new(invoker)),
            presentation.clone(),
            Duration::from_secs(cfg.health.interval_secs.max(1)),
            cancel.clone(),
        )
    });

    let (tx, rx) = mpsc::channel(32);
    let handler = EventHandler::new(tx);
    let reader_cancel = cancel.clone();
    let reader_console = console.clone();
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        reader_console.notify(HELP, Severity::Info);
        loop {
            reader_console.prompt();
            let line = tokio::select! {
                _ = reader_cancel.cancelled() => break,
                line = lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) => match handler.submit(&line).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(message) => reader_console.notify(&message, Severity::Warning),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });

    controller.run(rx, cancel.clone()).await;
    cancel.cancel();
    if let Some(poller) = poller {
        let _ = poller.await;
    }
    reader.abort();
    tracing::info!("bye");
    Ok(())
}
