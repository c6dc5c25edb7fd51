//! sppsend Daemon
//!
//! 后台守护进程，负责：
//! - 持有蓝牙适配器和传输监督器（全进程同时只有一个传输）
//! - 通过 Unix Socket 接收 CLI 的命令并回传进度和结果

mod ipc;
mod service;

use anyhow::Result;
use sppsend_core::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 桥接 log crate（sppsend-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let settings = Settings::load();

    // 初始化日志
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.directive())),
        )
        .try_init();

    tracing::info!("sppsend daemon starting...");

    let handler = service::build_handler(&settings).await?;
    let listener = ipc::bind(&ipc::socket_path())?;

    tokio::select! {
        res = ipc::serve(listener, handler) => {
            tracing::error!("IPC server exited: {:?}", res);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("收到退出信号");
        }
    }

    let _ = std::fs::remove_file(ipc::socket_path());
    Ok(())
}
