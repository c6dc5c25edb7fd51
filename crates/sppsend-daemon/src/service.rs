//! Core Service - 适配器与传输监督器的装配

use std::sync::Arc;

use anyhow::{Context, Result};
use sppsend_core::transport::open_adapter;
use sppsend_core::{CommandHandler, Settings, TransferEngine, TransferSupervisor};

pub async fn build_handler(settings: &Settings) -> Result<CommandHandler> {
    tracing::info!("核心服务初始化 (transport: {:?})...", settings.transport);

    let adapter = open_adapter(settings.transport)
        .await
        .context("无法打开适配器")?;

    if !adapter.is_enabled().await {
        tracing::warn!("适配器未开启，发送前请先执行 `sppsend enable`");
    }

    let engine = TransferEngine::new(Arc::clone(&adapter), settings.transfer_config());
    let supervisor = Arc::new(TransferSupervisor::new(engine));

    tracing::info!(
        "块大小 {} 字节, 连接超时 {}s",
        settings.chunk_size,
        settings.connect_timeout_secs
    );

    Ok(CommandHandler::new(adapter, supervisor))
}
