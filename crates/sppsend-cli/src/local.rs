//! 本地模式
//!
//! 不经过守护进程，直接在 CLI 进程内打开适配器并运行传输；
//! 以及一个用于调试的 TCP 接收端。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use sppsend_core::transport::open_adapter;
use sppsend_core::{
    ProgressEvent, Settings, TransferCallback, TransferEngine, TransferRequest, TransferResult,
    TransferSupervisor, read_header,
};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn print_progress(percent: u8) {
    println!("   进度: {}%", percent);
}

struct ConsoleProgress;

impl TransferCallback for ConsoleProgress {
    fn on_progress(&self, event: ProgressEvent) {
        print_progress(event.percent);
    }

    fn on_result(&self, result: &TransferResult) {
        tracing::debug!("Transfer finished: {:?}", result);
    }
}

pub async fn send(
    settings: &Settings,
    file: &str,
    device: &str,
    name: Option<String>,
) -> Result<TransferResult> {
    let adapter = open_adapter(settings.transport).await?;
    let supervisor = TransferSupervisor::new(TransferEngine::new(
        adapter,
        settings.transfer_config(),
    ));

    let mut request = TransferRequest::new(file, device);
    if let Some(name) = name {
        request = request.with_remote_name(name);
    }

    let handle = supervisor.start(request)?;
    Ok(handle.drive(&ConsoleProgress).await)
}

pub async fn enable(settings: &Settings) -> Result<bool> {
    let adapter = open_adapter(settings.transport).await?;
    Ok(adapter.enable().await?)
}

/// 接收一个文件并保存到 `output_dir`
pub async fn receive(listen: &str, output_dir: &Path) -> Result<PathBuf> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("无法监听 {}", listen))?;
    receive_on(listener, output_dir).await
}

async fn receive_on(listener: TcpListener, output_dir: &Path) -> Result<PathBuf> {
    let (socket, from) = listener.accept().await?;
    tracing::info!("Connection from {}", from);

    let mut socket = socket;
    let header = read_header(&mut socket).await?;
    println!("   文件: {} ({} 字节)", header.name, header.size);

    // 只保留文件名部分，避免写到输出目录之外
    let file_name = Path::new(&header.name)
        .file_name()
        .context("对端发送的文件名无效")?;
    let path = output_dir.join(file_name);

    let mut file = File::create(&path).await?;
    let copied = tokio::io::copy(&mut (&mut socket).take(header.size), &mut file).await?;
    file.flush().await?;

    if copied != header.size {
        bail!("连接在 {}/{} 字节后中断", copied, header.size);
    }
    Ok(path)
}
