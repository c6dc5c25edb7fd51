//! IPC Client - 与守护进程通信

use anyhow::{Result, bail};
use sppsend_core::{Command, Reply};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub fn socket_path() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("sppsend.sock")
}

/// 发送命令，把中间应答交给 `on_reply`，返回最后一条应答
pub async fn request<F>(command: &Command, mut on_reply: F) -> Result<Reply>
where
    F: FnMut(&Reply),
{
    let path = socket_path();

    let stream = match UnixStream::connect(&path).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ 无法连接到守护进程: {}", e);
            eprintln!("   请确保 sppsend-daemon 正在运行，或使用 --direct");
            return Err(e.into());
        }
    };

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // 发送请求
    let json = serde_json::to_string(command)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;

    // 读取应答直到终止应答
    while let Some(line) = lines.next_line().await? {
        let reply: Reply = serde_json::from_str(&line)?;
        if reply.is_terminal() {
            return Ok(reply);
        }
        on_reply(&reply);
    }

    bail!("守护进程在应答完成前关闭了连接")
}
