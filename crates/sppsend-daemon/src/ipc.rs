//! IPC Server - Unix Domain Socket 通信
//!
//! 每行一个 JSON 命令，每行一个 JSON 应答。`sendFile` 会在同一连接上
//! 依次写回 `accepted`、`progress` 和 `result`。

use std::path::{Path, PathBuf};

use anyhow::Result;
use sppsend_core::command::INVALID_ARGUMENTS;
use sppsend_core::{Command, CommandHandler, Reply};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

pub fn socket_path() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("sppsend.sock")
}

pub fn bind(path: &Path) -> Result<UnixListener> {
    // 删除旧的 socket 文件
    let _ = std::fs::remove_file(path);

    let listener = UnixListener::bind(path)?;
    tracing::info!("IPC 服务器已启动: {:?}", path);
    Ok(listener)
}

pub async fn serve(listener: UnixListener, handler: CommandHandler) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, handler).await {
                        tracing::debug!("客户端连接结束: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::warn!("接受连接失败: {}", e);
            }
        }
    }
}

async fn handle_client(stream: UnixStream, handler: CommandHandler) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let command: Command = match serde_json::from_str(line.trim()) {
            Ok(command) => command,
            Err(e) => {
                let reply = Reply::error(INVALID_ARGUMENTS, "Invalid request", Some(e.to_string()));
                write_reply(&mut writer, &reply).await?;
                line.clear();
                continue;
            }
        };

        tracing::debug!("收到请求: {:?}", command);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatch = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.handle(command, &tx).await })
        };

        // 应答边产生边写回，发送方在命令处理完毕后关闭
        while let Some(reply) = rx.recv().await {
            write_reply(&mut writer, &reply).await?;
        }
        dispatch.await?;

        line.clear();
    }

    Ok(())
}

async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, reply: &Reply) -> Result<()> {
    writer
        .write_all(serde_json::to_string(reply)?.as_bytes())
        .await?;
    writer.write_all(b"\n").await?;
    Ok(())
}
