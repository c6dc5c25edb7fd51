//! 命令层
//!
//! 调用方（CLI、守护进程客户端）发送的方法调用和返回的应答。
//!
//! 消息格式 (JSON):
//! - 命令: `{"method":"sendFile","filePath":"...","deviceAddress":"..."}`
//! - 应答: `{"type":"progress","percent":50}`
//!
//! `sendFile` 的应答顺序: `accepted`，若干 `progress`，最后恰好一个 `result`。

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::transfer::{
    ProgressEvent, TransferCallback, TransferRequest, TransferResult, TransferSupervisor,
};
use crate::transport::RadioAdapter;

/// 参数缺失
pub const INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";

/// 适配器操作失败
pub const BLUETOOTH_ERROR: &str = "BLUETOOTH_ERROR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Command {
    /// 请求开启适配器
    EnableAdapter,
    /// 发送文件
    #[serde(rename_all = "camelCase")]
    SendFile {
        #[serde(default)]
        file_path: Option<String>,
        #[serde(default)]
        device_address: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remote_name: Option<String>,
    },
    /// 查询是否有传输进行中
    Status,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reply {
    /// `requested` 为 true 表示发出了开启请求，false 表示已经开启
    Enabled { requested: bool },
    #[serde(rename_all = "camelCase")]
    Accepted {
        file_path: String,
        device_address: String,
    },
    Progress { percent: u8 },
    #[serde(rename = "result")]
    Finished(TransferResult),
    Status { busy: bool },
    Error {
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    NotImplemented,
}

impl Reply {
    pub fn error(code: &str, message: impl Into<String>, details: Option<String>) -> Self {
        Reply::Error {
            code: code.to_string(),
            message: message.into(),
            details,
        }
    }

    /// 是否为该命令的最后一条应答
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Reply::Accepted { .. } | Reply::Progress { .. })
    }
}

/// 把传输事件转发为应答
struct ReplyForwarder<'a> {
    replies: &'a mpsc::UnboundedSender<Reply>,
}

impl TransferCallback for ReplyForwarder<'_> {
    fn on_progress(&self, event: ProgressEvent) {
        let _ = self.replies.send(Reply::Progress {
            percent: event.percent,
        });
    }

    fn on_result(&self, result: &TransferResult) {
        let _ = self.replies.send(Reply::Finished(result.clone()));
    }
}

/// 命令分发
#[derive(Clone)]
pub struct CommandHandler {
    adapter: Arc<dyn RadioAdapter>,
    supervisor: Arc<TransferSupervisor>,
}

impl CommandHandler {
    pub fn new(adapter: Arc<dyn RadioAdapter>, supervisor: Arc<TransferSupervisor>) -> Self {
        Self {
            adapter,
            supervisor,
        }
    }

    /// 处理一条命令，应答写入 `replies`，返回时最后一条应答已发出
    pub async fn handle(&self, command: Command, replies: &mpsc::UnboundedSender<Reply>) {
        match command {
            Command::EnableAdapter => {
                let reply = match self.adapter.enable().await {
                    Ok(requested) => Reply::Enabled { requested },
                    Err(e) => {
                        warn!("Failed to enable adapter: {}", e);
                        Reply::error(
                            BLUETOOTH_ERROR,
                            "Error enabling Bluetooth",
                            Some(e.to_string()),
                        )
                    }
                };
                let _ = replies.send(reply);
            }
            Command::SendFile {
                file_path: Some(file_path),
                device_address: Some(device_address),
                remote_name,
            } => {
                self.send_file(file_path, device_address, remote_name, replies)
                    .await;
            }
            Command::SendFile { .. } => {
                let _ = replies.send(Reply::error(
                    INVALID_ARGUMENTS,
                    "Missing filePath or deviceAddress",
                    None,
                ));
            }
            Command::Status => {
                let _ = replies.send(Reply::Status {
                    busy: self.supervisor.is_busy(),
                });
            }
            Command::Unknown => {
                let _ = replies.send(Reply::NotImplemented);
            }
        }
    }

    async fn send_file(
        &self,
        file_path: String,
        device_address: String,
        remote_name: Option<String>,
        replies: &mpsc::UnboundedSender<Reply>,
    ) {
        let mut request = TransferRequest::new(&file_path, device_address.as_str());
        if let Some(name) = remote_name {
            request = request.with_remote_name(name);
        }

        let handle = match self.supervisor.start(request) {
            Ok(handle) => handle,
            Err(e) => {
                let _ = replies.send(Reply::Finished(TransferResult::from(&e)));
                return;
            }
        };

        info!("Transfer of {} to {} started", file_path, device_address);
        let _ = replies.send(Reply::Accepted {
            file_path,
            device_address,
        });

        handle.drive(&ReplyForwarder { replies }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transfer::{TransferConfig, TransferEngine};
    use crate::transport::mock::MockAdapter;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn handler(adapter: Arc<MockAdapter>) -> CommandHandler {
        let engine = TransferEngine::new(
            adapter.clone(),
            TransferConfig {
                chunk_size: 1024,
                connect_timeout: Duration::from_secs(5),
            },
        );
        CommandHandler::new(adapter, Arc::new(TransferSupervisor::new(engine)))
    }

    async fn collect(handler: &CommandHandler, command: Command) -> Vec<Reply> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        handler.handle(command, &tx).await;
        drop(tx);

        let mut replies = Vec::new();
        while let Some(reply) = rx.recv().await {
            replies.push(reply);
        }
        replies
    }

    #[test]
    fn test_command_wire_format() {
        let command: Command = serde_json::from_str(
            r#"{"method":"sendFile","filePath":"/tmp/a.txt","deviceAddress":"AA:BB:CC:DD:EE:FF"}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Command::SendFile {
                file_path: Some("/tmp/a.txt".to_string()),
                device_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
                remote_name: None,
            }
        );

        let command: Command = serde_json::from_str(r#"{"method":"enableAdapter"}"#).unwrap();
        assert_eq!(command, Command::EnableAdapter);

        let command: Command = serde_json::from_str(r#"{"method":"reboot"}"#).unwrap();
        assert_eq!(command, Command::Unknown);
    }

    #[test]
    fn test_reply_wire_format() {
        let json = serde_json::to_value(Reply::Progress { percent: 50 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "progress", "percent": 50 }));

        let json = serde_json::to_value(Reply::Finished(TransferResult::success())).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "result", "success": true }));

        let parsed: Reply =
            serde_json::from_str(r#"{"type":"result","success":false,"error":{"kind":"IO_ERROR","message":"x"}}"#)
                .unwrap();
        assert_eq!(
            parsed,
            Reply::Finished(TransferResult::failure(ErrorKind::IoError, "x"))
        );
    }

    #[tokio::test]
    async fn test_missing_arguments() {
        let handler = handler(MockAdapter::new());
        let replies = collect(
            &handler,
            Command::SendFile {
                file_path: Some("/tmp/a.txt".to_string()),
                device_address: None,
                remote_name: None,
            },
        )
        .await;

        assert_eq!(replies.len(), 1);
        assert!(matches!(
            &replies[0],
            Reply::Error { code, .. } if code == INVALID_ARGUMENTS
        ));
    }

    #[tokio::test]
    async fn test_enable_adapter() {
        let handler = handler(MockAdapter::disabled());

        let replies = collect(&handler, Command::EnableAdapter).await;
        assert_eq!(replies, vec![Reply::Enabled { requested: true }]);

        let replies = collect(&handler, Command::EnableAdapter).await;
        assert_eq!(replies, vec![Reply::Enabled { requested: false }]);
    }

    #[tokio::test]
    async fn test_send_file_reply_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, [0u8; 2048]).unwrap();

        let handler = handler(MockAdapter::new());
        let replies = collect(
            &handler,
            Command::SendFile {
                file_path: Some(path.to_string_lossy().into_owned()),
                device_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
                remote_name: None,
            },
        )
        .await;

        assert!(matches!(replies[0], Reply::Accepted { .. }));
        assert_eq!(replies[1], Reply::Progress { percent: 50 });
        assert_eq!(replies[2], Reply::Progress { percent: 100 });
        assert_eq!(replies[3], Reply::Finished(TransferResult::success()));
        assert_eq!(replies.len(), 4);
        assert!(replies[3].is_terminal());
    }

    #[tokio::test]
    async fn test_concurrent_send_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, [0u8; 10]).unwrap();
        let command = Command::SendFile {
            file_path: Some(path.to_string_lossy().into_owned()),
            device_address: Some("AA:BB:CC:DD:EE:FF".to_string()),
            remote_name: None,
        };

        let gate = Arc::new(Notify::new());
        let handler = handler(MockAdapter::gated(Arc::clone(&gate)));

        let first = {
            let handler = handler.clone();
            let command = command.clone();
            tokio::spawn(async move { collect(&handler, command).await })
        };
        while !handler.supervisor.is_busy() {
            tokio::task::yield_now().await;
        }

        let status = collect(&handler, Command::Status).await;
        assert_eq!(status, vec![Reply::Status { busy: true }]);

        let second = collect(&handler, command).await;
        assert_eq!(second.len(), 1);
        assert!(matches!(
            &second[0],
            Reply::Finished(result) if result.error_kind() == Some(ErrorKind::UsageError)
        ));

        gate.notify_one();
        let first = first.await.unwrap();
        assert_eq!(
            first.last(),
            Some(&Reply::Finished(TransferResult::success()))
        );
    }
}
