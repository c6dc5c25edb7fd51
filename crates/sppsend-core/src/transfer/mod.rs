//! 文件传输模块
//!
//! 包含:
//! - 传输引擎：单次出站传输的协议与失败处理
//! - 传输会话：运行时状态机与进度计算
//! - 传输监督器：后台执行、进度流与唯一的终止结果

pub mod engine;
pub mod session;
pub mod supervisor;

pub use engine::{TransferConfig, TransferEngine};
pub use session::{TransferSession, TransferStatus};
pub use supervisor::{TransferCallback, TransferHandle, TransferSupervisor};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, TransferError};
use crate::transport::PeerAddress;

/// 传输请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source_path: PathBuf,
    pub peer: PeerAddress,
    /// 对端看到的文件名，默认取源文件名
    pub remote_name: Option<String>,
}

impl TransferRequest {
    pub fn new(source_path: impl Into<PathBuf>, peer: impl Into<PeerAddress>) -> Self {
        Self {
            source_path: source_path.into(),
            peer: peer.into(),
            remote_name: None,
        }
    }

    /// 以指定名称发送
    pub fn with_remote_name(mut self, name: impl Into<String>) -> Self {
        self.remote_name = Some(name.into());
        self
    }

    /// 线路上使用的文件名
    pub fn file_name(&self) -> Result<String, TransferError> {
        if let Some(name) = &self.remote_name {
            return Ok(name.clone());
        }
        let name = self
            .source_path
            .file_name()
            .ok_or_else(|| TransferError::source_error(&self.source_path, "path has no file name"))?;
        // 线路上的文件名必须与磁盘上的字节一致，不做有损替换
        name.to_str().map(str::to_owned).ok_or_else(|| {
            TransferError::source_error(&self.source_path, "file name is not valid UTF-8")
        })
    }
}

/// 进度事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 完成百分比 (0-100)
    pub percent: u8,
}

/// 失败详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub kind: ErrorKind,
    pub message: String,
}

/// 传输结果，每个请求恰好一个
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<FailureDetail>,
}

impl TransferResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(FailureDetail {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

impl From<&TransferError> for TransferResult {
    fn from(err: &TransferError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }
}
