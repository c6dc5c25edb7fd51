//! 传输错误
//!
//! 每次传输的失败都会被归入一个稳定的错误类别，并附带可读的详细信息。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::frame::FrameError;

/// 面向调用方的错误类别
///
/// 序列化后的值即稳定的错误代码，例如 `SOURCE_ERROR`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// 源文件不存在或不可读
    SourceError,
    /// 文件名过长，无法编码
    ProtocolError,
    /// 适配器不可用、对端不可达或握手超时
    ConnectionError,
    /// 连接建立后的读写失败
    IoError,
    /// 已有传输在进行中
    UsageError,
}

impl ErrorKind {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::SourceError => "SOURCE_ERROR",
            ErrorKind::ProtocolError => "PROTOCOL_ERROR",
            ErrorKind::ConnectionError => "CONNECTION_ERROR",
            ErrorKind::IoError => "IO_ERROR",
            ErrorKind::UsageError => "USAGE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// 传输错误
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Cannot read source file {}: {}", .path.display(), .reason)]
    Source { path: PathBuf, reason: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] FrameError),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("A transfer is already in progress")]
    Usage,
}

impl TransferError {
    pub fn source_error(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        TransferError::Source {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Source { .. } => ErrorKind::SourceError,
            TransferError::Protocol(_) => ErrorKind::ProtocolError,
            TransferError::Connection(_) => ErrorKind::ConnectionError,
            TransferError::Io(_) => ErrorKind::IoError,
            TransferError::Usage => ErrorKind::UsageError,
        }
    }
}
