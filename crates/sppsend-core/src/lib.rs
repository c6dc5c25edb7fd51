//! sppsend Core Library
//!
//! 通过串口协议 (SPP / RFCOMM) 向已配对设备推送单个文件的核心实现
//!
//! # 模块
//!
//! - **frame**: 文件名帧与大小帧的编解码
//! - **transport**: 连接/写入/关闭字节流会话的抽象，以及 TCP 和 BlueZ 实现
//! - **transfer**: 传输引擎（协议与失败处理）和传输监督器（后台执行、进度与结果投递）
//! - **command**: 面向调用方的命令层 (`enableAdapter` / `sendFile`)
//! - **config**: 设置的加载与持久化
//!
//! # 线路格式
//!
//! ```text
//! +--------+-----------------+-------------------+----------------+
//! | 1 byte | N bytes         | 8 bytes (LE u64)  | size bytes     |
//! | N      | file name UTF-8 | file size         | file content   |
//! +--------+-----------------+-------------------+----------------+
//! ```
//!
//! 没有尾部、校验和或确认帧，数据全部 flush 后即视为发送成功。
//!
//! # 使用示例
//!
//! ```ignore
//! use std::sync::Arc;
//! use sppsend_core::{TcpAdapter, TransferConfig, TransferEngine, TransferRequest, TransferSupervisor};
//!
//! let engine = TransferEngine::new(Arc::new(TcpAdapter), TransferConfig::default());
//! let supervisor = TransferSupervisor::new(engine);
//!
//! let mut handle = supervisor.start(TransferRequest::new("report.txt", "127.0.0.1:9000"))?;
//! while let Some(event) = handle.next_progress().await {
//!     println!("{}%", event.percent);
//! }
//! let result = handle.finish().await;
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod transfer;
pub mod transport;

pub use command::{Command, CommandHandler, Reply};
pub use config::{ConfigError, Settings, TransportKind};
pub use error::{ErrorKind, TransferError};
pub use frame::{FileHeader, FrameError, encode_name_frame, encode_size_frame, read_header};
pub use logging::LogLevel;
pub use transfer::{
    FailureDetail, ProgressEvent, TransferCallback, TransferConfig, TransferEngine,
    TransferHandle, TransferRequest, TransferResult, TransferSupervisor,
};
pub use transport::{
    Connector, PeerAddress, RadioAdapter, SPP_SERVICE_UUID, Session, StreamSession, TcpAdapter,
    TransportError, open_adapter,
};

#[cfg(feature = "bluez")]
pub use transport::BluezAdapter;
