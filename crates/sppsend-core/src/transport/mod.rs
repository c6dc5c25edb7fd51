//! 传输层
//!
//! 把底层无线技术隐藏在统一的能力接口之后:
//! - [`RadioAdapter`]: 由平台提供的适配器能力（是否开启、开启、按服务 UUID 连接）
//! - [`Session`]: 已连接的双向字节流会话
//! - [`Connector`]: 在适配器之上执行地址检查、开关检查和连接超时
//!
//! 实现:
//! - [`TcpAdapter`]: `host:port` 形式的对端地址，用于开发和回环测试
//! - `BluezAdapter` (feature `bluez`): BlueZ RFCOMM

#[cfg(feature = "bluez")]
pub mod bluez;
pub mod stream;
pub mod tcp;

#[cfg(test)]
pub(crate) mod mock;

#[cfg(feature = "bluez")]
pub use bluez::BluezAdapter;
pub use stream::StreamSession;
pub use tcp::TcpAdapter;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::time;
use uuid::Uuid;

use crate::config::TransportKind;

/// 串口协议 (Serial Port Profile) 服务 UUID
///
/// 两端必须一致，不支持按调用配置。
pub const SPP_SERVICE_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805f9b34fb);

/// 对端地址（如蓝牙 MAC 地址）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddress(String);

impl PeerAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for PeerAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

/// 传输层错误
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Adapter unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("Adapter is disabled")]
    AdapterDisabled,

    #[error("Invalid peer address: {0:?}")]
    InvalidAddress(String),

    #[error("Peer unreachable: {0}")]
    ConnectionFailed(String),

    #[error("Handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("Session is closed")]
    Closed,

    #[error("Stream error: {0}")]
    Io(#[from] io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// 已连接的字节流会话
#[async_trait]
pub trait Session: Send {
    /// 写入全部字节
    async fn write_all(&mut self, buf: &[u8]) -> TransportResult<()>;

    async fn flush(&mut self) -> TransportResult<()>;

    /// 读取当前可用的数据，返回读取的字节数（0 表示对端已关闭）
    async fn read_available(&mut self, buf: &mut [u8]) -> TransportResult<usize>;

    /// 关闭会话
    ///
    /// 幂等：重复调用直接返回 `Ok(())`。返回的错误只用于诊断。
    async fn close(&mut self) -> TransportResult<()>;

    fn is_closed(&self) -> bool;
}

/// 平台无线适配器能力
#[async_trait]
pub trait RadioAdapter: Send + Sync {
    /// 适配器是否已开启
    async fn is_enabled(&self) -> bool;

    /// 请求开启适配器
    ///
    /// 返回 `true` 表示发出了开启请求，`false` 表示已经开启。
    async fn enable(&self) -> TransportResult<bool>;

    /// 按服务 UUID 连接对端
    async fn connect_to_peer(
        &self,
        peer: &PeerAddress,
        service: Uuid,
    ) -> TransportResult<Box<dyn Session>>;
}

/// 连接器
///
/// 在适配器之上强制执行地址非空检查、适配器开关检查和连接超时。
#[derive(Clone)]
pub struct Connector {
    adapter: Arc<dyn RadioAdapter>,
    timeout: Duration,
}

impl Connector {
    pub fn new(adapter: Arc<dyn RadioAdapter>, timeout: Duration) -> Self {
        Self { adapter, timeout }
    }

    /// 连接到对端的串口服务
    pub async fn connect(&self, peer: &PeerAddress) -> TransportResult<Box<dyn Session>> {
        if peer.is_empty() {
            return Err(TransportError::InvalidAddress(peer.to_string()));
        }

        // 适配器状态查询同样可能卡在 D-Bus 上，一并计入超时
        let handshake = async {
            if !self.adapter.is_enabled().await {
                return Err(TransportError::AdapterDisabled);
            }
            debug!("Connecting to {} (timeout {:?})", peer, self.timeout);
            self.adapter.connect_to_peer(peer, SPP_SERVICE_UUID).await
        };

        match time::timeout(self.timeout, handshake).await {
            Ok(session) => session,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }
}

/// 按配置打开适配器
pub async fn open_adapter(kind: TransportKind) -> TransportResult<Arc<dyn RadioAdapter>> {
    match kind {
        TransportKind::Tcp => Ok(Arc::new(TcpAdapter)),
        #[cfg(feature = "bluez")]
        TransportKind::Bluez => Ok(Arc::new(BluezAdapter::new().await?)),
        #[cfg(not(feature = "bluez"))]
        TransportKind::Bluez => Err(TransportError::AdapterUnavailable(
            "built without BlueZ support (enable the `bluez` feature)".to_string(),
        )),
    }
}
