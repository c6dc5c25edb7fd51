//! BlueZ RFCOMM 传输
//!
//! 流程:
//! 1. 以客户端角色为 SPP UUID 注册 Profile
//! 2. 请求目标设备连接该 Profile
//! 3. 接受 BlueZ 交回的 RFCOMM 连接请求，得到字节流
//!
//! 连接超时由 [`Connector`](super::Connector) 统一控制。

use async_trait::async_trait;
use bluer::Address;
use bluer::rfcomm::{Profile, Role};
use futures_util::StreamExt;
use log::{debug, info};
use uuid::Uuid;

use super::{PeerAddress, RadioAdapter, Session, StreamSession, TransportError, TransportResult};

pub struct BluezAdapter {
    session: bluer::Session,
    adapter: bluer::Adapter,
}

impl BluezAdapter {
    /// 打开默认蓝牙适配器
    pub async fn new() -> TransportResult<Self> {
        let session = bluer::Session::new().await.map_err(unavailable)?;
        let adapter = session.default_adapter().await.map_err(unavailable)?;
        info!("Using Bluetooth adapter {}", adapter.name());

        Ok(Self { session, adapter })
    }
}

fn unavailable(e: bluer::Error) -> TransportError {
    TransportError::AdapterUnavailable(e.to_string())
}

fn connection_failed(e: impl std::fmt::Display) -> TransportError {
    TransportError::ConnectionFailed(e.to_string())
}

#[async_trait]
impl RadioAdapter for BluezAdapter {
    async fn is_enabled(&self) -> bool {
        self.adapter.is_powered().await.unwrap_or(false)
    }

    async fn enable(&self) -> TransportResult<bool> {
        if self.adapter.is_powered().await.map_err(unavailable)? {
            return Ok(false);
        }

        info!("Powering on adapter {}", self.adapter.name());
        self.adapter.set_powered(true).await.map_err(unavailable)?;
        Ok(true)
    }

    async fn connect_to_peer(
        &self,
        peer: &PeerAddress,
        service: Uuid,
    ) -> TransportResult<Box<dyn Session>> {
        let address: Address = peer
            .as_str()
            .parse()
            .map_err(|_| TransportError::InvalidAddress(peer.to_string()))?;

        let profile = Profile {
            uuid: service,
            role: Some(Role::Client),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        };
        let mut handle = self
            .session
            .register_profile(profile)
            .await
            .map_err(connection_failed)?;

        let device = self.adapter.device(address).map_err(connection_failed)?;

        debug!("Requesting profile {} on {}", service, address);
        let connect = device.connect_profile(&service);
        tokio::pin!(connect);

        // 连接请求可能在 connect_profile 返回之前到达
        let early = tokio::select! {
            result = &mut connect => {
                result.map_err(connection_failed)?;
                None
            }
            request = handle.next() => Some(request),
        };
        let request = match early {
            Some(request) => request,
            None => handle.next().await,
        };
        let request = request.ok_or_else(|| {
            TransportError::ConnectionFailed("profile unregistered before connecting".to_string())
        })?;

        let stream = request.accept().map_err(connection_failed)?;

        info!("Connected to {} via RFCOMM", peer);
        Ok(Box::new(StreamSession::new(stream, peer.clone())))
    }
}
