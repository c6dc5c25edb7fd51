//! TCP 传输
//!
//! 对端地址按 `host:port` 解析，用于没有蓝牙硬件时的开发和回环测试。
//! 线路格式与 RFCOMM 完全相同。

use async_trait::async_trait;
use log::info;
use tokio::net::TcpStream;
use uuid::Uuid;

use super::{PeerAddress, RadioAdapter, Session, StreamSession, TransportError, TransportResult};

/// TCP "适配器"，始终处于开启状态
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpAdapter;

#[async_trait]
impl RadioAdapter for TcpAdapter {
    async fn is_enabled(&self) -> bool {
        true
    }

    async fn enable(&self) -> TransportResult<bool> {
        Ok(false)
    }

    async fn connect_to_peer(
        &self,
        peer: &PeerAddress,
        _service: Uuid,
    ) -> TransportResult<Box<dyn Session>> {
        if !peer.as_str().contains(':') {
            return Err(TransportError::InvalidAddress(peer.to_string()));
        }

        let stream = TcpStream::connect(peer.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{peer}: {e}")))?;
        stream.set_nodelay(true)?;

        info!("Connected to {}", peer);
        Ok(Box::new(StreamSession::new(stream, peer.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let peer = PeerAddress::new(addr.to_string());
        let mut session = TcpAdapter
            .connect_to_peer(&peer, crate::SPP_SERVICE_UUID)
            .await
            .unwrap();
        session.write_all(b"ping").await.unwrap();
        session.close().await.unwrap();

        assert_eq!(accept.await.unwrap(), b"ping");
    }

    #[tokio::test]
    async fn test_malformed_address() {
        let result = TcpAdapter
            .connect_to_peer(&PeerAddress::new("AA-BB"), crate::SPP_SERVICE_UUID)
            .await;
        assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = TcpAdapter
            .connect_to_peer(&PeerAddress::new(addr.to_string()), crate::SPP_SERVICE_UUID)
            .await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }
}
