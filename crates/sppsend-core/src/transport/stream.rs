//! 通用字节流会话
//!
//! 把任意 tokio `AsyncRead + AsyncWrite` 流适配为 [`Session`]，
//! RFCOMM 流和 TCP 流都通过它接入。

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{PeerAddress, Session, TransportError, TransportResult};

pub struct StreamSession<S> {
    stream: Option<S>,
    peer: PeerAddress,
}

impl<S> StreamSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: PeerAddress) -> Self {
        Self {
            stream: Some(stream),
            peer,
        }
    }

    fn stream_mut(&mut self) -> TransportResult<&mut S> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl<S> Session for StreamSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, buf: &[u8]) -> TransportResult<()> {
        self.stream_mut()?.write_all(buf).await?;
        Ok(())
    }

    async fn flush(&mut self) -> TransportResult<()> {
        self.stream_mut()?.flush().await?;
        Ok(())
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        Ok(self.stream_mut()?.read(buf).await?)
    }

    async fn close(&mut self) -> TransportResult<()> {
        // 取出流后无论 shutdown 是否成功，drop 都会释放底层连接
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        debug!("Closing session to {}", self.peer);
        stream.shutdown().await?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}
