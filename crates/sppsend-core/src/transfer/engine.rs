//! 传输引擎
//!
//! 驱动一个 [`TransferRequest`] 走完整个传输流程:
//! 1. 打开源文件并获取大小
//! 2. 检查文件名能否放进 1 字节长度前缀
//! 3. 连接对端
//! 4. 依次写入文件名帧和大小帧
//! 5. 按固定块大小发送内容，每块之后报告进度
//! 6. flush
//!
//! 无论成功与否，先关闭文件再关闭会话。清理阶段的错误只记录日志，不会覆盖传输结果。
//!
//! # 已知限制
//!
//! 没有确认帧：数据 flush 到传输层即视为成功，不保证对端已完整接收。
//! 中途失败时对端会收到一个被截断的流。

use std::io;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::error::TransferError;
use crate::frame::FileHeader;
use crate::transfer::session::{TransferSession, TransferStatus};
use crate::transfer::{ProgressEvent, TransferRequest, TransferResult};
use crate::transport::{Connector, PeerAddress, RadioAdapter, Session, TransportError};

/// 默认块大小
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// 默认连接超时
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// 引擎配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// 内容块大小，只影响内存占用和进度粒度
    pub chunk_size: usize,
    pub connect_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

pub struct TransferEngine {
    connector: Connector,
    chunk_size: usize,
}

impl TransferEngine {
    pub fn new(adapter: Arc<dyn RadioAdapter>, config: TransferConfig) -> Self {
        Self {
            connector: Connector::new(adapter, config.connect_timeout),
            chunk_size: config.chunk_size.max(1),
        }
    }

    /// 执行一次传输，返回唯一的终止结果
    ///
    /// 进度事件通过 `progress` 发送；接收端已关闭时进度被丢弃，传输继续。
    pub async fn run(
        &self,
        request: &TransferRequest,
        progress: &mpsc::UnboundedSender<ProgressEvent>,
    ) -> TransferResult {
        info!(
            "Sending {} to {}",
            request.source_path.display(),
            request.peer
        );

        match self.execute(request, progress).await {
            Ok(()) => {
                info!("Transfer to {} completed", request.peer);
                TransferResult::success()
            }
            Err(e) => {
                error!("Transfer to {} failed: {}", request.peer, e);
                TransferResult::from(&e)
            }
        }
    }

    async fn execute(
        &self,
        request: &TransferRequest,
        progress: &mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<(), TransferError> {
        let path = &request.source_path;

        let file = File::open(path)
            .await
            .map_err(|e| TransferError::source_error(path, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| TransferError::source_error(path, e))?;
        if !metadata.is_file() {
            return Err(TransferError::source_error(path, "not a regular file"));
        }

        let header = FileHeader::new(request.file_name()?, metadata.len())?;
        debug!("File header: {:?}", header);

        self.deliver(&request.peer, header, file, progress).await
    }

    /// 连接、发送并清理
    ///
    /// `content` 在会话关闭之前被释放。
    async fn deliver<R>(
        &self,
        peer: &PeerAddress,
        header: FileHeader,
        content: R,
        progress: &mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<(), TransferError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut state = TransferSession::new(peer.clone(), header);

        let mut session = match self.connector.connect(peer).await {
            Ok(session) => session,
            Err(e) => {
                state.advance(TransferStatus::Failed);
                return Err(TransferError::Connection(e.to_string()));
            }
        };
        state.advance(TransferStatus::Connected);

        let outcome = self
            .send(&mut state, session.as_mut(), content, progress)
            .await;

        if let Err(e) = session.close().await {
            warn!("Failed to close session to {}: {}", peer, e);
        }

        state.advance(if outcome.is_ok() {
            TransferStatus::Completed
        } else {
            TransferStatus::Failed
        });
        outcome
    }

    async fn send<R>(
        &self,
        state: &mut TransferSession,
        session: &mut dyn Session,
        content: R,
        progress: &mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<(), TransferError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let peer = state.peer().clone();
        let size = state.header().size;

        state.advance(TransferStatus::SendingMetadata);
        // 文件名帧和大小帧一次写出
        let header = state.header().encode()?;
        session
            .write_all(&header)
            .await
            .map_err(|e| write_error(&peer, &e))?;

        state.advance(TransferStatus::SendingContent);

        // 文件在发送过程中变大时只发送声明的大小
        let mut content = content.take(size);
        let mut buf = vec![0u8; self.chunk_size];
        let mut reporting = !progress.is_closed();

        loop {
            let n = read_chunk(&mut content, &mut buf)
                .await
                .map_err(|e| TransferError::Io(format!("Failed to read source file: {e}")))?;
            if n == 0 {
                break;
            }

            session
                .write_all(&buf[..n])
                .await
                .map_err(|e| write_error(&peer, &e))?;

            if let Some(percent) = state.record_sent(n as u64) {
                debug!("Progress {}% ({}/{})", percent, state.bytes_sent(), size);
                if reporting && progress.send(ProgressEvent { percent }).is_err() {
                    debug!("Progress receiver dropped");
                    reporting = false;
                }
            }
        }
        drop(content);

        if !state.is_content_complete() {
            return Err(TransferError::Io(format!(
                "Source file ended after {} of {} bytes",
                state.bytes_sent(),
                size
            )));
        }

        session
            .flush()
            .await
            .map_err(|e| write_error(&peer, &e))?;
        Ok(())
    }
}

fn write_error(peer: &PeerAddress, e: &TransportError) -> TransferError {
    TransferError::Io(format!("Failed to write to {peer}: {e}"))
}

/// 尽量填满缓冲区，返回 0 表示已到达末尾
async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
