//! 传输监督器
//!
//! 在独立的 tokio 任务上运行传输引擎，调用方不会被文件或网络 I/O 阻塞。
//!
//! 每次启动返回一个 [`TransferHandle`]，包含两条通道:
//! - 进度通道：按顺序、单调递增的 [`ProgressEvent`]
//! - 结果通道：恰好一个 [`TransferResult`]，在文件和会话都关闭之后送达
//!
//! 同一监督器同时只允许一个传输，第二次启动返回 [`TransferError::Usage`]。

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{Semaphore, mpsc, oneshot};

use crate::error::{ErrorKind, TransferError};
use crate::transfer::{ProgressEvent, TransferEngine, TransferRequest, TransferResult};
use crate::transport::PeerAddress;

/// 传输事件回调
pub trait TransferCallback: Send + Sync {
    /// 进度更新
    fn on_progress(&self, event: ProgressEvent);

    /// 传输结束（成功或失败）
    fn on_result(&self, result: &TransferResult);
}

pub struct TransferSupervisor {
    engine: Arc<TransferEngine>,
    slot: Arc<Semaphore>,
}

impl TransferSupervisor {
    pub fn new(engine: TransferEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// 是否有传输正在进行
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    /// 在后台启动传输，立即返回
    ///
    /// 必须在 tokio 运行时中调用。
    pub fn start(&self, request: TransferRequest) -> Result<TransferHandle, TransferError> {
        let Ok(permit) = Arc::clone(&self.slot).try_acquire_owned() else {
            warn!(
                "Rejected transfer of {}: another transfer is in flight",
                request.source_path.display()
            );
            return Err(TransferError::Usage);
        };

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = oneshot::channel();
        let engine = Arc::clone(&self.engine);

        tokio::spawn(async move {
            let result = engine.run(&request, &progress_tx).await;

            // 先结束进度流并释放槽位，结果永远是最后一个事件
            drop(progress_tx);
            drop(permit);

            if result_tx.send(result).is_err() {
                debug!("Transfer handle dropped before the result was delivered");
            }
        });

        Ok(TransferHandle {
            progress: progress_rx,
            result: result_rx,
        })
    }

    /// `start` 的便捷形式
    pub fn send_file(
        &self,
        path: impl Into<PathBuf>,
        peer: impl Into<PeerAddress>,
    ) -> Result<TransferHandle, TransferError> {
        self.start(TransferRequest::new(path, peer))
    }
}

/// 一次传输的进度流和结果
pub struct TransferHandle {
    progress: mpsc::UnboundedReceiver<ProgressEvent>,
    result: oneshot::Receiver<TransferResult>,
}

impl TransferHandle {
    /// 下一个进度事件，进度流结束后返回 `None`
    pub async fn next_progress(&mut self) -> Option<ProgressEvent> {
        self.progress.recv().await
    }

    /// 等待终止结果
    ///
    /// 尚未读取的进度事件被丢弃，之后的进度也不再缓存。
    pub async fn finish(self) -> TransferResult {
        let TransferHandle { progress, result } = self;
        drop(progress);

        match result.await {
            Ok(result) => result,
            Err(_) => TransferResult::failure(
                ErrorKind::IoError,
                "transfer task terminated without a result",
            ),
        }
    }

    /// 把所有事件投递给回调，返回终止结果
    pub async fn drive<C: TransferCallback + ?Sized>(mut self, callback: &C) -> TransferResult {
        while let Some(event) = self.next_progress().await {
            callback.on_progress(event);
        }
        let result = self.finish().await;
        callback.on_result(&result);
        result
    }
}
