//! 测试用的内存适配器
//!
//! 记录写入的字节、连接次数和关闭调用，用于验证引擎的协议输出与清理行为。

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use super::{PeerAddress, RadioAdapter, Session, TransportError, TransportResult};

#[derive(Default)]
pub(crate) struct Recorder {
    written: Mutex<Vec<u8>>,
    service: Mutex<Option<Uuid>>,
    connects: AtomicUsize,
    flushes: AtomicUsize,
    close_calls: AtomicUsize,
    closed: AtomicBool,
}

impl Recorder {
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn service(&self) -> Option<Uuid> {
        *self.service.lock().unwrap()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectBehavior {
    #[default]
    Succeed,
    Refuse,
    Hang,
}

#[derive(Default)]
pub(crate) struct MockAdapter {
    pub recorder: Arc<Recorder>,
    disabled: AtomicBool,
    connect: ConnectBehavior,
    gate: Option<Arc<Notify>>,
    fail_write_after: Option<usize>,
    fail_close: bool,
    stuck_power_query: bool,
}

impl MockAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn disabled() -> Arc<Self> {
        Arc::new(Self {
            disabled: AtomicBool::new(true),
            ..Default::default()
        })
    }

    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            connect: ConnectBehavior::Refuse,
            ..Default::default()
        })
    }

    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            connect: ConnectBehavior::Hang,
            ..Default::default()
        })
    }

    /// 查询适配器状态永远不返回
    pub fn stuck_power_query() -> Arc<Self> {
        Arc::new(Self {
            stuck_power_query: true,
            ..Default::default()
        })
    }

    /// 连接在 `gate` 被通知之前一直挂起
    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Default::default()
        })
    }

    /// 累计写入超过 `limit` 字节后写入失败
    pub fn failing_writes_after(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_write_after: Some(limit),
            ..Default::default()
        })
    }

    /// 关闭会话时返回错误
    pub fn failing_close() -> Arc<Self> {
        Arc::new(Self {
            fail_close: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl RadioAdapter for MockAdapter {
    async fn is_enabled(&self) -> bool {
        if self.stuck_power_query {
            std::future::pending::<()>().await;
        }
        !self.disabled.load(Ordering::SeqCst)
    }

    async fn enable(&self) -> TransportResult<bool> {
        Ok(self.disabled.swap(false, Ordering::SeqCst))
    }

    async fn connect_to_peer(
        &self,
        _peer: &PeerAddress,
        service: Uuid,
    ) -> TransportResult<Box<dyn Session>> {
        self.recorder.connects.fetch_add(1, Ordering::SeqCst);
        *self.recorder.service.lock().unwrap() = Some(service);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match self.connect {
            ConnectBehavior::Succeed => Ok(Box::new(MockSession {
                recorder: Arc::clone(&self.recorder),
                closed: false,
                fail_write_after: self.fail_write_after,
                fail_close: self.fail_close,
            })),
            ConnectBehavior::Refuse => Err(TransportError::ConnectionFailed(
                "peer unreachable".to_string(),
            )),
            ConnectBehavior::Hang => std::future::pending().await,
        }
    }
}

struct MockSession {
    recorder: Arc<Recorder>,
    closed: bool,
    fail_write_after: Option<usize>,
    fail_close: bool,
}

#[async_trait]
impl Session for MockSession {
    async fn write_all(&mut self, buf: &[u8]) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let mut written = self.recorder.written.lock().unwrap();
        if let Some(limit) = self.fail_write_after {
            if written.len() + buf.len() > limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link lost").into());
            }
        }
        written.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.recorder.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_available(&mut self, _buf: &mut [u8]) -> TransportResult<usize> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(0)
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.recorder.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.recorder.closed.store(true, Ordering::SeqCst);

        if self.fail_close {
            return Err(io::Error::other("close failed").into());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
