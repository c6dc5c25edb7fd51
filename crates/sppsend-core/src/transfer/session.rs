//! 传输会话状态
//!
//! 只由传输引擎修改，传输完成或失败后丢弃。

use log::debug;

use crate::frame::FileHeader;
use crate::transport::PeerAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Connecting,
    Connected,
    SendingMetadata,
    SendingContent,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }
}

#[derive(Debug)]
pub struct TransferSession {
    peer: PeerAddress,
    header: FileHeader,
    bytes_sent: u64,
    status: TransferStatus,
}

impl TransferSession {
    pub fn new(peer: PeerAddress, header: FileHeader) -> Self {
        Self {
            peer,
            header,
            bytes_sent: 0,
            status: TransferStatus::Connecting,
        }
    }

    pub fn peer(&self) -> &PeerAddress {
        &self.peer
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// 进入下一个状态，终止状态之后不再变化
    pub fn advance(&mut self, status: TransferStatus) {
        if self.status.is_terminal() {
            return;
        }
        debug!("Transfer to {}: {:?} -> {:?}", self.peer, self.status, status);
        self.status = status;
    }

    /// 记录已发送的内容字节，返回新的完成百分比
    ///
    /// 文件大小为 0 时返回 `None`。
    pub fn record_sent(&mut self, n: u64) -> Option<u8> {
        self.bytes_sent += n;
        progress_percent(self.bytes_sent, self.header.size)
    }

    /// 已发送字节数是否等于大小帧声明的大小
    pub fn is_content_complete(&self) -> bool {
        self.bytes_sent == self.header.size
    }
}

/// `floor(sent * 100 / total)`，上限 100
pub fn progress_percent(sent: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let percent = (u128::from(sent) * 100 / u128::from(total)).min(100);
    u8::try_from(percent).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(size: u64) -> TransferSession {
        TransferSession::new(
            PeerAddress::new("AA:BB:CC:DD:EE:FF"),
            FileHeader::new("a.bin", size).unwrap(),
        )
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0), None);
        assert_eq!(progress_percent(1024, 2048), Some(50));
        assert_eq!(progress_percent(2048, 2048), Some(100));
        assert_eq!(progress_percent(1, 3), Some(33));
        assert_eq!(progress_percent(1, u64::MAX), Some(0));
        assert_eq!(progress_percent(u64::MAX, u64::MAX), Some(100));
    }

    #[test]
    fn test_record_sent() {
        let mut s = session(3000);
        assert_eq!(s.record_sent(1000), Some(33));
        assert_eq!(s.record_sent(1000), Some(66));
        assert!(!s.is_content_complete());
        assert_eq!(s.record_sent(1000), Some(100));
        assert!(s.is_content_complete());
        assert_eq!(s.bytes_sent(), 3000);
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let mut s = session(10);
        assert_eq!(s.status, TransferStatus::Connecting);
        s.advance(TransferStatus::Connected);
        s.advance(TransferStatus::Failed);
        s.advance(TransferStatus::Completed);
        assert_eq!(s.status, TransferStatus::Failed);
    }
}
