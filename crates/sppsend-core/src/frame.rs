//! 文件头帧编解码
//!
//! 内容流之前依次发送两个定长形状的帧:
//! - 文件名帧: 1 字节长度前缀 + UTF-8 文件名
//! - 大小帧: 8 字节小端 u64
//!
//! 长度前缀只有 1 字节，因此超过 255 字节的文件名会被拒绝，而不是截断。

use tokio::io::{AsyncRead, AsyncReadExt};

/// 文件名的最大编码长度
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// 大小帧长度
pub const SIZE_FRAME_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("File name is {0} bytes long, the limit is 255")]
    NameTooLong(usize),

    #[error("File name is not valid UTF-8")]
    InvalidName,

    #[error("Failed to read header: {0}")]
    Io(#[from] std::io::Error),
}

/// 编码文件名帧
pub fn encode_name_frame(name: &str) -> Result<Vec<u8>, FrameError> {
    let bytes = name.as_bytes();
    let len = u8::try_from(bytes.len()).map_err(|_| FrameError::NameTooLong(bytes.len()))?;

    let mut frame = Vec::with_capacity(bytes.len() + 1);
    frame.push(len);
    frame.extend_from_slice(bytes);
    Ok(frame)
}

/// 编码大小帧
pub fn encode_size_frame(size: u64) -> [u8; SIZE_FRAME_LEN] {
    size.to_le_bytes()
}

/// 文件头（文件名 + 大小）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub name: String,
    pub size: u64,
}

impl FileHeader {
    /// 创建文件头，文件名超过 255 字节时返回错误
    pub fn new(name: impl Into<String>, size: u64) -> Result<Self, FrameError> {
        let name = name.into();
        if name.len() > MAX_NAME_LEN {
            return Err(FrameError::NameTooLong(name.len()));
        }
        Ok(Self { name, size })
    }

    /// 编码为完整的头部字节（文件名帧 + 大小帧）
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let mut bytes = encode_name_frame(&self.name)?;
        bytes.extend_from_slice(&encode_size_frame(self.size));
        Ok(bytes)
    }
}

/// 从流中读取文件头
///
/// 接收端兼容实现：读取长度字节、文件名和 8 字节大小。之后的 `size` 字节即文件内容。
pub async fn read_header<R: AsyncRead + Unpin>(reader: &mut R) -> Result<FileHeader, FrameError> {
    let len = reader.read_u8().await?;

    let mut name = vec![0u8; usize::from(len)];
    reader.read_exact(&mut name).await?;
    let name = String::from_utf8(name).map_err(|_| FrameError::InvalidName)?;

    let mut size = [0u8; SIZE_FRAME_LEN];
    reader.read_exact(&mut size).await?;

    Ok(FileHeader {
        name,
        size: u64::from_le_bytes(size),
    })
}
