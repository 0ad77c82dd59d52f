//! 带缓冲的行读取器
//!
//! 按行或按固定大小块从 socket 读取数据，是请求解析和响应转发的基础。

use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// 单行/单块的默认上限
pub const DEFAULT_MAX_LINE: usize = 8192;

/// 带内部缓冲区的读取器
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
    max_line: usize,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// 使用默认行长上限创建
    pub fn new(inner: R) -> Self {
        Self::with_max_line(inner, DEFAULT_MAX_LINE)
    }

    /// 指定行长上限创建，一行最多返回 `max_line - 1` 字节
    pub fn with_max_line(inner: R, max_line: usize) -> Self {
        let max_line = max_line.max(2);
        Self {
            inner,
            buf: BytesMut::with_capacity(max_line),
            max_line,
            eof: false,
        }
    }

    pub fn max_line(&self) -> usize {
        self.max_line
    }

    /// 读取一行（包含结尾的 `\n`）
    ///
    /// 超过上限的行会被截断，剩余部分作为下一行返回。
    /// 流结束时返回最后的不完整行，之后返回 `None`。
    pub async fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        let limit = self.max_line - 1;
        let mut scanned = 0;

        loop {
            let window = self.buf.len().min(limit);
            if let Some(pos) = self.buf[scanned..window].iter().position(|&b| b == b'\n') {
                return Ok(Some(self.buf.split_to(scanned + pos + 1).freeze()));
            }
            if self.buf.len() >= limit {
                return Ok(Some(self.buf.split_to(limit).freeze()));
            }
            scanned = window;

            if self.fill().await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.buf.split().freeze()));
            }
        }
    }

    /// 读取最多 `limit` 字节
    ///
    /// 会一直读到凑满 `limit` 或流结束；返回空块表示流已结束。
    pub async fn read_chunk(&mut self, limit: usize) -> io::Result<Bytes> {
        while self.buf.len() < limit {
            if self.fill().await? == 0 {
                break;
            }
        }
        let n = self.buf.len().min(limit);
        Ok(self.buf.split_to(n).freeze())
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// 取回底层流，缓冲区中未消费的数据会被丢弃
    pub fn into_inner(self) -> R {
        self.inner
    }

    async fn fill(&mut self) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }
        self.buf.reserve(self.max_line);
        let n = self.inner.read_buf(&mut self.buf).await?;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }
}
