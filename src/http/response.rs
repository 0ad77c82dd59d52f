//! 源站响应转发
//!
//! 头部逐行原样转发，同时识别正文的分帧方式：
//! `text/html` 按行转发，其余内容按固定大小的块转发。

use crate::http::reader::LineReader;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

const HTML_PREFIX: &[u8] = b"Content-Type: text/html";
const LENGTH_PREFIX: &[u8] = b"Content-Length:";

/// 从响应头中识别出的分帧信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFraming {
    pub is_html: bool,
    /// `Content-Length` 声明的长度，缺失或无法解析时为 `None`
    pub declared_length: Option<u64>,
}

/// 响应头扫描状态机
///
/// 每次喂入一行，遇到空行时头部结束。
/// 超长的行会被读取器截成多段，只有行首的片段参与匹配。
#[derive(Debug)]
pub struct HeaderScanner {
    framing: ResponseFraming,
    finished: bool,
    at_line_start: bool,
}

impl Default for HeaderScanner {
    fn default() -> Self {
        Self {
            framing: ResponseFraming::default(),
            finished: false,
            at_line_start: true,
        }
    }
}

impl HeaderScanner {
    /// 处理一行头部，返回头部块是否已经结束
    pub fn feed(&mut self, line: &[u8]) -> bool {
        if self.finished {
            return true;
        }

        let at_line_start = self.at_line_start;
        self.at_line_start = line.ends_with(b"\n");
        if !at_line_start {
            return false;
        }

        if line == b"\r\n" || line == b"\n" {
            self.finished = true;
        } else if line.starts_with(HTML_PREFIX) {
            self.framing.is_html = true;
        } else if let Some(rest) = line.strip_prefix(LENGTH_PREFIX) {
            self.framing.declared_length = parse_length(rest);
        }

        self.finished
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn framing(&self) -> &ResponseFraming {
        &self.framing
    }

    pub fn into_framing(self) -> ResponseFraming {
        self.framing
    }
}

/// 取冒号后的第一个 token 作为长度
fn parse_length(rest: &[u8]) -> Option<u64> {
    let rest = std::str::from_utf8(rest).ok()?;
    rest.split_ascii_whitespace().next()?.parse().ok()
}

/// 一次转发的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayOutcome {
    pub framing: ResponseFraming,
    pub header_bytes: u64,
    pub body_bytes: u64,
}

impl RelayOutcome {
    /// 实际写给客户端的总字节数
    pub fn total(&self) -> u64 {
        self.header_bytes + self.body_bytes
    }
}

/// 转发中途失败，附带失败前已经写出的字节数
#[derive(Debug, Error)]
#[error("relay aborted after {} bytes: {source}", .outcome.total())]
pub struct RelayError {
    pub outcome: RelayOutcome,
    #[source]
    pub source: io::Error,
}

/// 把源站响应转发给客户端
pub async fn relay<R, W>(
    origin: &mut LineReader<R>,
    client: &mut W,
) -> std::result::Result<RelayOutcome, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut outcome = RelayOutcome::default();
    match relay_into(origin, client, &mut outcome).await {
        Ok(()) => Ok(outcome),
        Err(source) => Err(RelayError { outcome, source }),
    }
}

async fn relay_into<R, W>(
    origin: &mut LineReader<R>,
    client: &mut W,
    outcome: &mut RelayOutcome,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut scanner = HeaderScanner::default();
    while let Some(line) = origin.read_line().await? {
        client.write_all(&line).await?;
        outcome.header_bytes += line.len() as u64;
        if scanner.feed(&line) {
            break;
        }
    }
    outcome.framing = scanner.into_framing();

    debug!(
        "Response framing: html={}, declared_length={:?}",
        outcome.framing.is_html, outcome.framing.declared_length
    );

    if outcome.framing.is_html {
        while let Some(line) = origin.read_line().await? {
            client.write_all(&line).await?;
            outcome.body_bytes += line.len() as u64;
        }
    } else {
        let chunk_size = origin.max_line();
        // 没有声明长度时一直读到源站关闭连接
        let mut remaining = outcome.framing.declared_length;
        loop {
            let limit = match remaining {
                Some(0) => break,
                Some(n) => n.min(chunk_size as u64) as usize,
                None => chunk_size,
            };
            let chunk = origin.read_chunk(limit).await?;
            if chunk.is_empty() {
                break;
            }
            client.write_all(&chunk).await?;
            outcome.body_bytes += chunk.len() as u64;
            if let Some(n) = remaining.as_mut() {
                *n -= chunk.len() as u64;
            }
        }
    }

    client.flush().await
}
