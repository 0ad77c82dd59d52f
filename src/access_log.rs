//! 访问日志
//!
//! 每个处理完的连接追加一行，所有连接共享同一个输出，
//! 通过互斥锁保证单行写入不会交错。

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::warn;

const TIME_FORMAT: &str = "%a %d %b %Y %H:%M:%S %Z";

type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// 可在任务之间克隆共享的访问日志句柄
#[derive(Clone)]
pub struct AccessLog {
    sink: Arc<Mutex<Sink>>,
}

impl AccessLog {
    /// 以追加模式打开日志文件，不存在时创建
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open access log: {}", path.display()))?;
        Ok(Self::from_writer(file))
    }

    /// 使用任意异步输出作为日志
    pub fn from_writer<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// 追加一条记录
    pub async fn append(&self, client_ip: IpAddr, target_host: &str, byte_count: u64) -> std::io::Result<()> {
        let line = format_entry(&Local::now(), client_ip, target_host, byte_count);

        let mut sink = self.sink.lock().await;
        sink.write_all(line.as_bytes()).await?;
        sink.flush().await
    }

    /// 追加一条记录，失败时只打印警告
    pub async fn record(&self, client_ip: IpAddr, target_host: &str, byte_count: u64) {
        if let Err(e) = self.append(client_ip, target_host, byte_count).await {
            warn!("Failed to write access log entry for {}: {}", client_ip, e);
        }
    }
}

/// 格式化一行日志: `<时间> <客户端 IP> <目标主机> <字节数>`
///
/// 时区字段取自偏移量的显示形式：`Utc` 为 `UTC`，本地时间为 `+08:00` 这样的数字偏移。
pub fn format_entry<Tz>(
    now: &DateTime<Tz>,
    client_ip: IpAddr,
    target_host: &str,
    byte_count: u64,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{} {} {} {}\n",
        now.format(TIME_FORMAT),
        client_ip,
        target_host,
        byte_count
    )
}
