//! 源站连接器

use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// 建立到源站的出站连接
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// 连接到 `host:port`，端口为原样字符串，非法端口由此处报错
    fn connect(
        &self,
        host: &str,
        port: &str,
    ) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// 直接 TCP 连接，域名解析交给系统
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: &str) -> io::Result<TcpStream> {
        debug!("Connecting to origin {}:{}", host, port);
        TcpStream::connect(format!("{}:{}", host, port)).await
    }
}
