//! 单个客户端连接的处理流程
//!
//! 读请求行 → 检查方法 → 解析 URI → 重写请求 → 连接源站 → 转发响应 → 记录访问日志。
//! 两端 socket 都归本次处理所有，任何路径返回时都会被释放。

use crate::access_log::AccessLog;
use crate::http::{
    error_page, parse_uri, relay, rewrite, LineReader, ProxyError, RequestLine, Result,
    USER_AGENT,
};
use crate::proxy::connector::Connector;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// 所有连接共享的只读上下文
pub struct ProxyContext<C> {
    pub connector: C,
    pub access_log: AccessLog,
    pub max_line: usize,
}

/// 一次连接处理的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// 响应已转发给客户端
    Relayed { host: String, bytes: u64 },
    /// 返回了错误页，未联系源站
    Rejected { status: u16 },
}

/// 处理一个客户端连接
pub async fn handle_client<S, C>(
    client_stream: S,
    client_addr: SocketAddr,
    ctx: &ProxyContext<C>,
) -> Result<Transaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Connector,
{
    debug!("Handling client {}", client_addr);

    let mut client = LineReader::with_max_line(client_stream, ctx.max_line);
    let line = client.read_line().await?.ok_or(ProxyError::EmptyRequest)?;
    let request = RequestLine::parse(&String::from_utf8_lossy(&line));
    debug!(
        "Request from {}: {} {} {}",
        client_addr, request.method, request.uri, request.version
    );

    if !request.is_get() {
        let err = ProxyError::UnsupportedMethod(request.method.clone());
        return reject(&mut client, client_addr, ctx, err, &request.method, &request.uri).await;
    }

    let uri = match parse_uri(&request.uri) {
        Ok(uri) => uri,
        Err(err) => {
            return reject(&mut client, client_addr, ctx, err, &request.uri, &request.uri).await;
        }
    };

    // 客户端的请求头不转发，但要读掉，避免关闭时还有未读数据
    if let Err(e) = drain_headers(&mut client).await {
        ctx.access_log.record(client_addr.ip(), &uri.host, 0).await;
        return Err(e);
    }

    let outbound = rewrite("GET", &uri.path, &uri.host, USER_AGENT);

    let origin = match ctx.connector.connect(&uri.host, &uri.port).await {
        Ok(stream) => stream,
        Err(source) => {
            ctx.access_log.record(client_addr.ip(), &uri.host, 0).await;
            return Err(ProxyError::OriginConnect {
                host: uri.host,
                port: uri.port,
                source,
            });
        }
    };
    info!("Connected to origin {}:{} for {}", uri.host, uri.port, client_addr);

    let mut origin = LineReader::with_max_line(origin, ctx.max_line);
    if let Err(e) = origin.get_mut().write_all(outbound.as_bytes()).await {
        ctx.access_log.record(client_addr.ip(), &uri.host, 0).await;
        return Err(e.into());
    }

    let (bytes, failure) = match relay(&mut origin, client.get_mut()).await {
        Ok(outcome) => (outcome.total(), None),
        Err(err) => (err.outcome.total(), Some(err.source)),
    };

    // 中途失败也按已写出的字节数记录
    ctx.access_log.record(client_addr.ip(), &uri.host, bytes).await;

    if let Some(e) = failure {
        return Err(e.into());
    }

    let _ = client.get_mut().shutdown().await;
    info!("Relayed {} bytes from {} to {}", bytes, uri.host, client_addr);

    Ok(Transaction::Relayed {
        host: uri.host,
        bytes,
    })
}

/// 读掉请求头直到空行或连接关闭
async fn drain_headers<R>(client: &mut LineReader<R>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    while let Some(line) = client.read_line().await? {
        if &line[..] == b"\r\n" || &line[..] == b"\n" {
            break;
        }
    }
    Ok(())
}

/// 记录一条字节数为 0 的日志并返回错误页
///
/// 错误页在读请求头之前发出，客户端只发了请求行也能立即收到。
async fn reject<S, C>(
    client: &mut LineReader<S>,
    client_addr: SocketAddr,
    ctx: &ProxyContext<C>,
    err: ProxyError,
    cause: &str,
    target: &str,
) -> Result<Transaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (status, short_msg) = match err.status() {
        Some(status) => status,
        None => return Err(err),
    };
    let long_msg = match &err {
        ProxyError::UnsupportedMethod(_) => "Proxy does not support this request",
        _ => "Proxy could not parse the requested URI",
    };

    warn!("Rejecting request from {} with {}: {}", client_addr, status, err);

    ctx.access_log.record(client_addr.ip(), target, 0).await;
    error_page::send(client.get_mut(), status, short_msg, long_msg, cause).await?;
    let _ = client.get_mut().shutdown().await;

    // 响应已经发出，剩余请求头读取失败不影响结果
    let _ = drain_headers(client).await;

    Ok(Transaction::Rejected { status })
}
