//! 代理监听循环
//!
//! 每个连接一个任务，监听循环只负责 accept 和派发，从不等待连接结束。

use crate::access_log::AccessLog;
use crate::config::Config;
use crate::http::ProxyError;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub mod connector;
pub mod handler;

pub use connector::{Connector, TcpConnector};
pub use handler::{handle_client, ProxyContext, Transaction};

/// 按配置在指定端口上运行代理
pub async fn run(config: Config, port: u16) -> Result<()> {
    let listen_addr = SocketAddr::new(config.server.bind_addr, port);

    info!("Starting HTTP proxy on {}", listen_addr);

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", listen_addr))?;
    info!("HTTP proxy listening on {}", listen_addr);

    let access_log = AccessLog::open(&config.proxy.access_log).await?;
    info!("Access log: {}", config.proxy.access_log.display());

    let ctx = Arc::new(ProxyContext {
        connector: TcpConnector,
        access_log,
        max_line: config.proxy.max_line,
    });

    serve(listener, ctx).await
}

/// 在已绑定的监听器上接受连接，永不返回
pub async fn serve<C: Connector>(listener: TcpListener, ctx: Arc<ProxyContext<C>>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((client_stream, client_addr)) => {
                info!("Accepted connection from {}", client_addr);

                let ctx = ctx.clone();
                tokio::spawn(async move {
                    match handle_client(client_stream, client_addr, &ctx).await {
                        Ok(Transaction::Relayed { host, bytes }) => {
                            debug!("Client {} done: {} bytes from {}", client_addr, bytes, host);
                        }
                        Ok(Transaction::Rejected { status }) => {
                            debug!("Client {} rejected with {}", client_addr, status);
                        }
                        Err(ProxyError::EmptyRequest) => {
                            debug!("Client {} closed connection without a request", client_addr);
                        }
                        Err(e @ ProxyError::OriginConnect { .. }) => {
                            warn!("Client {}: {}", client_addr, e);
                        }
                        Err(e) => {
                            error!("Error handling client {}: {}", client_addr, e);
                        }
                    }
                    info!("Connection from {} closed", client_addr);
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}
